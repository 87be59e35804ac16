// External crates
use anyhow::Result;
use burn::backend::Autodiff;
use burn_ndarray::{NdArray, NdArrayDevice};
use log::info;
use std::env;
use std::process::ExitCode;

// Local modules
use nifty_forecast::config::BatchConfig;
use nifty_forecast::daily::lstm::step_4_train_model::LstmTrainer;
use nifty_forecast::daily::pipeline::run_batch;
use nifty_forecast::util::run_report::JobStatus;

type TrainBackend = Autodiff<NdArray<f32>>;

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional JSON config path as the only argument
    let config = match env::args().nth(1) {
        Some(path) => {
            info!("Using config {}", path);
            BatchConfig::from_json_file(&path)?
        }
        None => BatchConfig::default(),
    };

    let trainer = LstmTrainer::<TrainBackend>::new(config.training.clone(), NdArrayDevice::Cpu);
    let report = run_batch(&config, &trainer);

    for job in &report.jobs {
        match job.status {
            JobStatus::Succeeded => println!(
                "{}: {} -> {} ({} rows, {} windows)",
                job.name,
                job.input.display(),
                job.output.display(),
                job.rows.unwrap_or(0),
                job.windows.unwrap_or(0)
            ),
            JobStatus::Failed => println!(
                "{}: FAILED {}",
                job.name,
                job.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    println!(
        "{} of {} forecasts written in {:.1}s",
        report.succeeded(),
        report.jobs.len(),
        report.total_seconds
    );

    if report.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
