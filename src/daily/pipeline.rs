// External imports
use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{error, info, warn};
use std::time::Instant;

// Internal imports
use super::lstm::step_1_tensor_preparation::{build_windows, MinMaxScaler};
use super::lstm::step_4_train_model::{ForecastModel, SequenceRegressor};
use super::lstm::step_5_prediction::{generate_forecast, inverse_scale_forecast, ForecastSeries, NoiseSampler};
use crate::config::{BatchConfig, ForecastJob, ForecastSettings};
use crate::error::ForecastError;
use crate::util::feature_engineering::{add_daily_features, feature_matrix};
use crate::util::pre_processor::{load_and_preprocess, trading_dates};
use crate::util::run_report::{BatchReport, JobReport};

/// What one successful job produced
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    /// Rows left after cleaning
    pub rows: usize,
    /// Training windows built from those rows
    pub windows: usize,
    pub final_loss: Option<f64>,
    /// Last observed trading date
    pub last_date: NaiveDate,
    pub forecast: ForecastSeries,
}

/// Run the whole pipeline for one input file and write its forecast CSV
///
/// Loads and cleans the export, derives the daily features, scales them,
/// fits a fresh model on every available window and forecasts
/// `settings.horizon` days past the last observed date.
///
/// # Arguments
///
/// * `job` - Input export and output CSV
/// * `settings` - Window length, horizon and noise
/// * `trainer` - Fits the model on the windows of this job only
pub fn run_prediction<R: SequenceRegressor>(
    job: &ForecastJob,
    settings: &ForecastSettings,
    trainer: &R,
) -> Result<ForecastOutcome> {
    info!("Processing {}", job.input.display());

    let mut df = load_and_preprocess(&job.input)
        .with_context(|| format!("Failed to load {}", job.input.display()))?;
    add_daily_features(&mut df)?;

    let dates = trading_dates(&df)?;
    let features = feature_matrix(&df)?;
    let rows = features.nrows();
    let last_date = *dates.last().ok_or(ForecastError::InsufficientData {
        rows: 0,
        required: settings.sequence_length + 1,
    })?;

    let (scaler, scaled) = MinMaxScaler::fit_transform(features.view())?;
    let (x, y) = build_windows(scaled.view(), settings.sequence_length)?;
    let windows = x.dim().0;
    info!("{} rows, {} training windows", rows, windows);

    let model = trainer.train(&x, &y).context("Training failed")?;

    let mut noise = NoiseSampler::new(settings.noise_std_dev, settings.seed)?;
    let scaled_forecast = generate_forecast(
        &model,
        scaled.view(),
        settings.sequence_length,
        settings.horizon,
        &mut noise,
    )?;
    let prices = inverse_scale_forecast(&scaler, &scaled_forecast)?;

    let forecast = ForecastSeries::new(last_date, prices)?;
    forecast
        .write_csv(&job.output)
        .with_context(|| format!("Failed to write {}", job.output.display()))?;

    Ok(ForecastOutcome {
        rows,
        windows,
        final_loss: model.training_loss(),
        last_date,
        forecast,
    })
}

/// Run every job in order; a failing job is recorded and the rest still run
pub fn run_batch<R: SequenceRegressor>(config: &BatchConfig, trainer: &R) -> BatchReport {
    let batch_start = Instant::now();
    let mut report = BatchReport::new(&config.settings);

    for job in &config.jobs {
        let start = Instant::now();
        match run_prediction(job, &config.settings, trainer) {
            Ok(outcome) => {
                if let Some((min, max)) = outcome.forecast.price_range() {
                    info!(
                        "{}: forecast {} days, {:.2} to {:.2}",
                        job.name(),
                        outcome.forecast.len(),
                        min,
                        max
                    );
                }
                report.push(JobReport::succeeded(job, &outcome, start.elapsed().as_secs_f64()));
            }
            Err(e) => {
                error!("{}: {:#}", job.name(), e);
                report.push(JobReport::failed(job, &e, start.elapsed().as_secs_f64()));
            }
        }
    }

    report.total_seconds = batch_start.elapsed().as_secs_f64();

    if let Some(dir) = &config.report_dir {
        match report.save(dir) {
            Ok(path) => info!("Run report saved to {}", path.display()),
            Err(e) => warn!("Could not save run report: {:#}", e),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::file_utils::read_forecast_csv;
    use crate::util::test_utils::write_rising_index_csv;
    use ndarray::{Array1, Array3, ArrayView2};
    use tempfile::tempdir;

    /// Always predicts the same scaled close
    struct ConstantModel(f64);

    impl ForecastModel for ConstantModel {
        fn predict(&self, _window: ArrayView2<f64>) -> Result<f64> {
            Ok(self.0)
        }

        fn training_loss(&self) -> Option<f64> {
            Some(0.25)
        }
    }

    struct ConstantTrainer(f64);

    impl SequenceRegressor for ConstantTrainer {
        type Model = ConstantModel;

        fn train(&self, _x: &Array3<f64>, _y: &Array1<f64>) -> Result<Self::Model> {
            Ok(ConstantModel(self.0))
        }
    }

    fn quiet_settings() -> ForecastSettings {
        ForecastSettings {
            noise_std_dev: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_prediction_writes_horizon_rows() {
        let dir = tempdir().unwrap();
        let input = write_rising_index_csv(dir.path(), "nifty50_stock_data.csv", 40);
        let job = ForecastJob::new(input, dir.path().join("out").join("pred.csv"));

        let outcome = run_prediction(&job, &quiet_settings(), &ConstantTrainer(1.0)).unwrap();

        assert_eq!(outcome.rows, 40);
        assert_eq!(outcome.windows, 25);
        assert_eq!(outcome.final_loss, Some(0.25));
        assert_eq!(outcome.last_date, NaiveDate::from_ymd_opt(2024, 2, 9).unwrap());

        // scaled 1.0 is the highest close seen
        assert!(outcome.forecast.prices.iter().all(|&p| (p - 139.0).abs() < 1e-9));

        let rows = read_forecast_csv(&job.output).unwrap();
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[0].0, NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
        assert_eq!(rows[14].0, NaiveDate::from_ymd_opt(2024, 2, 24).unwrap());
    }

    #[test]
    fn test_run_prediction_too_few_rows() {
        let dir = tempdir().unwrap();
        let input = write_rising_index_csv(dir.path(), "short.csv", 15);
        let job = ForecastJob::new(input, dir.path().join("pred.csv"));

        let err = run_prediction(&job, &quiet_settings(), &ConstantTrainer(0.5)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ForecastError>(),
            Some(ForecastError::InsufficientData { rows: 15, required: 16 })
        ));
        assert!(!job.output.exists());
    }

    #[test]
    fn test_run_batch_isolates_failures() {
        let dir = tempdir().unwrap();
        let good = write_rising_index_csv(dir.path(), "good.csv", 30);
        let config = BatchConfig {
            jobs: vec![
                ForecastJob::new(dir.path().join("missing.csv"), dir.path().join("a.csv")),
                ForecastJob::new(good, dir.path().join("b.csv")),
            ],
            settings: quiet_settings(),
            report_dir: Some(dir.path().join("reports")),
            ..Default::default()
        };

        let report = run_batch(&config, &ConstantTrainer(0.0));

        assert_eq!(report.jobs.len(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 1);
        assert!(report.jobs[0].error.as_deref().unwrap().contains("not found"));
        assert_eq!(report.jobs[1].windows, Some(15));
        assert!(dir.path().join("b.csv").exists());
        assert!(!dir.path().join("a.csv").exists());
        assert_eq!(std::fs::read_dir(dir.path().join("reports")).unwrap().count(), 1);
    }
}
