use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::{ForecastJob, ForecastSettings};
use crate::daily::pipeline::ForecastOutcome;

#[allow(dead_code)]
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
}

/// Outcome of one forecast job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub status: JobStatus,
    pub rows: Option<usize>,
    pub windows: Option<usize>,
    pub final_loss: Option<f64>,
    pub last_date: Option<NaiveDate>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub elapsed_seconds: f64,
    pub error: Option<String>,
}

impl JobReport {
    pub fn succeeded(job: &ForecastJob, outcome: &ForecastOutcome, elapsed_seconds: f64) -> Self {
        let range = outcome.forecast.price_range();
        Self {
            name: job.name(),
            input: job.input.clone(),
            output: job.output.clone(),
            status: JobStatus::Succeeded,
            rows: Some(outcome.rows),
            windows: Some(outcome.windows),
            final_loss: outcome.final_loss,
            last_date: Some(outcome.last_date),
            price_min: range.map(|(min, _)| min),
            price_max: range.map(|(_, max)| max),
            elapsed_seconds,
            error: None,
        }
    }

    /// Records the full error chain, e.g. `Failed to load x.csv: File not found: x.csv`
    pub fn failed(job: &ForecastJob, error: &anyhow::Error, elapsed_seconds: f64) -> Self {
        Self {
            name: job.name(),
            input: job.input.clone(),
            output: job.output.clone(),
            status: JobStatus::Failed,
            rows: None,
            windows: None,
            final_loss: None,
            last_date: None,
            price_min: None,
            price_max: None,
            elapsed_seconds,
            error: Some(format!("{:#}", error)),
        }
    }
}

/// Summary of a batch run, saved as pretty JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub timestamp: String,
    pub crate_version: String,
    pub rustc_version: String,
    pub settings: ForecastSettings,
    pub jobs: Vec<JobReport>,
    pub total_seconds: f64,
}

impl BatchReport {
    pub fn new(settings: &ForecastSettings) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            crate_version: built_info::PKG_VERSION.to_string(),
            rustc_version: built_info::RUSTC_VERSION.to_string(),
            settings: settings.clone(),
            jobs: Vec::new(),
            total_seconds: 0.0,
        }
    }

    pub fn push(&mut self, job: JobReport) {
        self.jobs.push(job);
    }

    pub fn succeeded(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Succeeded)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.len() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Writes the report into `report_dir` and returns the file path
    pub fn save(&self, report_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(report_dir)
            .with_context(|| format!("Failed to create {}", report_dir.display()))?;

        let stem = format!("forecast_run_{}", Local::now().format("%Y%m%d_%H%M%S_%3f"));
        let json = serde_json::to_string_pretty(&self)?;

        // Suffix a counter while the name is taken
        let mut attempt = 0;
        let (mut file, file_path) = loop {
            let file_path = if attempt == 0 {
                report_dir.join(format!("{}.json", stem))
            } else {
                report_dir.join(format!("{}_{}.json", stem, attempt))
            };
            match fs::OpenOptions::new().write(true).create_new(true).open(&file_path) {
                Ok(file) => break (file, file_path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", file_path.display()))
                }
            }
        };
        file.write_all(json.as_bytes())?;

        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use tempfile::tempdir;

    #[test]
    fn test_failed_job_keeps_error_chain() {
        let job = ForecastJob::new("data/nifty50_stock_data.csv", "out.csv");
        let err = anyhow!("File not found: data/nifty50_stock_data.csv").context("Failed to load");
        let report = JobReport::failed(&job, &err, 0.5);

        assert_eq!(report.status, JobStatus::Failed);
        assert_eq!(report.name, "nifty50_stock_data");
        let text = report.error.unwrap();
        assert!(text.starts_with("Failed to load"));
        assert!(text.contains("File not found"));
    }

    #[test]
    fn test_batch_report_counts_and_saves() {
        let mut report = BatchReport::new(&ForecastSettings::default());
        let job = ForecastJob::new("a.csv", "b.csv");
        report.push(JobReport::failed(&job, &anyhow!("boom"), 0.1));
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 0);
        assert!(report.has_failures());
        assert!(!report.crate_version.is_empty());

        let dir = tempdir().unwrap();
        let path = report.save(&dir.path().join("reports")).unwrap();
        let saved: BatchReport = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved.jobs.len(), 1);
        assert_eq!(saved.jobs[0].status, JobStatus::Failed);
    }

    #[test]
    fn test_reports_saved_back_to_back_do_not_overwrite() {
        let report = BatchReport::new(&ForecastSettings::default());
        let dir = tempdir().unwrap();

        let paths: Vec<PathBuf> = (0..3).map(|_| report.save(dir.path()).unwrap()).collect();

        assert_ne!(paths[0], paths[1]);
        assert_ne!(paths[1], paths[2]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }
}
