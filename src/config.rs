// External crates
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// Internal imports
use crate::constants::{DEFAULT_JOBS, FORECAST_DAYS, NOISE_STD_DEV, REPORT_DIR, SEQUENCE_LENGTH};
use crate::daily::lstm::step_4_train_model::TrainingConfig;

/// One input export and the forecast CSV it produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ForecastJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Short label used in logs and reports, e.g. `nifty50_stock_data`
    pub fn name(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }
}

/// Windowing and forecasting parameters shared by every job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub sequence_length: usize,
    pub horizon: usize,
    pub noise_std_dev: f64,
    pub seed: Option<u64>,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            sequence_length: SEQUENCE_LENGTH,
            horizon: FORECAST_DAYS,
            noise_std_dev: NOISE_STD_DEV,
            seed: None,
        }
    }
}

/// Everything one batch run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub jobs: Vec<ForecastJob>,
    pub settings: ForecastSettings,
    pub training: TrainingConfig,
    pub report_dir: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS
                .iter()
                .map(|(input, output)| ForecastJob::new(*input, *output))
                .collect(),
            settings: ForecastSettings::default(),
            training: TrainingConfig::default(),
            report_dir: Some(PathBuf::from(REPORT_DIR)),
        }
    }
}

impl BatchConfig {
    /// Load a configuration from JSON; absent fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let settings = &self.settings;
        if settings.sequence_length == 0 {
            bail!("sequence_length must be positive");
        }
        if settings.horizon == 0 {
            bail!("horizon must be positive");
        }
        if !settings.noise_std_dev.is_finite() || settings.noise_std_dev < 0.0 {
            bail!("noise_std_dev must be a non-negative number");
        }
        if self.training.batch_size == 0 {
            bail!("training.batch_size must be positive");
        }
        Ok(())
    }
}
