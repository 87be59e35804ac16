// External imports
use anyhow::{anyhow, Result};
use chrono::{Days, NaiveDate};
use log::debug;
use ndarray::{s, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Internal imports
use super::step_1_tensor_preparation::MinMaxScaler;
use super::step_4_train_model::ForecastModel;
use crate::constants::CLOSE_INDEX;
use crate::error::ForecastError;
use crate::util::file_utils::write_forecast_csv;

/// Gaussian noise added to every emitted forecast
pub struct NoiseSampler {
    rng: StdRng,
    normal: Option<Normal<f64>>,
}

impl NoiseSampler {
    /// Create a sampler with mean 0 and the given std-dev
    ///
    /// A std-dev of 0 disables noise; a `seed` makes the draws reproducible.
    pub fn new(std_dev: f64, seed: Option<u64>) -> Result<Self> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(anyhow!("Invalid noise std-dev: {}", std_dev));
        }
        let normal = if std_dev > 0.0 {
            Some(Normal::new(0.0, std_dev).map_err(|e| anyhow!("Invalid noise std-dev: {}", e))?)
        } else {
            None
        };
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self { rng, normal })
    }

    /// A sampler that always returns 0
    pub fn disabled() -> Self {
        Self {
            rng: StdRng::seed_from_u64(0),
            normal: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.normal.is_some()
    }

    pub fn sample(&mut self) -> f64 {
        match &self.normal {
            Some(normal) => normal.sample(&mut self.rng),
            None => 0.0,
        }
    }
}

/// Generate forecasts for future days, one step at a time
///
/// The window starts as the last `sequence_length` scaled rows. After each
/// step the oldest row is dropped and a synthetic row is appended in which
/// every feature equals the model's raw prediction. Noise only affects the
/// emitted value, not the row fed back into the window.
///
/// # Arguments
///
/// * `model` - Fitted model
/// * `scaled` - Scaled feature matrix [rows, n_features]
/// * `sequence_length` - Number of rows in each window
/// * `forecast_days` - Number of steps to forecast
/// * `noise` - Noise added to each emitted value
///
/// # Returns
///
/// `forecast_days` scaled close predictions
pub fn generate_forecast<M: ForecastModel + ?Sized>(
    model: &M,
    scaled: ArrayView2<f64>,
    sequence_length: usize,
    forecast_days: usize,
    noise: &mut NoiseSampler,
) -> Result<Vec<f64>> {
    let n_rows = scaled.nrows();
    if sequence_length == 0 || n_rows < sequence_length {
        return Err(ForecastError::InsufficientData {
            rows: n_rows,
            required: sequence_length.max(1),
        }
        .into());
    }

    let mut window = scaled.slice(s![n_rows - sequence_length.., ..]).to_owned();
    let mut forecasts = Vec::with_capacity(forecast_days);

    for day in 0..forecast_days {
        let predicted = model.predict(window.view())?;
        if !predicted.is_finite() {
            return Err(ForecastError::Model(format!(
                "non-finite prediction at step {}",
                day + 1
            ))
            .into());
        }

        let emitted = predicted + noise.sample();
        debug!("Step {}: predicted {:.6}, emitted {:.6}", day + 1, predicted, emitted);
        forecasts.push(emitted);

        roll_window(&mut window, predicted);
    }

    Ok(forecasts)
}

/// Drops the oldest row and appends a row filled with `value`
fn roll_window(window: &mut Array2<f64>, value: f64) {
    let n_rows = window.nrows();
    let tail = window.slice(s![1.., ..]).to_owned();
    window.slice_mut(s![..n_rows - 1, ..]).assign(&tail);
    window.row_mut(n_rows - 1).fill(value);
}

/// Convert scaled close predictions back to prices
///
/// Each value is placed in the close column of an otherwise zero row and run
/// through the scaler's inverse; only the close column is read back.
pub fn inverse_scale_forecast(scaler: &MinMaxScaler, predictions: &[f64]) -> Result<Vec<f64>> {
    if scaler.n_features() <= CLOSE_INDEX {
        return Err(ForecastError::FeatureMismatch {
            expected: CLOSE_INDEX + 1,
            found: scaler.n_features(),
        }
        .into());
    }

    let mut padded = Array2::<f64>::zeros((predictions.len(), scaler.n_features()));
    for (i, &value) in predictions.iter().enumerate() {
        padded[[i, CLOSE_INDEX]] = value;
    }

    let raw = scaler.inverse_transform(padded.view())?;
    Ok(raw.column(CLOSE_INDEX).to_vec())
}

/// The `forecast_days` calendar days following `last_date` (weekends included)
pub fn future_dates(last_date: NaiveDate, forecast_days: usize) -> Result<Vec<NaiveDate>> {
    (1..=forecast_days as u64)
        .map(|k| {
            last_date
                .checked_add_days(Days::new(k))
                .ok_or_else(|| anyhow!("Date overflow adding {} days to {}", k, last_date))
        })
        .collect()
}

/// Dated close-price forecast ready to be written out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
}

impl ForecastSeries {
    /// Pairs inverse-scaled predictions with the days after `last_date`
    pub fn new(last_date: NaiveDate, prices: Vec<f64>) -> Result<Self> {
        let dates = future_dates(last_date, prices.len())?;
        Ok(Self { dates, prices })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// (min, max) predicted price
    pub fn price_range(&self) -> Option<(f64, f64)> {
        if self.prices.is_empty() {
            return None;
        }
        let min = self.prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_forecast_csv(path, &self.dates, &self.prices)
    }
}
