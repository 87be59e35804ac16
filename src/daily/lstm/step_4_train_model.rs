// External imports
use anyhow::{bail, Result};
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::cast::ToElement;
use log::{debug, info};
use ndarray::{Array1, Array3, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_1_tensor_preparation::{window_to_tensor, windows_to_tensors};
use super::step_3_lstm_model_arch::{DailyLSTMModel, DailyLSTMModelConfig};
use crate::constants::{BATCH_SIZE, EPOCHS, LEARNING_RATE};
use crate::error::ForecastError;

/// A fitted model that maps one scaled window to the next scaled close
pub trait ForecastModel {
    /// Predicts from a window of shape [sequence_length, n_features]
    fn predict(&self, window: ArrayView2<f64>) -> Result<f64>;

    /// Mean training loss of the last epoch, if the model was trained here
    fn training_loss(&self) -> Option<f64> {
        None
    }
}

/// Anything that can be fitted on windows `x` [count, sequence_length, n_features]
/// and next-step targets `y` [count]
pub trait SequenceRegressor {
    type Model: ForecastModel;

    fn train(&self, x: &Array3<f64>, y: &Array1<f64>) -> Result<Self::Model>;
}

/// Configuration for training the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub model: DailyLSTMModelConfig,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub epochs: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: DailyLSTMModelConfig::default(),
            learning_rate: LEARNING_RATE,
            batch_size: BATCH_SIZE,
            epochs: EPOCHS,
            shuffle: true,
            seed: None,
        }
    }
}

/// Trains `DailyLSTMModel` with Adam on mean squared error
#[derive(Debug, Clone)]
pub struct LstmTrainer<B: AutodiffBackend> {
    pub config: TrainingConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> LstmTrainer<B> {
    pub fn new(config: TrainingConfig, device: B::Device) -> Self {
        Self { config, device }
    }
}

/// Inference wrapper around a trained model
#[derive(Debug)]
pub struct TrainedLstm<B: Backend> {
    model: DailyLSTMModel<B>,
    device: B::Device,
    loss_history: Vec<f64>,
}

impl<B: Backend> TrainedLstm<B> {
    pub fn new(model: DailyLSTMModel<B>, device: B::Device) -> Self {
        Self {
            model,
            device,
            loss_history: Vec::new(),
        }
    }

    pub fn model(&self) -> &DailyLSTMModel<B> {
        &self.model
    }

    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }
}

impl<B: Backend> ForecastModel for TrainedLstm<B> {
    fn predict(&self, window: ArrayView2<f64>) -> Result<f64> {
        if window.ncols() != self.model.input_size() {
            return Err(ForecastError::FeatureMismatch {
                expected: self.model.input_size(),
                found: window.ncols(),
            }
            .into());
        }
        let input = window_to_tensor::<B>(window, &self.device);
        let output = self.model.predict(input);
        Ok(output.into_scalar().to_f64())
    }

    fn training_loss(&self) -> Option<f64> {
        self.loss_history.last().copied()
    }
}

impl<B: AutodiffBackend> SequenceRegressor for LstmTrainer<B> {
    type Model = TrainedLstm<B::InnerBackend>;

    fn train(&self, x: &Array3<f64>, y: &Array1<f64>) -> Result<Self::Model> {
        let config = &self.config;
        let (n_windows, sequence_length, n_features) = x.dim();

        if n_windows == 0 {
            return Err(ForecastError::InsufficientData {
                rows: sequence_length,
                required: sequence_length + 1,
            }
            .into());
        }
        if n_windows != y.len() {
            bail!("{} windows but {} targets", n_windows, y.len());
        }
        if n_features != config.model.input_size {
            return Err(ForecastError::FeatureMismatch {
                expected: config.model.input_size,
                found: n_features,
            }
            .into());
        }
        if config.batch_size == 0 {
            return Err(ForecastError::Model("batch_size must be positive".into()).into());
        }

        info!(
            "Training LSTM: {} windows of {}x{}, {} epochs, batch size {}",
            n_windows, sequence_length, n_features, config.epochs, config.batch_size
        );

        let mut rng = match config.seed {
            Some(seed) => {
                B::seed(seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_os_rng(),
        };

        let mut model: DailyLSTMModel<B> = config.model.init(&self.device);
        let mut optimizer = AdamConfig::new()
            .with_epsilon(1e-7)
            .init::<B, DailyLSTMModel<B>>();

        let mut indices: Vec<usize> = (0..n_windows).collect();
        let mut loss_history = Vec::with_capacity(config.epochs);

        for epoch in 1..=config.epochs {
            if config.shuffle {
                indices.shuffle(&mut rng);
            }

            let mut epoch_loss = 0.0;
            let mut num_batches = 0;
            for batch in indices.chunks(config.batch_size) {
                let batch_x = x.select(Axis(0), batch);
                let batch_y = y.select(Axis(0), batch);
                let (features, targets) = windows_to_tensors::<B>(&batch_x, &batch_y, &self.device);

                // Forward pass and MSE loss
                let predictions = model.forward(features, true);
                let diff = predictions - targets;
                let loss = (diff.clone() * diff).mean();
                epoch_loss += loss.clone().into_scalar().to_f64();
                num_batches += 1;

                // Backward pass and optimizer step
                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optimizer.step(config.learning_rate, model, grads);
            }

            let avg_loss = epoch_loss / num_batches as f64;
            debug!("Epoch {}/{}: loss = {:.6}", epoch, config.epochs, avg_loss);
            loss_history.push(avg_loss);
        }

        if let Some(loss) = loss_history.last() {
            info!("Training completed, final loss = {:.6}", loss);
        }

        Ok(TrainedLstm {
            model: model.valid(),
            device: self.device.clone(),
            loss_history,
        })
    }
}
