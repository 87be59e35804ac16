// External imports
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_2_lstm_cell::DailyLSTM;
use crate::constants::{DROPOUT, FEATURE_COLUMNS, HIDDEN_SIZE, NUM_LAYERS};

/// Stacked LSTM regressor predicting the next scaled close
///
/// Every LSTM layer is followed by dropout; the last time step of the
/// top layer feeds a single linear output unit.
#[derive(Module, Debug)]
pub struct DailyLSTMModel<B: Backend> {
    // Model hyperparameters
    input_size: usize,
    hidden_size: usize,
    output_size: usize,

    // Model layers
    layers: Vec<DailyLSTM<B>>,
    dropout: Dropout,
    output_layer: Linear<B>,
}

impl<B: Backend> DailyLSTMModel<B> {
    /// Create a new stacked LSTM model
    ///
    /// # Arguments
    ///
    /// * `input_size` - Number of input features
    /// * `hidden_size` - Size of hidden state of every layer
    /// * `output_size` - Size of output (1 for next-day close)
    /// * `num_layers` - Number of stacked LSTM layers
    /// * `dropout_rate` - Dropout applied after each LSTM layer
    /// * `device` - Device to place tensors on
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        num_layers: usize,
        dropout_rate: f64,
        device: &B::Device,
    ) -> Self {
        let layers = (0..num_layers.max(1))
            .map(|i| {
                let layer_input = if i == 0 { input_size } else { hidden_size };
                DailyLSTM::new(layer_input, hidden_size, device)
            })
            .collect();

        let dropout = DropoutConfig::new(dropout_rate).init();
        let output_layer = LinearConfig::new(hidden_size, output_size).init(device);

        Self {
            input_size,
            hidden_size,
            output_size,
            layers,
            dropout,
            output_layer,
        }
    }

    /// Forward pass through the model
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape [batch_size, sequence_length, input_size]
    /// * `is_training` - Whether dropout is active
    ///
    /// # Returns
    ///
    /// The output tensor of shape [batch_size, output_size]
    pub fn forward(&self, x: Tensor<B, 3>, is_training: bool) -> Tensor<B, 2> {
        let [batch_size, sequence_length, _] = x.dims();

        let mut hidden = x;
        for layer in &self.layers {
            hidden = layer.forward(hidden);
            if is_training {
                hidden = self.dropout.forward(hidden);
            }
        }

        // Only the last step of the top layer is used
        let last_output = hidden
            .narrow(1, sequence_length - 1, 1)
            .reshape([batch_size, self.hidden_size]);

        self.output_layer.forward(last_output)
    }

    /// Inference without dropout
    pub fn predict(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        self.forward(x, false)
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

/// Configuration for the DailyLSTMModel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyLSTMModelConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub num_layers: usize,
    pub dropout_rate: f64,
}

impl Default for DailyLSTMModelConfig {
    fn default() -> Self {
        Self {
            input_size: FEATURE_COLUMNS.len(),
            hidden_size: HIDDEN_SIZE,
            output_size: 1,
            num_layers: NUM_LAYERS,
            dropout_rate: DROPOUT,
        }
    }
}

impl DailyLSTMModelConfig {
    /// Initialize a model from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> DailyLSTMModel<B> {
        DailyLSTMModel::new(
            self.input_size,
            self.hidden_size,
            self.output_size,
            self.num_layers,
            self.dropout_rate,
            device,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_default_config_is_three_layers_of_fifty() {
        let config = DailyLSTMModelConfig::default();
        assert_eq!(config.input_size, 8);
        assert_eq!(config.hidden_size, 50);
        assert_eq!(config.num_layers, 3);
        assert_eq!(config.output_size, 1);
        assert!((config.dropout_rate - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_model_forward_shape() {
        let device = NdArrayDevice::default();
        let model: DailyLSTMModel<NdArray> = DailyLSTMModelConfig::default().init(&device);

        assert_eq!(model.num_layers(), 3);
        assert_eq!(model.input_size(), 8);

        let input = Tensor::<NdArray, 3>::ones([2, 15, 8], &device);
        let output = model.forward(input, false);
        assert_eq!(output.dims(), [2, 1]);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let device = NdArrayDevice::default();
        let config = DailyLSTMModelConfig {
            hidden_size: 8,
            num_layers: 2,
            ..Default::default()
        };
        let model: DailyLSTMModel<NdArray> = config.init(&device);

        let input = Tensor::<NdArray, 3>::ones([1, 15, 8], &device) * 0.5;
        let a = model.predict(input.clone()).into_scalar();
        let b = model.predict(input).into_scalar();
        assert_eq!(a, b);
    }
}
