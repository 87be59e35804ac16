// External crates
use anyhow::Result;
use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor};
use ndarray::{s, Array1, Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// Internal modules
use crate::constants::{CLOSE_INDEX, FEATURE_COLUMNS};
use crate::error::ForecastError;

/// Per-column min-max scaler mapping each fitted column onto [0, 1]
///
/// A column whose observed range is zero is scaled with a range of 1.0, so
/// the constant value maps to 0 and inverts back to itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl MinMaxScaler {
    /// Fits min and max for every column of `data`
    ///
    /// Fails on NaN or infinite values. An empty matrix fits a zero range.
    pub fn fit(data: ArrayView2<f64>) -> Result<Self> {
        let n_features = data.ncols();
        if data.nrows() == 0 {
            return Ok(Self {
                min: vec![0.0; n_features],
                max: vec![0.0; n_features],
            });
        }

        let mut min = vec![f64::INFINITY; n_features];
        let mut max = vec![f64::NEG_INFINITY; n_features];

        for (i, row) in data.axis_iter(Axis(0)).enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if !v.is_finite() {
                    return Err(ForecastError::NonFiniteValue {
                        row: i,
                        column: column_label(j),
                    }
                    .into());
                }
                min[j] = min[j].min(v);
                max[j] = max[j].max(v);
            }
        }

        Ok(Self { min, max })
    }

    /// Fits the scaler and returns the scaled matrix
    pub fn fit_transform(data: ArrayView2<f64>) -> Result<(Self, Array2<f64>)> {
        let scaler = Self::fit(data)?;
        let mut scaled = data.to_owned();
        scaler.apply(&mut scaled, |v, min, range| (v - min) / range);
        Ok((scaler, scaled))
    }

    pub fn n_features(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self) -> &[f64] {
        &self.min
    }

    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Range used for column `j`; zero ranges are replaced by 1.0
    fn range(&self, j: usize) -> f64 {
        let range = self.max[j] - self.min[j];
        if range.abs() < f64::EPSILON {
            1.0
        } else {
            range
        }
    }

    fn check_width(&self, data: &ArrayView2<f64>) -> Result<()> {
        if data.ncols() != self.n_features() {
            return Err(ForecastError::FeatureMismatch {
                expected: self.n_features(),
                found: data.ncols(),
            }
            .into());
        }
        Ok(())
    }

    fn apply(&self, data: &mut Array2<f64>, f: impl Fn(f64, f64, f64) -> f64) {
        for mut row in data.axis_iter_mut(Axis(0)) {
            for (j, v) in row.iter_mut().enumerate() {
                *v = f(*v, self.min[j], self.range(j));
            }
        }
    }

    /// Maps raw values into scaled space
    pub fn transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_width(&data)?;
        let mut scaled = data.to_owned();
        self.apply(&mut scaled, |v, min, range| (v - min) / range);
        Ok(scaled)
    }

    /// Maps scaled values back into raw space
    pub fn inverse_transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_width(&data)?;
        let mut raw = data.to_owned();
        self.apply(&mut raw, |v, min, range| v * range + min);
        Ok(raw)
    }

    /// Inverts scaled values of a single fitted column
    pub fn inverse_transform_column(&self, values: &[f64], column: usize) -> Result<Vec<f64>> {
        if column >= self.n_features() {
            return Err(ForecastError::FeatureMismatch {
                expected: self.n_features(),
                found: column + 1,
            }
            .into());
        }
        let (min, range) = (self.min[column], self.range(column));
        Ok(values.iter().map(|v| v * range + min).collect())
    }
}

/// Feature name for column `j`, or its index past the known features
fn column_label(j: usize) -> String {
    FEATURE_COLUMNS
        .get(j)
        .map(|name| name.to_string())
        .unwrap_or_else(|| j.to_string())
}

/// Slices the scaled matrix into overlapping windows and next-day targets
///
/// For every `i` in `sequence_length..n_rows` the window holds rows
/// `[i - sequence_length, i)` and the target is the scaled close at row `i`.
///
/// # Returns
///
/// `x` with shape [n_rows - sequence_length, sequence_length, n_features]
/// and `y` with one target per window
pub fn build_windows(
    scaled: ArrayView2<f64>,
    sequence_length: usize,
) -> Result<(Array3<f64>, Array1<f64>)> {
    let n_rows = scaled.nrows();
    let n_features = scaled.ncols();

    if sequence_length == 0 || n_rows <= sequence_length {
        return Err(ForecastError::InsufficientData {
            rows: n_rows,
            required: sequence_length + 1,
        }
        .into());
    }
    if n_features <= CLOSE_INDEX {
        return Err(ForecastError::FeatureMismatch {
            expected: CLOSE_INDEX + 1,
            found: n_features,
        }
        .into());
    }

    let n_windows = n_rows - sequence_length;
    let mut features_data = vec![0f64; n_windows * sequence_length * n_features];

    // Parallel fill: each chunk is one window
    features_data
        .par_chunks_mut(sequence_length * n_features)
        .enumerate()
        .for_each(|(i, chunk)| {
            for t in 0..sequence_length {
                for f in 0..n_features {
                    chunk[t * n_features + f] = scaled[[i + t, f]];
                }
            }
        });

    let x = Array3::from_shape_vec((n_windows, sequence_length, n_features), features_data)?;
    let y = scaled.slice(s![sequence_length.., CLOSE_INDEX]).to_owned();

    Ok((x, y))
}

/// Converts windows and targets into Burn tensors
///
/// # Returns
///
/// `([n_windows, sequence_length, n_features], [n_windows, 1])`
pub fn windows_to_tensors<B: Backend>(
    x: &Array3<f64>,
    y: &Array1<f64>,
    device: &B::Device,
) -> (Tensor<B, 3>, Tensor<B, 2>) {
    let (n_windows, sequence_length, n_features) = x.dim();

    let features_data: Vec<f32> = x.iter().map(|&v| v as f32).collect();
    let target_data: Vec<f32> = y.iter().map(|&v| v as f32).collect();

    let features = Tensor::<B, 1>::from_floats(features_data.as_slice(), device)
        .reshape(Shape::new([n_windows, sequence_length, n_features]));
    let targets = Tensor::<B, 1>::from_floats(target_data.as_slice(), device)
        .reshape(Shape::new([n_windows, 1]));

    (features, targets)
}

/// Converts a single window into a [1, sequence_length, n_features] tensor
pub fn window_to_tensor<B: Backend>(window: ArrayView2<f64>, device: &B::Device) -> Tensor<B, 3> {
    let (sequence_length, n_features) = window.dim();
    let data: Vec<f32> = window.iter().map(|&v| v as f32).collect();
    Tensor::<B, 1>::from_floats(data.as_slice(), device)
        .reshape(Shape::new([1, sequence_length, n_features]))
}
