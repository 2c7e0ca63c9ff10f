//! Fully connected layer.

use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single dense layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    /// Weight matrix (`input_size` × `output_size`).
    pub weights: Array2<f32>,
    /// Bias vector (`output_size`).
    pub biases: Array1<f32>,
}

impl Mlp {
    /// Creates a layer with Gaussian weights scaled by fan-in and zero biases.
    pub fn new_random<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let std_dev = 1.0 / (input_size.max(1) as f32).sqrt();
        Self {
            weights: Array2::from_shape_simple_fn((input_size, output_size), || {
                rng.sample::<f32, _>(StandardNormal) * std_dev
            }),
            biases: Array1::zeros(output_size),
        }
    }

    /// Creates a layer with every parameter zero.
    pub fn zeros(input_size: usize, output_size: usize) -> Self {
        Self {
            weights: Array2::zeros((input_size, output_size)),
            biases: Array1::zeros(output_size),
        }
    }

    /// Rebuilds a layer from its flattened weights followed by its biases.
    pub fn from_params(input_size: usize, output_size: usize, params: &[f32]) -> Result<Self> {
        let weight_count = input_size * output_size;
        if params.len() != weight_count + output_size {
            return Err(Error::shape_mismatch(
                format!("{} layer parameters", weight_count + output_size),
                format!("{} layer parameters", params.len()),
            ));
        }
        let weights = Array2::from_shape_vec((input_size, output_size), params[..weight_count].to_vec())
            .map_err(|e| Error::shape_mismatch(format!("{input_size}x{output_size} weights"), e))?;
        let biases = Array1::from_vec(params[weight_count..].to_vec());
        Ok(Self { weights, biases })
    }

    /// Number of inputs.
    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    /// Number of outputs.
    pub fn output_size(&self) -> usize {
        self.biases.len()
    }

    /// Weighted sum `x·W + b`, before activation.
    #[inline]
    pub fn forward(&self, inputs: &Array1<f32>) -> Array1<f32> {
        let mut output = inputs.dot(&self.weights);
        output += &self.biases;
        output
    }

    /// Appends weights (row-major) then biases to `flat`.
    pub fn flatten_into(&self, flat: &mut Vec<f32>) {
        flat.extend(self.weights.iter().copied());
        flat.extend(self.biases.iter().copied());
    }
}
