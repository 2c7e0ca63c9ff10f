//! Activation functions applied after every layer of a [`Brain`](super::brain::Brain).
//!
//! `sigmoid`, `relu` and `leaky_relu` act elementwise. `softmax` acts on the
//! whole layer output at once.

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Slope of [`leaky_relu`] for negative inputs.
pub const LEAKY_RELU_ALPHA: f32 = 0.01;

/// Logistic function, range (0, 1).
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Rectified linear unit.
#[inline]
pub fn relu(x: f32) -> f32 {
    x.max(0.0)
}

/// Rectified linear unit that lets a small gradient through below zero.
#[inline]
pub fn leaky_relu(x: f32) -> f32 {
    if x > 0.0 { x } else { LEAKY_RELU_ALPHA * x }
}

/// Normalized exponential over the whole vector.
///
/// The maximum is subtracted before exponentiating so large inputs cannot
/// overflow. The result sums to one for any finite input.
pub fn softmax(v: &Array1<f32>) -> Array1<f32> {
    let max = v.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let mut out = v.mapv(|x| (x - max).exp());
    let sum = out.sum();
    out /= sum;
    out
}

/// Activation function selector used by a network topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// [`sigmoid`]
    Sigmoid,
    /// [`relu`]
    Relu,
    /// [`leaky_relu`]
    #[default]
    LeakyRelu,
    /// [`softmax`]
    Softmax,
}

impl Activation {
    /// All selectable activations.
    pub const ALL: [Activation; 4] = [
        Activation::Sigmoid,
        Activation::Relu,
        Activation::LeakyRelu,
        Activation::Softmax,
    ];

    /// Applies the activation to a layer output in place.
    #[inline]
    pub fn apply(self, output: &mut Array1<f32>) {
        match self {
            Activation::Sigmoid => output.mapv_inplace(sigmoid),
            Activation::Relu => output.mapv_inplace(relu),
            Activation::LeakyRelu => output.mapv_inplace(leaky_relu),
            Activation::Softmax => *output = softmax(output),
        }
    }

    /// Name used in network files and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Relu => "relu",
            Activation::LeakyRelu => "leaky_relu",
            Activation::Softmax => "softmax",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Activation::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| {
                Error::invalid_configuration(format!(
                    "unknown activation function '{s}' (expected one of sigmoid, relu, leaky_relu, softmax)"
                ))
            })
    }
}
