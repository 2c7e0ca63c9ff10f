//! Feed-forward network that drives a car.
//!
//! A [`Brain`] is a stack of dense [`Mlp`] layers sharing one activation
//! function, which is applied after every layer including the last. Brains
//! never change while a car drives; evolution works on their flattened
//! [`Genome`] and decodes a fresh brain for each child.

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub mod mlp;

pub use mlp::Mlp;

use super::activation::Activation;
use super::genome::Genome;
use super::params::TopologyConfig;
use crate::error::{Error, Result};

/// Multi-layer perceptron with a single activation function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brain {
    /// Ordered layers from input to output.
    pub layers: Vec<Mlp>,
    /// Activation applied after each layer.
    pub activation: Activation,
}

impl Brain {
    /// Creates a brain with random weights for the given topology.
    pub fn new_random<R: Rng + ?Sized>(topology: &TopologyConfig, rng: &mut R) -> Self {
        let sizes = topology.layer_sizes();
        let layers = sizes
            .windows(2)
            .map(|w| Mlp::new_random(w[0], w[1], rng))
            .collect();

        Brain {
            layers,
            activation: topology.activation(),
        }
    }

    /// Creates a brain whose weights and biases are all zero.
    pub fn zeros(topology: &TopologyConfig) -> Self {
        let sizes = topology.layer_sizes();
        Brain {
            layers: sizes.windows(2).map(|w| Mlp::zeros(w[0], w[1])).collect(),
            activation: topology.activation(),
        }
    }

    /// Rebuilds a brain from a genome.
    ///
    /// Fails with [`Error::ShapeMismatch`] if the genome length differs from
    /// the topology's parameter count.
    pub fn decode(topology: &TopologyConfig, genome: &Genome) -> Result<Self> {
        let expected = topology.parameter_count();
        if genome.len() != expected {
            return Err(Error::shape_mismatch(
                format!("{expected} parameters"),
                format!("{} parameters", genome.len()),
            ));
        }

        let params = genome.as_slice();
        let mut offset = 0;
        let mut layers = Vec::with_capacity(topology.hidden_sizes().len() + 1);
        for w in topology.layer_sizes().windows(2) {
            let (inputs, outputs) = (w[0], w[1]);
            let len = inputs * outputs + outputs;
            layers.push(Mlp::from_params(inputs, outputs, &params[offset..offset + len])?);
            offset += len;
        }

        Ok(Brain {
            layers,
            activation: topology.activation(),
        })
    }

    /// Flattens all weights and biases, layer by layer.
    pub fn encode(&self) -> Genome {
        let mut flat = Vec::with_capacity(self.parameter_count());
        for layer in &self.layers {
            layer.flatten_into(&mut flat);
        }
        Genome::new(flat)
    }

    /// Runs a forward pass through the brain.
    #[inline]
    pub fn think(&self, inputs: &Array1<f32>) -> Array1<f32> {
        debug_assert_eq!(inputs.len(), self.input_size());
        let mut output = inputs.clone();
        for layer in &self.layers {
            output = layer.forward(&output);
            self.activation.apply(&mut output);
        }
        output
    }

    /// Number of inputs the brain expects.
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, Mlp::input_size)
    }

    /// Number of outputs the brain produces.
    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, Mlp::output_size)
    }

    /// Total number of weights and biases.
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.biases.len())
            .sum()
    }

    /// Euclidean distance between the parameters of two brains.
    pub fn distance(brain1: &Brain, brain2: &Brain) -> f32 {
        brain1.encode().distance(&brain2.encode())
    }
}
