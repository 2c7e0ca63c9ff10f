//! Flat parameter vectors: the unit of mutation, comparison and storage.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Flattened weights and biases of one [`Brain`](super::brain::Brain).
///
/// The layout is fixed by [`Brain::encode`](super::brain::Brain::encode):
/// layer-major, all weights of a layer before its biases, weights row-major
/// over `[inputs, outputs]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome(Vec<f32>);

impl Genome {
    /// Wraps a parameter vector.
    pub fn new(params: Vec<f32>) -> Self {
        Self(params)
    }

    /// All-zero genome of the given length.
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the genome holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read-only view of the parameters.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Adds zero-mean Gaussian noise with standard deviation `scale` to every
    /// parameter. A zero scale leaves the genome untouched.
    pub fn perturb<R: Rng + ?Sized>(&mut self, scale: f32, rng: &mut R) -> Result<()> {
        if scale == 0.0 {
            return Ok(());
        }
        let normal = Normal::new(0.0, scale).map_err(|e| {
            Error::invalid_configuration(format!("mutation noise {scale}: {e}"))
        })?;
        for p in &mut self.0 {
            *p += normal.sample(rng);
        }
        Ok(())
    }

    /// Moves every parameter away from `reference` by `rate` times its offset:
    /// `p += rate * (p - reference)`.
    pub fn push_away_from(&mut self, reference: &Genome, rate: f32) {
        if rate == 0.0 {
            return;
        }
        for (p, r) in self.0.iter_mut().zip(&reference.0) {
            *p += rate * (*p - r);
        }
    }

    /// Elementwise mean of a set of equally sized genomes.
    ///
    /// Returns `None` for an empty set.
    pub fn mean(genomes: &[Genome]) -> Option<Genome> {
        let first = genomes.first()?;
        let mut sum = vec![0.0f32; first.len()];
        for genome in genomes {
            for (s, p) in sum.iter_mut().zip(&genome.0) {
                *s += p;
            }
        }
        let n = genomes.len() as f32;
        Some(Genome(sum.into_iter().map(|s| s / n).collect()))
    }

    /// Euclidean distance between two genomes.
    pub fn distance(&self, other: &Genome) -> f32 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

/// Keeps the first occurrence of each genome, preserving order, until `limit`
/// distinct genomes are collected.
pub fn distinct(genomes: impl IntoIterator<Item = Genome>, limit: usize) -> Vec<Genome> {
    let mut unique: Vec<Genome> = Vec::with_capacity(limit);
    for genome in genomes {
        if unique.len() >= limit {
            break;
        }
        if !unique.contains(&genome) {
            unique.push(genome);
        }
    }
    unique
}
