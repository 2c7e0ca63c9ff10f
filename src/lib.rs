//! # Evodrive - Evolutionary Track Driving
//!
//! Trains populations of small neural networks to drive cars around a closed
//! track. There is no gradient descent: each generation the best drivers are
//! kept and mutated copies of them fill the rest of the grid.
//!
//! ## Features
//!
//! - Feed-forward networks with a configurable activation function
//! - Ray-cast distance sensors against the track boundaries
//! - Simple car kinematics with bounded acceleration and turn rate
//! - Elitist selection with mean-relative mutation
//! - Seedable, reproducible runs
//! - Save/load of the best genomes with their topology
//!
//! ## Core Modules
//!
//! - [`simulation::brain`] - Neural network implementation
//! - [`simulation::track`] - Track boundaries and ray casting
//! - [`simulation::car`] - Car kinematics, sensing and fitness
//! - [`simulation::evolution`] - Generation loop, selection and mutation
//! - [`simulation::persistence`] - Neural network files

/// Error types.
pub mod error;

/// Core simulation logic and data structures.
pub mod simulation {
    /// Activation functions.
    pub mod activation;
    /// Neural network implementation for car brains.
    pub mod brain;
    /// Car state, kinematics and sensors.
    pub mod car;
    /// Generation loop with selection and mutation.
    pub mod evolution;
    /// Flat parameter vectors used for mutation and storage.
    pub mod genome;
    /// Geometric utility functions for ray casting.
    pub mod geometric_utils;
    /// Summaries of finished generations.
    pub mod history;
    /// Frame skipping and fps limiting.
    pub mod pacing;
    /// Training parameters and network topology.
    pub mod params;
    /// Neural network files.
    pub mod persistence;
    /// Track geometry.
    pub mod track;
}

pub use error::{Error, Result};
