//! Neural network files.
//!
//! A file holds one topology descriptor followed by one or more genomes in
//! [`Brain::encode`](super::brain::Brain::encode) order, stored as JSON.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::genome::Genome;
use super::params::TopologyConfig;
use crate::error::{Error, Result};

/// Contents of a neural network file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkFile {
    /// Shape of every stored network.
    pub topology: TopologyConfig,
    /// Generation the genomes were taken from.
    pub generation: u32,
    /// When the file was written.
    pub saved_at: DateTime<Utc>,
    /// Genomes, best first.
    pub genomes: Vec<Genome>,
}

impl NetworkFile {
    /// Creates a file record stamped with the current time.
    pub fn new(topology: TopologyConfig, generation: u32, genomes: Vec<Genome>) -> Self {
        Self {
            topology,
            generation,
            saved_at: Utc::now(),
            genomes,
        }
    }

    /// Saves the record as JSON.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(
            path = %path.display(),
            genomes = self.genomes.len(),
            generation = self.generation,
            "saved networks"
        );
        Ok(())
    }

    /// Loads a record and checks that its descriptor is self-consistent.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let file: NetworkFile = serde_json::from_str(&json)?;
        file.topology.validate()?;
        if file.genomes.is_empty() {
            return Err(Error::invalid_configuration(format!(
                "network file {} holds no genomes",
                path.display()
            )));
        }
        debug!(
            path = %path.display(),
            genomes = file.genomes.len(),
            topology = %file.topology.describe(),
            "loaded network file"
        );
        Ok(file)
    }

    /// Returns the genomes if the stored topology matches `topology` and
    /// every genome has the matching length.
    ///
    /// The descriptor is compared before any genome is looked at.
    pub fn into_genomes(self, topology: &TopologyConfig) -> Result<Vec<Genome>> {
        topology.check_compatible(&self.topology)?;
        let expected = topology.parameter_count();
        if let Some(bad) = self.genomes.iter().find(|g| g.len() != expected) {
            return Err(Error::shape_mismatch(
                format!("{expected} parameters"),
                format!("{} parameters", bad.len()),
            ));
        }
        Ok(self.genomes)
    }
}
