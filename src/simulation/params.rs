//! Training parameters and network topology.
//!
//! [`Params`] carries every numeric knob of a training session and is built
//! once (defaults, optional TOML file, command line) and validated. The
//! network shape lives separately in [`TopologyConfig`], which is resolved
//! once against an existing network file and then passed around as data.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::activation::Activation;
use crate::error::{Error, Result};

/// Number of network outputs: throttle and steering.
pub const CONTROL_COUNT: usize = 2;

/// How a car's fitness accumulates while it is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    /// Euclidean distance travelled.
    Distance,
    /// Centerline checkpoints reached in order.
    #[default]
    Progress,
}

/// Point that mutation pushes children away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationReference {
    /// Mean genome of the ranked population.
    #[default]
    PopulationMean,
    /// Genome of the best car of the generation.
    Best,
}

/// Car physics and sensing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarParams {
    /// Top speed in either direction (units per second).
    pub max_speed: f32,
    /// Speed change per second at full throttle.
    pub acceleration: f32,
    /// Fraction of speed lost per second.
    pub drag: f32,
    /// Heading change per second at full steering (radians).
    pub turn_rate: f32,
    /// Sensor ray length used to normalize readings.
    pub sensor_range: f32,
    /// Distance at which a centerline checkpoint counts as reached.
    pub checkpoint_radius: f32,
    /// Fitness accounting.
    pub fitness_metric: FitnessMetric,
}

impl Default for CarParams {
    fn default() -> Self {
        Self {
            max_speed: 400.0,
            acceleration: 500.0,
            drag: 0.6,
            turn_rate: 2.0,
            sensor_range: 500.0,
            checkpoint_radius: 60.0,
            fitness_metric: FitnessMetric::Progress,
        }
    }
}

/// How track control points are turned into boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackParams {
    /// Distance between the inner and outer boundary.
    pub width: f32,
    /// Scale applied to control points after moving the first one to the origin.
    pub scale: f32,
    /// Bezier parameter step per curve segment.
    pub curve_step: f32,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            width: 100.0,
            scale: 5.0,
            curve_step: 0.05,
        }
    }
}

/// Training session parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Population size, constant across generations.
    pub ai_count: usize,
    /// Number of elites kept per generation.
    pub select_count: usize,
    /// Noise applied to seeded genomes beyond those found in the network file.
    pub init_mutate_noise: f32,
    /// Gaussian noise scale applied to every child.
    pub mutate_noise: f32,
    /// Strength of the push away from the mutation reference.
    pub mutate_learn_rate: f32,
    /// Reference genome for the push.
    pub mutation_reference: MutationReference,
    /// Genomes written per save; zero disables saving at generation boundaries.
    pub save_quota: usize,
    /// Generation tick cap; `None` runs until every car is dead.
    pub max_ticks: Option<u32>,
    /// Simulation timestep in seconds.
    pub dt: f32,
    /// Extra simulation ticks run per rendered frame.
    pub frame_skip: u32,
    /// Sleep between frames to hold the target frame rate.
    pub limit_fps: bool,
    /// Random seed; a random one is drawn and logged when absent.
    pub seed: Option<u64>,
    /// Number of generation summaries kept in memory.
    pub history_size: usize,
    /// Car physics.
    pub car: CarParams,
    /// Track construction.
    pub track: TrackParams,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            ai_count: 10,
            select_count: 2,
            init_mutate_noise: 0.01,
            mutate_noise: 0.1,
            mutate_learn_rate: 0.1,
            mutation_reference: MutationReference::PopulationMean,
            save_quota: 0,
            max_ticks: Some(3000),
            dt: 0.032,
            frame_skip: 0,
            limit_fps: false,
            seed: None,
            history_size: 100,
            car: CarParams::default(),
            track: TrackParams::default(),
        }
    }
}

impl Params {
    /// Loads parameters from a TOML file. Missing keys take default values.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Checks ranges and relations between parameters.
    pub fn validate(&self) -> Result<()> {
        if self.ai_count == 0 {
            return Err(Error::invalid_configuration("ai-count must be at least 1"));
        }
        if self.select_count == 0 || self.select_count > self.ai_count {
            return Err(Error::invalid_configuration(format!(
                "select-count must be between 1 and ai-count ({}), got {}",
                self.ai_count, self.select_count
            )));
        }
        for (name, value) in [
            ("init-mutate-noise", self.init_mutate_noise),
            ("mutate-noise", self.mutate_noise),
            ("mutate-learn-rate", self.mutate_learn_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::invalid_configuration(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(Error::invalid_configuration("dt must be positive"));
        }
        if self.max_ticks == Some(0) {
            return Err(Error::invalid_configuration("max-ticks must be at least 1"));
        }
        let car = &self.car;
        for (name, value) in [
            ("max_speed", car.max_speed),
            ("acceleration", car.acceleration),
            ("turn_rate", car.turn_rate),
            ("sensor_range", car.sensor_range),
            ("checkpoint_radius", car.checkpoint_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::invalid_configuration(format!(
                    "car.{name} must be positive, got {value}"
                )));
            }
        }
        if !(car.drag.is_finite() && car.drag >= 0.0) {
            return Err(Error::invalid_configuration("car.drag must be non-negative"));
        }
        let track = &self.track;
        if !(track.width > 0.0 && track.scale > 0.0 && track.curve_step > 0.0 && track.curve_step <= 1.0)
        {
            return Err(Error::invalid_configuration(
                "track width and scale must be positive and curve_step in (0, 1]",
            ));
        }
        Ok(())
    }
}

/// Validated, immutable network shape.
///
/// The input size always equals the number of sensor angles and the output
/// size is [`CONTROL_COUNT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    input_size: usize,
    hidden_sizes: Vec<usize>,
    output_size: usize,
    activation: Activation,
    sensor_angles: Vec<f32>,
}

impl TopologyConfig {
    /// Builds a topology for the given sensors and hidden layers.
    pub fn new(
        sensor_angles: Vec<f32>,
        hidden_sizes: Vec<usize>,
        activation: Activation,
    ) -> Result<Self> {
        let topology = Self {
            input_size: sensor_angles.len(),
            hidden_sizes,
            output_size: CONTROL_COUNT,
            activation,
            sensor_angles,
        };
        topology.validate()?;
        Ok(topology)
    }

    /// Checks internal consistency, used after deserializing a descriptor.
    pub fn validate(&self) -> Result<()> {
        if self.sensor_angles.is_empty() {
            return Err(Error::invalid_configuration("at least one sensor angle is required"));
        }
        if let Some(angle) = self.sensor_angles.iter().find(|a| !a.is_finite()) {
            return Err(Error::invalid_configuration(format!(
                "sensor angle {angle} is not finite"
            )));
        }
        if self.hidden_sizes.contains(&0) {
            return Err(Error::invalid_configuration("hidden layer sizes must be positive"));
        }
        if self.input_size != self.sensor_angles.len() {
            return Err(Error::shape_mismatch(
                format!("{} inputs (one per sensor)", self.sensor_angles.len()),
                format!("{} inputs", self.input_size),
            ));
        }
        if self.output_size != CONTROL_COUNT {
            return Err(Error::shape_mismatch(
                format!("{CONTROL_COUNT} outputs"),
                format!("{} outputs", self.output_size),
            ));
        }
        Ok(())
    }

    /// Number of network inputs.
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Hidden layer sizes in order.
    pub fn hidden_sizes(&self) -> &[usize] {
        &self.hidden_sizes
    }

    /// Number of network outputs.
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Activation applied after every layer.
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Sensor angles in degrees relative to heading.
    pub fn sensor_angles(&self) -> &[f32] {
        &self.sensor_angles
    }

    /// Sizes of every layer, input first.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_sizes.len() + 2);
        sizes.push(self.input_size);
        sizes.extend_from_slice(&self.hidden_sizes);
        sizes.push(self.output_size);
        sizes
    }

    /// Length of a genome for this topology.
    pub fn parameter_count(&self) -> usize {
        self.layer_sizes()
            .windows(2)
            .map(|w| w[0] * w[1] + w[1])
            .sum()
    }

    /// Fails with [`Error::ShapeMismatch`] unless `other` describes the same network.
    pub fn check_compatible(&self, other: &TopologyConfig) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(Error::shape_mismatch(self.describe(), other.describe()))
        }
    }

    /// Short human-readable description.
    pub fn describe(&self) -> String {
        format!(
            "layers {:?} ({}), sensors {:?}",
            self.layer_sizes(),
            self.activation,
            self.sensor_angles
        )
    }
}

/// Topology fields requested by the caller, any of which may be left to the
/// network file.
#[derive(Debug, Clone, Default)]
pub struct TopologyRequest {
    /// Sensor angles in degrees.
    pub sensor_angles: Option<Vec<f32>>,
    /// Hidden layer sizes.
    pub hidden_sizes: Option<Vec<usize>>,
    /// Activation function.
    pub activation: Option<Activation>,
}

impl TopologyRequest {
    /// Combines the request with the topology stored in a network file.
    ///
    /// Fields set on both sides must agree, otherwise the result is a
    /// [`Error::ShapeMismatch`]. Sensor angles and hidden sizes must come from
    /// one side or the other. The activation defaults to leaky ReLU.
    pub fn resolve(&self, stored: Option<&TopologyConfig>) -> Result<TopologyConfig> {
        let sensor_angles = pick(
            "sensor angles",
            self.sensor_angles.as_ref(),
            stored.map(|t| &t.sensor_angles),
        )?;
        let hidden_sizes = pick(
            "hidden layer sizes",
            self.hidden_sizes.as_ref(),
            stored.map(|t| &t.hidden_sizes),
        )?;
        let activation = match (self.activation, stored.map(|t| t.activation)) {
            (Some(requested), Some(found)) if requested != found => {
                return Err(Error::shape_mismatch(
                    format!("activation {requested}"),
                    format!("activation {found}"),
                ));
            }
            (Some(a), _) | (None, Some(a)) => a,
            (None, None) => Activation::default(),
        };

        TopologyConfig::new(sensor_angles, hidden_sizes, activation)
    }
}

fn pick<T: Clone + PartialEq + std::fmt::Debug>(
    name: &str,
    requested: Option<&T>,
    stored: Option<&T>,
) -> Result<T> {
    match (requested, stored) {
        (Some(r), Some(s)) if r != s => Err(Error::shape_mismatch(
            format!("{name} {r:?}"),
            format!("{name} {s:?}"),
        )),
        (Some(v), _) | (None, Some(v)) => Ok(v.clone()),
        (None, None) => Err(Error::invalid_configuration(format!(
            "{name} must be given when no network file provides them"
        ))),
    }
}
