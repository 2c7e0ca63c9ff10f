//! Car state, kinematics and fitness.
//!
//! Cars read their sensors, run their brain, and move. Leaving the track ends
//! the run for good: the car is marked dead and its fitness is frozen.

use std::f32::consts::TAU;

use geo::Coord;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::super::brain::Brain;
use super::super::geometric_utils::{distance, heading_vector};
use super::super::params::{CarParams, FitnessMetric};
use super::super::track::Track;
use super::sensors::SensorArray;

/// Why a car stopped driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Left the area between the boundaries.
    OffTrack,
    /// Pose became NaN or infinite.
    NonFinite,
    /// Still driving when the generation hit its tick cap.
    Timeout,
    /// Still driving when a next-generation trigger ended the generation.
    Manual,
}

/// Throttle and steering read from the brain output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    /// Forward (positive) or reverse (negative) drive, in `[-1, 1]`.
    pub throttle: f32,
    /// Left (positive) or right (negative) turn, in `[-1, 1]`.
    pub steer: f32,
}

impl Controls {
    /// Clamps the first two brain outputs into controls.
    pub fn from_outputs(outputs: &Array1<f32>) -> Self {
        let read = |i: usize| {
            outputs
                .get(i)
                .copied()
                .filter(|v| v.is_finite())
                .map_or(0.0, |v| v.clamp(-1.0, 1.0))
        };
        Self {
            throttle: read(0),
            steer: read(1),
        }
    }
}

/// A car driven by a neural network.
#[derive(Debug, Clone)]
pub struct Car {
    /// Slot in the population.
    pub id: usize,
    /// Identity color, inherited from parent to child.
    pub color: [u8; 3],
    /// Position on the track.
    pub pos: Coord<f32>,
    /// Heading in radians, counter-clockwise from +x, in `[0, 2π)`.
    pub heading: f32,
    /// Signed speed along the heading.
    pub speed: f32,
    /// Latest normalized sensor readings.
    pub sensors: Array1<f32>,
    /// Latest controls applied.
    pub controls: Controls,
    brain: Brain,
    sensor_array: SensorArray,
    fitness: f32,
    death: Option<DeathCause>,
    ticks: u32,
    next_checkpoint: usize,
}

impl Car {
    /// Creates a car at the track's start pose.
    ///
    /// Checkpoints already within `checkpoint_radius` of the start are
    /// skipped, so they only count once reached again on a later lap.
    pub fn new(
        id: usize,
        color: [u8; 3],
        brain: Brain,
        sensor_array: SensorArray,
        track: &Track,
        params: &CarParams,
    ) -> Self {
        let (pos, heading) = track.start_pose();
        let sensors = Array1::ones(sensor_array.len());
        let mut car = Self {
            id,
            color,
            pos,
            heading: heading.rem_euclid(TAU),
            speed: 0.0,
            sensors,
            controls: Controls {
                throttle: 0.0,
                steer: 0.0,
            },
            brain,
            sensor_array,
            fitness: 0.0,
            death: None,
            ticks: 0,
            next_checkpoint: 1 % track.checkpoints().len(),
        };
        car.skip_checkpoints_in_reach(track, params.checkpoint_radius);
        car
    }

    /// The car's network.
    pub fn brain(&self) -> &Brain {
        &self.brain
    }

    /// Accumulated fitness; frozen once dead.
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    /// Checks if the car is still driving.
    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }

    /// Why the car died, if it did.
    pub fn death(&self) -> Option<DeathCause> {
        self.death
    }

    /// Ticks driven so far.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Absolute sensor ray directions and lengths for the latest readings.
    pub fn sensor_rays(&self) -> Vec<(f32, f32)> {
        self.sensor_array.rays(&self.sensors, self.heading)
    }

    /// Advances the car by one timestep. Does nothing once the car is dead.
    pub fn update(&mut self, track: &Track, params: &CarParams, dt: f32) {
        if !self.is_alive() {
            return;
        }

        self.sensors = self.sensor_array.sense(track, self.pos, self.heading);
        let outputs = self.brain.think(&self.sensors);
        self.controls = Controls::from_outputs(&outputs);

        self.speed += self.controls.throttle * params.acceleration * dt;
        self.speed -= self.speed * (params.drag * dt).min(1.0);
        self.speed = self.speed.clamp(-params.max_speed, params.max_speed);

        self.heading = (self.heading + self.controls.steer * params.turn_rate * dt).rem_euclid(TAU);

        let prev = self.pos;
        self.pos = self.pos + heading_vector(self.heading) * (self.speed * dt);
        self.ticks += 1;

        if !(self.pos.x.is_finite() && self.pos.y.is_finite() && self.heading.is_finite()) {
            self.kill(DeathCause::NonFinite);
            return;
        }
        if !track.is_inside(self.pos) {
            self.kill(DeathCause::OffTrack);
            return;
        }

        match params.fitness_metric {
            FitnessMetric::Distance => self.fitness += distance(prev, self.pos),
            FitnessMetric::Progress => self.advance_checkpoints(track, params.checkpoint_radius),
        }
    }

    fn skip_checkpoints_in_reach(&mut self, track: &Track, radius: f32) {
        let checkpoints = track.checkpoints();
        for _ in 1..checkpoints.len() {
            if distance(self.pos, checkpoints[self.next_checkpoint]) >= radius {
                break;
            }
            self.next_checkpoint = (self.next_checkpoint + 1) % checkpoints.len();
        }
    }

    /// Counts every checkpoint reached in order. Wraps around for laps.
    fn advance_checkpoints(&mut self, track: &Track, radius: f32) {
        let checkpoints = track.checkpoints();
        for _ in 0..checkpoints.len() {
            if distance(self.pos, checkpoints[self.next_checkpoint]) >= radius {
                break;
            }
            self.fitness += 1.0;
            self.next_checkpoint = (self.next_checkpoint + 1) % checkpoints.len();
        }
    }

    /// Ends the run. The first cause is kept.
    pub fn kill(&mut self, cause: DeathCause) {
        if self.death.is_none() {
            self.death = Some(cause);
        }
    }
}
