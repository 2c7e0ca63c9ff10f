//! Distance sensors - let a car see the track boundaries.
//!
//! Sensing uses raycasting against the track rings.

use geo::Coord;
use ndarray::Array1;

use super::super::geometric_utils::heading_vector;
use super::super::track::Track;

/// Fixed fan of distance rays, angles in degrees relative to the heading.
///
/// For each ray the output is the distance to the nearest boundary divided
/// by the sensor range and clamped to `[0, 1]`. A ray that hits nothing reads
/// 1.0, the same as a wall at or beyond full range.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorArray {
    angles: Vec<f32>,
    range: f32,
}

impl SensorArray {
    /// Creates a sensor array.
    pub fn new(angles_deg: &[f32], range: f32) -> Self {
        Self {
            angles: angles_deg.iter().map(|a| a.to_radians()).collect(),
            range,
        }
    }

    /// Number of readings produced per sense.
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    /// Returns `true` if there are no sensors.
    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Casts every ray from `pos` and returns normalized distances.
    pub fn sense(&self, track: &Track, pos: Coord<f32>, heading: f32) -> Array1<f32> {
        self.angles
            .iter()
            .map(|angle| {
                track
                    .nearest_intersection(pos, heading_vector(heading + angle))
                    .map_or(1.0, |d| (d / self.range).clamp(0.0, 1.0))
            })
            .collect()
    }

    /// Absolute ray directions and their unnormalized lengths, for drawing.
    pub fn rays(&self, readings: &Array1<f32>, heading: f32) -> Vec<(f32, f32)> {
        self.angles
            .iter()
            .zip(readings)
            .map(|(angle, reading)| (heading + angle, reading * self.range))
            .collect()
    }
}
