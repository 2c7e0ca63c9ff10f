//! Car module containing car state, kinematics and sensing.

mod car;
mod sensors;

pub use car::*;
pub use sensors::SensorArray;
