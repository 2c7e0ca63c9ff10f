//! Frame pacing for real-time runs.
//!
//! One frame runs `frame_skip + 1` simulation ticks. With fps limiting on,
//! the pacer then sleeps until the frame's time slot is over. Simulation
//! ticks never look at the clock; only [`FramePacer::wait`] does.

use std::time::{Duration, Instant};

use super::evolution::{GenerationManager, TickOutcome};
use super::history::GenerationSummary;
use super::params::Params;
use crate::error::Result;

/// Frame rate held when fps limiting is on.
pub const TARGET_FPS: u32 = 60;

/// Splits wall-clock frames into simulation ticks.
#[derive(Debug, Clone)]
pub struct FramePacer {
    ticks_per_frame: u32,
    frame_duration: Option<Duration>,
    frame_start: Instant,
}

impl FramePacer {
    /// Creates a pacer.
    pub fn new(frame_skip: u32, limit_fps: bool) -> Self {
        Self {
            ticks_per_frame: frame_skip.saturating_add(1),
            frame_duration: limit_fps.then(|| Duration::from_secs(1) / TARGET_FPS),
            frame_start: Instant::now(),
        }
    }

    /// Creates a pacer from session parameters.
    pub fn from_params(params: &Params) -> Self {
        Self::new(params.frame_skip, params.limit_fps)
    }

    /// Simulation ticks per frame.
    pub fn ticks_per_frame(&self) -> u32 {
        self.ticks_per_frame
    }

    /// Runs one frame's worth of ticks and returns the generations that
    /// finished during it.
    pub fn advance(&self, manager: &mut GenerationManager, dt: f32) -> Result<Vec<GenerationSummary>> {
        let mut finished = Vec::new();
        for _ in 0..self.ticks_per_frame {
            if let TickOutcome::Finished(summary) = manager.tick(dt)? {
                finished.push(summary);
            }
        }
        Ok(finished)
    }

    /// Sleeps out the rest of the frame when fps limiting is on, then starts
    /// the next frame.
    pub fn wait(&mut self) {
        if let Some(frame) = self.frame_duration {
            let elapsed = self.frame_start.elapsed();
            if elapsed < frame {
                std::thread::sleep(frame - elapsed);
            }
        }
        self.frame_start = Instant::now();
    }
}
