//! Generation history for progress reports.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::car::DeathCause;

/// Why a generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Every car left the track.
    AllDead,
    /// The tick cap was reached.
    TickCap,
    /// A next-generation trigger was received.
    Manual,
}

impl EndReason {
    /// Cause recorded for cars still driving when the generation ends this way.
    pub fn death_cause(self) -> Option<DeathCause> {
        match self {
            EndReason::AllDead => None,
            EndReason::TickCap => Some(DeathCause::Timeout),
            EndReason::Manual => Some(DeathCause::Manual),
        }
    }
}

/// Outcome of one finished generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Generation index, starting at 0.
    pub generation: u32,
    /// Ticks simulated.
    pub ticks: u32,
    /// Fitness of the best car.
    pub best_fitness: f32,
    /// Mean fitness over the population.
    pub mean_fitness: f32,
    /// Cars still alive when the generation ended.
    pub survivors: usize,
    /// Mean genome distance of the population to the best genome.
    pub diversity: f32,
    /// What ended the generation.
    pub reason: EndReason,
}

/// Most recent generation summaries, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationHistory {
    summaries: VecDeque<GenerationSummary>,
    max_entries: usize,
}

impl Default for GenerationHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl GenerationHistory {
    /// Creates an empty history keeping at most `max_entries` summaries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            summaries: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    /// Records a summary, dropping the oldest if full.
    pub fn record(&mut self, summary: GenerationSummary) {
        self.summaries.push_back(summary);

        while self.summaries.len() > self.max_entries {
            self.summaries.pop_front();
        }
    }

    /// All kept summaries, oldest first.
    pub fn summaries(&self) -> &VecDeque<GenerationSummary> {
        &self.summaries
    }

    /// Latest summary.
    pub fn latest(&self) -> Option<&GenerationSummary> {
        self.summaries.back()
    }

    /// Best fitness per kept generation, oldest first.
    pub fn best_fitness_trend(&self) -> Vec<f32> {
        self.summaries.iter().map(|s| s.best_fitness).collect()
    }
}
