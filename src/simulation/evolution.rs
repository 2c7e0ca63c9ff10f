//! Generation loop, selection and mutation.
//!
//! The [`GenerationManager`] owns the population. It ticks every live car,
//! ends the generation when all cars are dead, the tick cap is hit or a
//! trigger asks for it, then ranks the cars and breeds the next generation:
//! the top `select_count` genomes carry over unchanged and the remaining
//! slots are mutated copies of them.

use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::brain::Brain;
use super::car::{Car, SensorArray};
use super::genome::{self, Genome};
use super::history::{EndReason, GenerationHistory, GenerationSummary};
use super::params::{MutationReference, Params, TopologyConfig};
use super::persistence::NetworkFile;
use super::track::Track;
use crate::error::{Error, Result};

/// Result of one [`GenerationManager::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The generation continues.
    Running,
    /// The generation ended and the next one has been seeded.
    Finished(GenerationSummary),
}

/// Read-only view of a car for renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSnapshot {
    /// Slot in the population.
    pub id: usize,
    /// Identity color.
    pub color: [u8; 3],
    /// Position.
    pub pos: [f32; 2],
    /// Heading in radians.
    pub heading: f32,
    /// Signed speed.
    pub speed: f32,
    /// Fitness so far.
    pub fitness: f32,
    /// Whether the car is still driving.
    pub alive: bool,
    /// Sensor rays as (absolute angle, length).
    pub sensor_rays: Vec<(f32, f32)>,
}

/// Owns the population and runs the evolutionary search.
#[derive(Debug)]
pub struct GenerationManager {
    params: Params,
    topology: TopologyConfig,
    track: Track,
    sensor_array: SensorArray,
    cars: Vec<Car>,
    generation: u32,
    tick: u32,
    rng: ChaCha8Rng,
    best: Option<(Genome, f32)>,
    history: GenerationHistory,
    network_path: Option<PathBuf>,
    next_generation_requested: bool,
    save_requested: bool,
}

impl GenerationManager {
    /// Creates generation 0.
    ///
    /// Without `seeds` every car gets a random network. With `k` seed genomes
    /// car `i` starts from seed `i % k`; cars past the first `k` get their
    /// copy perturbed by `init_mutate_noise`.
    pub fn new(
        params: Params,
        topology: TopologyConfig,
        track: Track,
        seeds: Vec<Genome>,
    ) -> Result<Self> {
        params.validate()?;
        topology.validate()?;

        let sensor_array = SensorArray::new(topology.sensor_angles(), params.car.sensor_range);
        if sensor_array.len() != topology.input_size() {
            return Err(Error::shape_mismatch(
                format!("{} network inputs", topology.input_size()),
                format!("{} sensors", sensor_array.len()),
            ));
        }
        let expected = topology.parameter_count();
        if let Some(bad) = seeds.iter().find(|g| g.len() != expected) {
            return Err(Error::shape_mismatch(
                format!("{expected} parameters"),
                format!("{} parameters", bad.len()),
            ));
        }

        let seed = params.seed.unwrap_or_else(|| rand::rng().random());
        info!(
            seed,
            ai_count = params.ai_count,
            select_count = params.select_count,
            topology = %topology.describe(),
            seeded_from_file = !seeds.is_empty(),
            "starting training"
        );
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut cars = Vec::with_capacity(params.ai_count);
        for i in 0..params.ai_count {
            let brain = if seeds.is_empty() {
                Brain::new_random(&topology, &mut rng)
            } else {
                let mut genome = seeds[i % seeds.len()].clone();
                if i >= seeds.len() {
                    genome.perturb(params.init_mutate_noise, &mut rng)?;
                }
                Brain::decode(&topology, &genome)?
            };
            cars.push(Car::new(
                i,
                palette(i),
                brain,
                sensor_array.clone(),
                &track,
                &params.car,
            ));
        }

        Ok(Self {
            history: GenerationHistory::new(params.history_size),
            params,
            topology,
            track,
            sensor_array,
            cars,
            generation: 0,
            tick: 0,
            rng,
            best: None,
            network_path: None,
            next_generation_requested: false,
            save_requested: false,
        })
    }

    /// Sets the file that saves are written to.
    #[must_use]
    pub fn with_network_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.network_path = Some(path.into());
        self
    }

    /// Ends the current generation at the start of the next tick.
    pub fn request_next_generation(&mut self) {
        self.next_generation_requested = true;
    }

    /// Saves the current best genomes at the start of the next tick.
    pub fn request_save(&mut self) {
        self.save_requested = true;
    }

    /// Advances every live car by `dt` seconds of simulation time.
    ///
    /// Pending triggers are handled first. When the generation ends the next
    /// one is bred and seeded before returning.
    pub fn tick(&mut self, dt: f32) -> Result<TickOutcome> {
        if self.save_requested {
            self.save_requested = false;
            self.save()?;
        }
        if self.next_generation_requested {
            self.next_generation_requested = false;
            return self.end_generation(EndReason::Manual).map(TickOutcome::Finished);
        }

        for car in self.cars.iter_mut().filter(|c| c.is_alive()) {
            car.update(&self.track, &self.params.car, dt);
            if let Some(cause) = car.death() {
                debug!(car = car.id, ?cause, fitness = car.fitness(), tick = self.tick, "car died");
            }
        }
        self.tick += 1;

        if self.cars.iter().all(|c| !c.is_alive()) {
            self.end_generation(EndReason::AllDead).map(TickOutcome::Finished)
        } else if self.params.max_ticks.is_some_and(|cap| self.tick >= cap) {
            self.end_generation(EndReason::TickCap).map(TickOutcome::Finished)
        } else {
            Ok(TickOutcome::Running)
        }
    }

    /// Ticks until the current generation ends.
    ///
    /// Without a tick cap this only returns once every car has died.
    pub fn run_generation(&mut self, dt: f32) -> Result<GenerationSummary> {
        loop {
            if let TickOutcome::Finished(summary) = self.tick(dt)? {
                return Ok(summary);
            }
        }
    }

    /// Car indices ordered by descending fitness, ties by index.
    pub fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.cars.len()).collect();
        order.sort_by(|&a, &b| self.cars[b].fitness().total_cmp(&self.cars[a].fitness()));
        order
    }

    /// Genomes of the current cars in ranking order.
    pub fn ranked_genomes(&self) -> Vec<Genome> {
        self.ranking()
            .into_iter()
            .map(|i| self.cars[i].brain().encode())
            .collect()
    }

    /// Writes the top `save_quota` distinct genomes of the current ranking to
    /// the network file. A zero quota saves the whole population.
    pub fn save(&self) -> Result<()> {
        self.write_network_file(self.ranked_genomes())
    }

    fn write_network_file(&self, ranked: Vec<Genome>) -> Result<()> {
        let Some(path) = &self.network_path else {
            warn!("save requested but no network file is configured");
            return Ok(());
        };
        let quota = if self.params.save_quota == 0 {
            self.params.ai_count
        } else {
            self.params.save_quota
        };
        let genomes = genome::distinct(ranked, quota);
        NetworkFile::new(self.topology.clone(), self.generation, genomes).save_to_file(path)
    }

    /// Read-only view of every car.
    pub fn snapshot(&self) -> Vec<CarSnapshot> {
        self.cars
            .iter()
            .map(|car| CarSnapshot {
                id: car.id,
                color: car.color,
                pos: [car.pos.x, car.pos.y],
                heading: car.heading,
                speed: car.speed,
                fitness: car.fitness(),
                alive: car.is_alive(),
                sensor_rays: car.sensor_rays(),
            })
            .collect()
    }

    fn end_generation(&mut self, reason: EndReason) -> Result<GenerationSummary> {
        let survivors = self.cars.iter().filter(|c| c.is_alive()).count();
        if let Some(cause) = reason.death_cause() {
            for car in &mut self.cars {
                car.kill(cause);
            }
        }

        let ranking = self.ranking();
        let genomes: Vec<Genome> = ranking.iter().map(|&i| self.cars[i].brain().encode()).collect();
        let colors: Vec<[u8; 3]> = ranking.iter().map(|&i| self.cars[i].color).collect();

        let best_fitness = self.cars[ranking[0]].fitness();
        let mean_fitness =
            self.cars.iter().map(Car::fitness).sum::<f32>() / self.cars.len() as f32;
        let diversity = genomes.iter().map(|g| g.distance(&genomes[0])).sum::<f32>()
            / genomes.len() as f32;

        if self.best.as_ref().is_none_or(|(_, f)| best_fitness > *f) {
            self.best = Some((genomes[0].clone(), best_fitness));
        }

        let summary = GenerationSummary {
            generation: self.generation,
            ticks: self.tick,
            best_fitness,
            mean_fitness,
            survivors,
            diversity,
            reason,
        };
        info!(
            generation = summary.generation,
            ticks = summary.ticks,
            best = summary.best_fitness,
            mean = summary.mean_fitness,
            survivors,
            diversity,
            ?reason,
            "generation finished"
        );
        self.history.record(summary.clone());

        self.cars = self.reproduce(&genomes, &colors)?;
        if self.params.save_quota > 0 {
            self.write_network_file(genomes)?;
        }
        self.generation += 1;
        self.tick = 0;

        Ok(summary)
    }

    /// Breeds a full population from genomes sorted best first.
    ///
    /// Slots below `select_count` are the elites, copied verbatim. Slot `i`
    /// above that clones elite `i % select_count` and mutates it as
    /// `child = parent + learn_rate * (parent - reference) + N(0, noise)`.
    fn reproduce(&mut self, ranked: &[Genome], colors: &[[u8; 3]]) -> Result<Vec<Car>> {
        let select = self.params.select_count.min(ranked.len());
        let reference = match self.params.mutation_reference {
            MutationReference::PopulationMean => Genome::mean(ranked),
            MutationReference::Best => ranked.first().cloned(),
        }
        .ok_or_else(|| Error::invalid_configuration("cannot breed from an empty population"))?;

        let mut cars = Vec::with_capacity(self.params.ai_count);
        for slot in 0..self.params.ai_count {
            let parent = slot % select;
            let mut child = ranked[parent].clone();
            if slot >= select {
                child.push_away_from(&reference, self.params.mutate_learn_rate);
                child.perturb(self.params.mutate_noise, &mut self.rng)?;
            }
            let brain = Brain::decode(&self.topology, &child)?;
            cars.push(Car::new(
                slot,
                colors[parent],
                brain,
                self.sensor_array.clone(),
                &self.track,
                &self.params.car,
            ));
        }
        Ok(cars)
    }

    /// Cars of the current generation.
    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    /// Current generation index, starting at 0.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Ticks run in the current generation.
    pub fn tick_count(&self) -> u32 {
        self.tick
    }

    /// Best genome seen so far and its fitness.
    pub fn best(&self) -> Option<(&Genome, f32)> {
        self.best.as_ref().map(|(g, f)| (g, *f))
    }

    /// Summaries of finished generations.
    pub fn history(&self) -> &GenerationHistory {
        &self.history
    }

    /// Network shape shared by every car.
    pub fn topology(&self) -> &TopologyConfig {
        &self.topology
    }

    /// Network file that saves go to.
    pub fn network_path(&self) -> Option<&Path> {
        self.network_path.as_deref()
    }
}

/// Distinct color per initial slot, spread around the hue circle.
fn palette(index: usize) -> [u8; 3] {
    let hue = (index as f32 * 137.508) % 360.0;
    let sector = hue / 60.0;
    let x = 1.0 - (sector % 2.0 - 1.0).abs();
    let (r, g, b) = match sector as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    let to_byte = |v: f32| (v * 200.0 + 40.0) as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}
