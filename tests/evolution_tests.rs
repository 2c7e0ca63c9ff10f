#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use evodrive::simulation::activation::Activation;
use evodrive::simulation::car::DeathCause;
use evodrive::simulation::evolution::{GenerationManager, TickOutcome};
use evodrive::simulation::genome::Genome;
use evodrive::simulation::history::EndReason;
use evodrive::simulation::pacing::FramePacer;
use evodrive::simulation::params::{Params, TopologyConfig};
use evodrive::simulation::persistence::NetworkFile;
use evodrive::simulation::track::Track;
use geo::Coord;
use std::fs;

const DT: f32 = 0.032;

fn c(x: f32, y: f32) -> Coord<f32> {
    Coord { x, y }
}

fn create_square_track() -> Track {
    Track::from_boundaries(
        vec![c(30.0, 30.0), c(70.0, 30.0), c(70.0, 70.0), c(30.0, 70.0)],
        vec![c(0.0, 0.0), c(100.0, 0.0), c(100.0, 100.0), c(0.0, 100.0)],
        vec![c(15.0, 15.0), c(85.0, 15.0), c(85.0, 85.0), c(15.0, 85.0)],
    )
    .unwrap()
}

fn create_test_params() -> Params {
    Params {
        ai_count: 10,
        select_count: 3,
        max_ticks: Some(40),
        seed: Some(42),
        ..Params::default()
    }
}

fn create_test_topology() -> TopologyConfig {
    TopologyConfig::new(vec![-60.0, -30.0, 0.0, 30.0, 60.0], vec![6], Activation::LeakyRelu).unwrap()
}

fn create_manager(params: Params) -> GenerationManager {
    GenerationManager::new(params, create_test_topology(), create_square_track(), Vec::new()).unwrap()
}

fn genomes(manager: &GenerationManager) -> Vec<Genome> {
    manager.cars().iter().map(|car| car.brain().encode()).collect()
}

#[test]
fn test_population_size_constant() {
    let mut manager = create_manager(create_test_params());
    assert_eq!(manager.cars().len(), 10);
    for _ in 0..3 {
        manager.run_generation(DT).unwrap();
        assert_eq!(manager.cars().len(), 10);
        assert!(manager.cars().iter().all(|car| car.is_alive()));
    }
    assert_eq!(manager.generation(), 3);
    assert_eq!(manager.history().summaries().len(), 3);
}

#[test]
fn test_generation_ends_at_tick_cap() {
    let params = Params {
        max_ticks: Some(5),
        ..create_test_params()
    };
    let mut manager = create_manager(params);

    let mut ticks = 0;
    let summary = loop {
        ticks += 1;
        if let TickOutcome::Finished(summary) = manager.tick(DT).unwrap() {
            break summary;
        }
        assert!(ticks < 5);
    };
    assert!(summary.ticks <= 5);
    assert!(matches!(summary.reason, EndReason::TickCap | EndReason::AllDead));
    assert_eq!(summary.generation, 0);
    assert_eq!(manager.generation(), 1);
    assert_eq!(manager.tick_count(), 0);
}

#[test]
fn test_elites_carried_over_unchanged() {
    let mut manager = create_manager(create_test_params());
    for _ in 0..10 {
        manager.tick(DT).unwrap();
    }

    let ranked = manager.ranked_genomes();
    manager.request_next_generation();
    let outcome = manager.tick(DT).unwrap();
    assert!(matches!(outcome, TickOutcome::Finished(ref s) if s.reason == EndReason::Manual));

    let next = genomes(&manager);
    assert_eq!(next[..3], ranked[..3]);
    // the rest are mutated copies
    for child in &next[3..] {
        assert!(!ranked[..3].contains(child));
    }
}

#[test]
fn test_pure_elitism() {
    let params = Params {
        mutate_noise: 0.0,
        mutate_learn_rate: 0.0,
        ..create_test_params()
    };
    let mut manager = create_manager(params);

    let initial = genomes(&manager);
    manager.run_generation(DT).unwrap();
    let first = genomes(&manager);
    for (i, genome) in first.iter().enumerate() {
        assert!(initial.contains(genome));
        assert_eq!(genome, &first[i % 3]);
    }

    manager.run_generation(DT).unwrap();
    let second = genomes(&manager);
    for genome in &second {
        assert!(first[..3].contains(genome));
    }
}

#[test]
fn test_children_inherit_color() {
    let params = Params {
        mutate_noise: 0.0,
        mutate_learn_rate: 0.0,
        ..create_test_params()
    };
    let mut manager = create_manager(params);
    manager.run_generation(DT).unwrap();
    let cars = manager.cars();
    for car in cars {
        assert_eq!(car.color, cars[car.id % 3].color);
    }
}

#[test]
fn test_seeded_runs_reproducible() {
    let mut a = create_manager(create_test_params());
    let mut b = create_manager(create_test_params());
    for _ in 0..3 {
        let sa = a.run_generation(DT).unwrap();
        let sb = b.run_generation(DT).unwrap();
        assert_eq!(sa, sb);
    }
    assert_eq!(genomes(&a), genomes(&b));
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn test_different_seeds_differ() {
    let a = create_manager(create_test_params());
    let b = create_manager(Params {
        seed: Some(43),
        ..create_test_params()
    });
    assert_ne!(genomes(&a), genomes(&b));
}

#[test]
fn test_ranking_ties_keep_index_order() {
    let manager = create_manager(create_test_params());
    // nobody has moved yet, so every fitness is zero
    assert_eq!(manager.ranking(), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_ranking_descending() {
    let mut manager = create_manager(create_test_params());
    for _ in 0..30 {
        manager.tick(DT).unwrap();
    }
    let ranking = manager.ranking();
    let cars = manager.cars();
    for pair in ranking.windows(2) {
        assert!(cars[pair[0]].fitness() >= cars[pair[1]].fitness());
    }
}

#[test]
fn test_best_tracked_across_generations() {
    let mut manager = create_manager(create_test_params());
    assert!(manager.best().is_none());
    let mut best_seen = f32::NEG_INFINITY;
    for _ in 0..3 {
        let summary = manager.run_generation(DT).unwrap();
        best_seen = best_seen.max(summary.best_fitness);
        assert!(summary.best_fitness >= summary.mean_fitness);
    }
    let (_, best) = manager.best().unwrap();
    assert_eq!(best, best_seen);
}

#[test]
fn test_seeds_fill_population() {
    let topology = create_test_topology();
    let count = topology.parameter_count();
    let seeds = vec![Genome::new(vec![0.1; count]), Genome::new(vec![-0.1; count])];

    let params = Params {
        init_mutate_noise: 0.0,
        ..create_test_params()
    };
    let manager =
        GenerationManager::new(params, topology.clone(), create_square_track(), seeds.clone()).unwrap();
    for (i, genome) in genomes(&manager).iter().enumerate() {
        assert_eq!(genome, &seeds[i % 2]);
    }

    let params = Params {
        init_mutate_noise: 0.05,
        ..create_test_params()
    };
    let manager = GenerationManager::new(params, topology, create_square_track(), seeds.clone()).unwrap();
    let population = genomes(&manager);
    assert_eq!(population[..2], seeds[..]);
    for genome in &population[2..] {
        assert!(!seeds.contains(genome));
    }
}

#[test]
fn test_seeds_with_wrong_shape_rejected() {
    let seeds = vec![Genome::zeros(3)];
    let err = GenerationManager::new(create_test_params(), create_test_topology(), create_square_track(), seeds)
        .unwrap_err();
    assert!(err.is_shape_mismatch());
}

#[test]
fn test_invalid_select_count_rejected() {
    for select_count in [0, 11] {
        let params = Params {
            select_count,
            ..create_test_params()
        };
        assert!(
            GenerationManager::new(params, create_test_topology(), create_square_track(), Vec::new()).is_err()
        );
    }
}

#[test]
fn test_manual_save() {
    let path = std::env::temp_dir().join("evodrive_test_manual_save.json");
    fs::remove_file(&path).ok();

    let mut manager = create_manager(create_test_params()).with_network_file(&path);
    manager.request_save();
    manager.tick(DT).unwrap();

    let file = NetworkFile::load_from_file(&path).unwrap();
    assert_eq!(&file.topology, manager.topology());
    assert_eq!(file.generation, 0);
    // save quota 0 writes the whole (distinct) population
    assert_eq!(file.genomes.len(), 10);

    fs::remove_file(&path).ok();
}

#[test]
fn test_save_at_generation_end() {
    let path = std::env::temp_dir().join("evodrive_test_generation_save.json");
    fs::remove_file(&path).ok();

    let params = Params {
        save_quota: 3,
        ..create_test_params()
    };
    let mut manager = create_manager(params).with_network_file(&path);
    let summary = manager.run_generation(DT).unwrap();

    let file = NetworkFile::load_from_file(&path).unwrap();
    assert_eq!(summary.generation, 0);
    assert_eq!(file.generation, summary.generation);
    assert_eq!(file.genomes.len(), 3);
    // the best three of the finished generation are the new elites
    assert_eq!(file.genomes[..], genomes(&manager)[..3]);

    fs::remove_file(&path).ok();
}

#[test]
fn test_no_save_without_quota() {
    let path = std::env::temp_dir().join("evodrive_test_no_save.json");
    fs::remove_file(&path).ok();

    let mut manager = create_manager(create_test_params()).with_network_file(&path);
    manager.run_generation(DT).unwrap();
    assert!(!path.exists());
}

#[test]
fn test_pacer_runs_frame_skip_ticks() {
    let mut manager = create_manager(create_test_params());
    let mut pacer = FramePacer::new(2, false);
    let finished = pacer.advance(&mut manager, DT).unwrap();
    pacer.wait();
    assert!(finished.is_empty());
    assert_eq!(manager.tick_count(), 3);
}

#[test]
fn test_pacer_reports_finished_generations() {
    let params = Params {
        max_ticks: Some(2),
        ..create_test_params()
    };
    let mut manager = create_manager(params);
    let finished = FramePacer::new(4, false).advance(&mut manager, DT).unwrap();
    assert!(!finished.is_empty());
    assert_eq!(manager.generation() as usize, finished.len());
}

#[test]
fn test_non_finite_car_does_not_stop_the_others() {
    let topology = TopologyConfig::new(vec![-60.0, -30.0, 0.0, 30.0, 60.0], vec![], Activation::LeakyRelu).unwrap();
    let count = topology.parameter_count();
    let mut driver = vec![0.0; count];
    driver[count - 2] = 1.0;
    let seeds = vec![Genome::new(driver), Genome::zeros(count)];

    let params = Params {
        ai_count: 2,
        select_count: 1,
        init_mutate_noise: 0.0,
        ..create_test_params()
    };
    let mut manager = GenerationManager::new(params, topology, create_square_track(), seeds).unwrap();

    // full throttle over a huge step overflows the driver's speed; the idle car stays put
    assert_eq!(manager.tick(f32::MAX).unwrap(), TickOutcome::Running);
    assert_eq!(manager.cars()[0].death(), Some(DeathCause::NonFinite));
    assert!(manager.cars()[1].is_alive());

    for _ in 0..5 {
        assert_eq!(manager.tick(DT).unwrap(), TickOutcome::Running);
    }
    assert!(manager.cars()[1].is_alive());
    assert_eq!(manager.cars()[1].ticks(), 6);
    assert_eq!(manager.tick_count(), 6);
}
