#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use evodrive::simulation::activation::Activation;
use evodrive::simulation::brain::Brain;
use evodrive::simulation::genome::{self, Genome};
use evodrive::simulation::params::TopologyConfig;
use ndarray::{Array1, array};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn create_test_topology(sensors: usize, hidden: Vec<usize>, activation: Activation) -> TopologyConfig {
    let angles = (0..sensors).map(|i| i as f32 * 30.0 - 60.0).collect();
    TopologyConfig::new(angles, hidden, activation).unwrap()
}

fn topology_and_genome() -> impl Strategy<Value = (TopologyConfig, Vec<f32>)> {
    (
        1usize..6,
        prop::collection::vec(1usize..8, 0..3),
        0usize..Activation::ALL.len(),
    )
        .prop_flat_map(|(sensors, hidden, activation)| {
            let topology = create_test_topology(sensors, hidden, Activation::ALL[activation]);
            let count = topology.parameter_count();
            (
                Just(topology),
                prop::collection::vec(-10.0f32..10.0, count),
            )
        })
}

proptest! {
    #[test]
    fn prop_decode_then_encode_is_identity((topology, params) in topology_and_genome()) {
        let genome = Genome::new(params);
        let brain = Brain::decode(&topology, &genome).unwrap();
        prop_assert_eq!(brain.encode(), genome);
        prop_assert_eq!(brain.parameter_count(), topology.parameter_count());
    }

    #[test]
    fn prop_output_has_one_value_per_control((topology, params) in topology_and_genome()) {
        let brain = Brain::decode(&topology, &Genome::new(params)).unwrap();
        let inputs = Array1::from_elem(topology.input_size(), 0.5);
        let outputs = brain.think(&inputs);
        prop_assert_eq!(outputs.len(), 2);
        if topology.activation() == Activation::Softmax {
            prop_assert!((outputs.sum() - 1.0).abs() < 1e-4);
        }
    }
}

#[test]
fn test_genome_layout() {
    // Two inputs straight to two outputs: weights [[1, 2], [3, 4]], biases [5, 6].
    let topology = create_test_topology(2, vec![], Activation::Relu);
    let brain = Brain::decode(&topology, &Genome::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();

    assert_eq!(brain.think(&array![1.0, 1.0]), array![9.0, 12.0]);
    assert_eq!(brain.think(&array![1.0, 0.0]), array![6.0, 8.0]);
    assert_eq!(brain.think(&array![0.0, 1.0]), array![8.0, 10.0]);
}

#[test]
fn test_random_brain_round_trip() {
    let topology = create_test_topology(5, vec![8, 4], Activation::LeakyRelu);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let brain = Brain::new_random(&topology, &mut rng);

    assert_eq!(brain.input_size(), 5);
    assert_eq!(brain.output_size(), 2);
    assert_eq!(brain.parameter_count(), 5 * 8 + 8 + 8 * 4 + 4 + 4 * 2 + 2);

    let decoded = Brain::decode(&topology, &brain.encode()).unwrap();
    assert_eq!(decoded, brain);
    assert_eq!(Brain::distance(&brain, &decoded), 0.0);
}

#[test]
fn test_same_seed_same_brain() {
    let topology = create_test_topology(3, vec![6], Activation::Sigmoid);
    let a = Brain::new_random(&topology, &mut ChaCha8Rng::seed_from_u64(11));
    let b = Brain::new_random(&topology, &mut ChaCha8Rng::seed_from_u64(11));
    let c = Brain::new_random(&topology, &mut ChaCha8Rng::seed_from_u64(12));
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_forward_is_deterministic() {
    let topology = create_test_topology(3, vec![4], Activation::LeakyRelu);
    let brain = Brain::new_random(&topology, &mut ChaCha8Rng::seed_from_u64(3));
    let inputs = array![0.2, 0.9, 0.4];
    assert_eq!(brain.think(&inputs), brain.think(&inputs));
}

#[test]
fn test_zero_brain_outputs_activation_of_zero() {
    let topology = create_test_topology(4, vec![3], Activation::Sigmoid);
    let brain = Brain::zeros(&topology);
    assert_eq!(brain.think(&array![1.0, 0.5, 0.2, 0.0]), array![0.5, 0.5]);
    assert_eq!(brain.encode(), Genome::zeros(topology.parameter_count()));
}

#[test]
fn test_decode_rejects_wrong_length() {
    let topology = create_test_topology(3, vec![4], Activation::Relu);
    let genome = Genome::zeros(topology.parameter_count() + 1);
    let err = Brain::decode(&topology, &genome).unwrap_err();
    assert!(err.is_shape_mismatch());
}

#[test]
fn test_genome_mutation_operators() {
    let mut child = Genome::new(vec![1.0, 2.0, 3.0]);
    let reference = Genome::new(vec![0.0, 2.0, 4.0]);
    child.push_away_from(&reference, 0.5);
    assert_eq!(child, Genome::new(vec![1.5, 2.0, 2.5]));

    let before = child.clone();
    child.push_away_from(&reference, 0.0);
    child.perturb(0.0, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
    assert_eq!(child, before);

    child.perturb(0.1, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
    assert_ne!(child, before);
}

#[test]
fn test_genome_mean_and_distinct() {
    let a = Genome::new(vec![0.0, 2.0]);
    let b = Genome::new(vec![2.0, 4.0]);
    assert_eq!(Genome::mean(&[a.clone(), b.clone()]), Some(Genome::new(vec![1.0, 3.0])));
    assert_eq!(Genome::mean(&[]), None);

    let unique = genome::distinct([a.clone(), a.clone(), b.clone(), a.clone()], 10);
    assert_eq!(unique, vec![a.clone(), b]);
    assert_eq!(genome::distinct([a.clone(), a.clone()], 1), vec![a]);
}
