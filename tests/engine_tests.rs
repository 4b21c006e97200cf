use pathvector_sim::shared::{ConvergenceOutcome, SimError, TieBreak, UpdateMode, DEFAULT_MAX_ROUNDS};
use pathvector_sim::simulation_engine::{
    ConvergenceEngine, ConvergenceState, ExportPolicy, Lrand48, PolicyGenerator, PolicyInput, PolicyStore,
    StdRandomSource,
};

/// Build a policy from an ordering and the `(next_hop, export_to)` pairs it exports.
fn policy(as_number: usize, ordering: Vec<usize>, exports: &[(usize, usize)]) -> PolicyInput {
    let n = ordering.len();
    let mut policy = PolicyInput::from_parts(as_number, ordering, ExportPolicy::new(n).unwrap()).unwrap();
    for &(next_hop, export_to) in exports {
        policy = policy.with_export(next_hop, export_to, true);
    }
    policy
}

/// AS0 is the destination and only exports to AS1. AS1 passes its route via
/// AS0 on to AS2, which prefers AS1 over AS0.
fn create_chain_policies() -> PolicyStore {
    PolicyStore::new(vec![
        policy(0, vec![0, 1, 2], &[(0, 1)]),
        policy(1, vec![0, 1, 2], &[(0, 2)]),
        policy(2, vec![1, 0, 2], &[]),
    ])
    .unwrap()
}

/// AS1 and AS2 each prefer routing through the other, but only export a
/// route learned directly from the destination. They flip forever.
fn create_oscillating_policies() -> PolicyStore {
    PolicyStore::new(vec![
        policy(0, vec![0, 1, 2], &[(0, 1), (0, 2)]),
        policy(1, vec![1, 0, 2], &[(0, 2)]),
        policy(2, vec![2, 0, 1], &[(0, 1)]),
    ])
    .unwrap()
}

fn random_policies(n: usize, seed: i64) -> PolicyStore {
    PolicyGenerator::new(Lrand48::new(seed)).generate_all(n).unwrap()
}

#[test]
fn test_chain_converges_in_three_rounds() {
    let policies = create_chain_policies();
    let engine = ConvergenceEngine::new();
    let mut state = ConvergenceState::new(0, 3).unwrap();

    let first = engine.run_round(&mut state, &policies).unwrap();
    assert_eq!(first.round, 1);
    assert_eq!(state.hop(1), Some(0));
    assert_eq!(state.hop(2), None);
    assert!(state.is_available(1));
    assert!(!state.is_available(2));

    let second = engine.run_round(&mut state, &policies).unwrap();
    assert_eq!(state.hop(2), Some(1));
    assert_eq!(second.changes, 1);

    let third = engine.run_round(&mut state, &policies).unwrap();
    assert_eq!(third.changes, 0);

    let result = engine.compute_next_hop(0, &policies).unwrap();
    assert_eq!(result.rounds, 3);
    assert_eq!(result.outcome, ConvergenceOutcome::Converged);
    assert_eq!(result.next_hops.as_slice(), &[Some(0), Some(0), Some(1)]);
    assert_eq!(result.available, 3);
}

#[test]
fn test_in_place_updates_are_seen_within_the_round() {
    let policies = create_chain_policies();
    let engine = ConvergenceEngine::new().with_update_mode(UpdateMode::InPlace);

    // AS2 already sees AS1's new route in round 1.
    let result = engine.compute_next_hop(0, &policies).unwrap();
    assert_eq!(result.rounds, 2);
    assert!(result.converged());
    assert_eq!(result.next_hops.as_slice(), &[Some(0), Some(0), Some(1)]);
}

#[test]
fn test_nothing_exported_converges_immediately() {
    // Only the rows for "routing via the destination" of the non-destination
    // ASes export, and the destination itself exports nothing, so no AS can
    // ever become available.
    let n = 5;
    let everyone: Vec<(usize, usize)> = (0..n).map(|d| (0, d)).collect();
    let mut policies = vec![policy(0, (0..n).collect(), &[])];
    for asn in 1..n {
        policies.push(policy(asn, (0..n).rev().collect(), &everyone));
    }
    let policies = PolicyStore::new(policies).unwrap();

    let result = ConvergenceEngine::new().compute_next_hop(0, &policies).unwrap();
    assert_eq!(result.rounds, 1);
    assert!(result.converged());
    assert_eq!(result.available, 1);
    assert_eq!(result.next_hops.get(0), Some(0));
    for asn in 1..n {
        assert_eq!(result.next_hops.get(asn), None);
    }
    assert_eq!(result.next_hops.to_dense(), vec![0; n]);
}

#[test]
fn test_oscillation_hits_round_cap() {
    let policies = create_oscillating_policies();

    let result = ConvergenceEngine::new().compute_next_hop(0, &policies).unwrap();
    assert_eq!(result.rounds, DEFAULT_MAX_ROUNDS);
    assert_eq!(result.outcome, ConvergenceOutcome::IterationCapReached);
    assert_eq!(result.round_stats.len(), DEFAULT_MAX_ROUNDS as usize);
    assert!(result.round_stats.iter().all(|stats| stats.changes > 0));
    // Odd rounds route via the destination, even rounds via each other.
    assert_eq!(result.next_hops.as_slice(), &[Some(0), Some(2), Some(1)]);

    let capped = ConvergenceEngine::new()
        .with_max_rounds(7)
        .compute_next_hop(0, &policies)
        .unwrap();
    assert_eq!(capped.rounds, 7);
    assert_eq!(capped.outcome, ConvergenceOutcome::IterationCapReached);
    assert_eq!(capped.next_hops.as_slice(), &[Some(0), Some(0), Some(0)]);
}

#[test]
fn test_first_eligible_breaks_the_oscillation() {
    let policies = create_oscillating_policies();
    let engine = ConvergenceEngine::new().with_tie_break(TieBreak::FirstEligible);

    let result = engine.compute_next_hop(0, &policies).unwrap();
    assert_eq!(result.rounds, 2);
    assert!(result.converged());
    assert_eq!(result.next_hops.as_slice(), &[Some(0), Some(0), Some(0)]);
}

#[test]
fn test_last_eligible_candidate_wins() {
    // AS2 prefers AS1 but AS0, later in its ordering, is also eligible.
    let policies = PolicyStore::new(vec![
        policy(0, vec![0, 1, 2], &[(0, 1), (0, 2)]),
        policy(1, vec![0, 1, 2], &[(0, 2)]),
        policy(2, vec![1, 0, 2], &[]),
    ])
    .unwrap();

    let last = ConvergenceEngine::new().compute_next_hop(0, &policies).unwrap();
    assert_eq!(last.next_hops.get(2), Some(0));

    let first = ConvergenceEngine::new()
        .with_tie_break(TieBreak::FirstEligible)
        .compute_next_hop(0, &policies)
        .unwrap();
    assert_eq!(first.next_hops.get(2), Some(1));
}

#[test]
fn test_destination_always_routes_to_itself() {
    for seed in 0..5 {
        let policies = random_policies(30, seed);
        let destination = (seed as usize * 7) % 30;
        let engine = ConvergenceEngine::new();
        let mut state = ConvergenceState::new(destination, 30).unwrap();
        assert_eq!(state.hop(destination), Some(destination));

        loop {
            let stats = engine.run_round(&mut state, &policies).unwrap();
            assert_eq!(state.hop(destination), Some(destination));
            assert!(state.is_available(destination));
            if stats.changes == 0 || stats.round >= DEFAULT_MAX_ROUNDS {
                break;
            }
        }

        let result = engine.compute_next_hop(destination, &policies).unwrap();
        assert_eq!(result.next_hops.get(destination), Some(destination));
    }
}

#[test]
fn test_round_count_never_exceeds_cap() {
    for seed in 0..10 {
        let policies = random_policies(25, seed);
        let result = ConvergenceEngine::new().compute_next_hop(3, &policies).unwrap();
        assert!(result.rounds >= 1);
        assert!(result.rounds <= DEFAULT_MAX_ROUNDS);
        assert_eq!(result.round_stats.len(), result.rounds as usize);
        assert_eq!(result.converged(), result.round_stats.last().unwrap().changes == 0);
    }
}

#[test]
fn test_fixpoint_is_stable() {
    let mut checked = 0;
    for seed in 0..20 {
        let policies = random_policies(20, seed);
        for mode in [UpdateMode::Synchronous, UpdateMode::InPlace] {
            let engine = ConvergenceEngine::new().with_update_mode(mode);
            let mut state = ConvergenceState::new(0, 20).unwrap();
            let mut converged = false;
            while state.rounds() < DEFAULT_MAX_ROUNDS {
                if engine.run_round(&mut state, &policies).unwrap().changes == 0 {
                    converged = true;
                    break;
                }
            }
            if !converged {
                continue;
            }

            let hops = state.hops().to_vec();
            let available: Vec<bool> = (0..20).map(|asn| state.is_available(asn)).collect();
            assert_eq!(engine.run_round(&mut state, &policies).unwrap().changes, 0);
            assert_eq!(state.hops(), hops.as_slice());
            assert_eq!((0..20).map(|asn| state.is_available(asn)).collect::<Vec<_>>(), available);
            checked += 1;
        }
    }
    assert!(checked > 0);
}

#[test]
fn test_deterministic_for_fixed_seed() {
    let first = ConvergenceEngine::new()
        .compute_next_hop(12, &random_policies(40, 42))
        .unwrap();
    let second = ConvergenceEngine::new()
        .compute_next_hop(12, &random_policies(40, 42))
        .unwrap();

    assert_eq!(first.next_hops, second.next_hops);
    assert_eq!(first.rounds, second.rounds);
    assert_eq!(first.outcome, second.outcome);
}

#[test]
fn test_parallel_matches_sequential() {
    for seed in 1..5 {
        let policies = PolicyGenerator::new(StdRandomSource::seeded(seed))
            .generate_all(60)
            .unwrap();
        let sequential = ConvergenceEngine::new().compute_next_hop(5, &policies).unwrap();
        let parallel = ConvergenceEngine::new()
            .with_threads(4)
            .unwrap()
            .compute_next_hop(5, &policies)
            .unwrap();

        assert_eq!(sequential.next_hops, parallel.next_hops);
        assert_eq!(sequential.rounds, parallel.rounds);
        assert_eq!(sequential.outcome, parallel.outcome);
    }
}

#[test]
fn test_single_participant() {
    let policies = PolicyStore::new(vec![policy(0, vec![0], &[])]).unwrap();
    let result = ConvergenceEngine::new().compute_next_hop(0, &policies).unwrap();
    assert_eq!(result.rounds, 1);
    assert!(result.converged());
    assert_eq!(result.next_hops.as_slice(), &[Some(0)]);
}

#[test]
fn test_invalid_inputs_are_rejected() {
    let policies = create_chain_policies();

    let out_of_range = ConvergenceEngine::new().compute_next_hop(3, &policies);
    assert!(matches!(
        out_of_range,
        Err(SimError::DestinationOutOfRange { destination: 3, num_participants: 3 })
    ));

    let no_rounds = ConvergenceEngine::new().with_max_rounds(0).compute_next_hop(0, &policies);
    assert!(matches!(no_rounds, Err(SimError::MaxRoundsZero)));

    assert!(matches!(ConvergenceState::new(0, 0), Err(SimError::NoParticipants)));
}

#[test]
fn test_round_rejects_state_of_other_size() {
    let policies = create_chain_policies();
    let engine = ConvergenceEngine::new();
    let mut state = ConvergenceState::new(0, 5).unwrap();

    let round = engine.run_round(&mut state, &policies);
    assert!(matches!(round, Err(SimError::StateMismatch { state: 5, policies: 3 })));
    assert_eq!(state.rounds(), 0);
    assert_eq!(state.hops(), &[Some(0), None, None, None, None]);

    // Lookups outside the state report no route instead of panicking.
    assert_eq!(state.hop(9), None);
    assert!(!state.is_available(9));
}
