//! Integration tests for the election engine.
//!
//! Tests:
//! 1. Whole-pipeline runs over generated electorates
//! 2. Windowing through multi-round presets
//! 3. Constrained populations feeding tabulation
//! 4. Flip analysis end to end

use std::collections::BTreeSet;

use electionlab_core::population::VoterPredicate;
use electionlab_core::steps::{BordaCount, KeepBestN, PluralityFirstChoice};
use electionlab_core::{
    CandidateId, CandidateRanking, ElectionEngine, ElectionError, PipelinePreset,
    PopulationConstraint, StepError, StepFn, Voter,
};

fn voter(order: &[CandidateId]) -> Voter {
    Voter::from_preference_order(order).unwrap()
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── 1. Whole-pipeline runs ───────────────────────────────────────────

#[test]
fn default_sized_plurality_election_completes() {
    init_logging();
    let mut engine = ElectionEngine::default().with_candidates(20);
    engine.add_step(PluralityFirstChoice);
    let result = engine.run_single_election().unwrap();
    assert_eq!(result.iter().map(|r| r.ranking).sum::<i64>(), 400);
    assert!(result.windows(2).all(|w| w[0].ranking >= w[1].ranking));
}

#[test]
fn same_seed_same_result_different_seed_usually_differs() {
    let build = |seed| {
        let mut e = ElectionEngine::new(30, 101).with_seed(seed);
        e.add_step(BordaCount);
        e
    };
    let a = build(5).run_single_election().unwrap();
    let b = build(5).run_single_election().unwrap();
    assert_eq!(a, b);
    let c = build(6).run_single_election().unwrap();
    assert_ne!(a, c);
}

#[test]
fn filter_first_is_a_sequencing_error() {
    let mut engine = ElectionEngine::new(3, 10);
    engine.add_step(KeepBestN::new(1).unwrap());
    assert_eq!(
        engine.run_single_election(),
        Err(ElectionError::Step(StepError::Sequencing(
            "keep_best_n".to_string()
        )))
    );
}

// ── 2. Windowing ─────────────────────────────────────────────────────

#[test]
fn second_round_sees_only_survivors() {
    init_logging();
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorded = seen.clone();

    let mut engine = ElectionEngine::new(6, 30);
    engine
        .add_step(BordaCount)
        .add_step(KeepBestN::new(3).unwrap())
        .add_step(StepFn::new("recorder", move |voters, prior| {
            let universe: BTreeSet<CandidateId> = voters[0].candidates().collect();
            recorded.lock().unwrap().push(universe);
            Ok(prior.last().cloned())
        }));
    let result = engine.run_single_election().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let winners: BTreeSet<CandidateId> = result.iter().map(|r| r.candidate).collect();
    assert_eq!(seen[0], winners);
    assert_eq!(seen[0].len(), 3);
}

#[test]
fn runoff_preset_decides_hand_built_electorate() {
    // First round: 0:2, 1:2, 2:1. No majority, so 0 and 1 go through;
    // the 2 voter prefers 1 over 0.
    let voters = vec![
        voter(&[0, 2, 1]),
        voter(&[0, 2, 1]),
        voter(&[1, 2, 0]),
        voter(&[1, 2, 0]),
        voter(&[2, 1, 0]),
    ];
    let mut engine = ElectionEngine::new(3, voters.len());
    engine.add_preset(PipelinePreset::Runoff).unwrap();
    let result = engine.tabulate(&voters).unwrap();
    assert_eq!(
        result,
        vec![CandidateRanking::new(1, 3), CandidateRanking::new(0, 2)]
    );
}

// ── 3. Constrained populations ───────────────────────────────────────

#[test]
fn forced_majority_wins_plurality() {
    let mut engine = ElectionEngine::new(4, 100);
    engine
        .add_step(PluralityFirstChoice)
        .add_constraint(PopulationConstraint::from_predicate(
            0.6,
            VoterPredicate::RanksFirst { candidate: 3 },
        ));
    let result = engine.run_single_election().unwrap();
    assert_eq!(result[0], CandidateRanking::new(3, 60));
}

#[test]
fn reset_and_add_leaves_original_untouched() {
    let mut base = ElectionEngine::new(3, 50);
    base.add_step(PluralityFirstChoice);
    let derived = base.reset_and_add(PopulationConstraint::from_predicate(
        1.0,
        VoterPredicate::RanksFirst { candidate: 2 },
    ));
    assert!(base.constraints().is_empty());
    assert_eq!(
        derived.run_single_election().unwrap(),
        vec![CandidateRanking::new(2, 50)]
    );
}

#[test]
fn contradictory_constraints_are_unsatisfiable() {
    let mut engine = ElectionEngine::new(3, 20).with_max_draws_per_voter(200);
    engine
        .add_step(PluralityFirstChoice)
        .add_constraint(PopulationConstraint::from_predicate(
            0.5,
            VoterPredicate::RanksFirst { candidate: 0 },
        ))
        .add_constraint(PopulationConstraint::from_predicate(
            0.6,
            VoterPredicate::RanksFirst { candidate: 1 },
        ));
    let err = engine.run_single_election().unwrap_err();
    assert!(err.is_unsatisfiable(), "{err}");
}

// ── 4. Flip analysis ─────────────────────────────────────────────────

#[test]
fn unanimous_electorate_never_flips() {
    let mut engine = ElectionEngine::new(5, 40);
    engine
        .add_step(PluralityFirstChoice)
        .add_constraint(PopulationConstraint::from_predicate(
            1.0,
            VoterPredicate::RanksFirst { candidate: 1 },
        ));
    let result = engine.run_election().unwrap();
    assert_eq!(result.winner(), Some(1));
    assert_eq!(result.flips, 0);
}

#[test]
fn flip_count_is_bounded_by_losers() {
    init_logging();
    let mut engine = ElectionEngine::new(8, 60).with_seed(11);
    engine.add_preset(PipelinePreset::Runoff).unwrap();
    let voters = engine.generate_population(0).unwrap();
    let result = engine.count_flips(&voters).unwrap();
    assert!(result.flips <= 7);
    assert_eq!(engine.run_election().unwrap(), result);
}
