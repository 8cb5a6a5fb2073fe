//! End-to-end tests: TOML config → engine → ensemble/trend → exported files.

use electionlab_core::VoterPredicate;
use electionlab_runner::export::{export_histogram_csv, export_json, import_json, write_file};
use electionlab_runner::{
    linear_sweep, Artifact, ElectionTrend, FailurePolicy, Report, SimulationConfig,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const RUNOFF: &str = r#"
preset = "runoff"

[election]
candidates = 4
people = 60
seed = 3

[ensemble]
trials = 40
"#;

#[test]
fn configured_ensemble_is_reproducible() {
    init_logging();
    let config = SimulationConfig::from_toml(RUNOFF).unwrap();
    let engine = config.build_engine().unwrap();

    let first = config.aggregator().run(&engine).unwrap();
    let second = config.aggregator().with_parallelism(false).run(&engine).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.trials, 40);

    let wins: usize = first.candidates().map(|c| first.win_count(c)).sum();
    assert_eq!(wins, 40);
}

#[test]
fn constrained_majority_candidate_always_wins() {
    init_logging();
    let config = SimulationConfig::from_toml(
        r#"
preset = "majority"

[election]
candidates = 5
people = 50

[[constraints]]
fraction = 0.6
predicate = { type = "RANKS_FIRST", candidate = 4 }

[ensemble]
trials = 20
failure_policy = "skip"
"#,
    )
    .unwrap();
    assert_eq!(config.ensemble.failure_policy, FailurePolicy::Skip);

    let result = config.aggregator().run(&config.build_engine().unwrap()).unwrap();
    assert_eq!(result.win_count(4), 20);
    assert_eq!(result.win_fraction(4), 1.0);
    assert_eq!(result.flips, 0);
}

#[test]
fn trend_sweep_from_config() {
    init_logging();
    let config = SimulationConfig::from_toml(
        r#"
preset = "majority"

[election]
candidates = 2
people = 10

[trend]
points = 10
trials_per_point = 50
max_fraction = 1.0
predicate = { type = "RANKS_FIRST", candidate = 0 }
"#,
    )
    .unwrap();
    let trend_config = config.trend.clone().unwrap();
    let trend = ElectionTrend::new(config.build_engine().unwrap()).with_aggregator(config.aggregator());
    let points = trend
        .run_trend(
            linear_sweep(trend_config.predicate, trend_config.max_fraction),
            trend_config.trials_per_point,
            trend_config.points,
        )
        .unwrap();

    let winner_counts: Vec<usize> = points.iter().map(|p| p.result.win_count(0)).collect();
    assert_eq!(winner_counts, vec![0, 0, 0, 0, 0, 50, 50, 50, 50, 50]);
}

#[test]
fn exported_files_roundtrip() {
    init_logging();
    let config = SimulationConfig::from_toml(RUNOFF).unwrap();
    let result = config.aggregator().run(&config.build_engine().unwrap()).unwrap();
    let config_id = config.config_id().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("out").join("ranks.csv");
    let json_path = dir.path().join("out").join("result.json");

    write_file(&csv_path, &export_histogram_csv(&result).unwrap()).unwrap();
    let artifact = Artifact::new(config_id.clone(), Report::Ensemble { result: result.clone() });
    write_file(&json_path, &export_json(&artifact).unwrap()).unwrap();

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let total: usize = csv
        .lines()
        .skip(1)
        .filter_map(|l| l.rsplit(',').next())
        .map(|n| n.parse::<usize>().unwrap())
        .sum();
    let expected: usize = result.candidates().map(|c| result.rank_total(c)).sum();
    assert_eq!(total, expected);

    let loaded = import_json(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(loaded.config_id, config_id);
    assert_eq!(loaded.report, Report::Ensemble { result });
}

#[test]
fn unsatisfiable_constraints_surface_as_trial_errors() {
    init_logging();
    let mut config = SimulationConfig::from_toml(RUNOFF).unwrap();
    config.election.max_draws_per_voter = 50;
    config.constraints.push(electionlab_runner::ConstraintConfig {
        fraction: 0.5,
        predicate: VoterPredicate::HasPreference {
            candidate: 0,
            strength: 99,
        },
    });
    let err = config
        .aggregator()
        .run(&config.build_engine().unwrap())
        .unwrap_err();
    assert!(err.election_error().is_some_and(|e| e.is_unsatisfiable()), "{err}");
}
