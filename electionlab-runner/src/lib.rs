//! ElectionLab Runner: ensembles, trends, configuration and export.
//!
//! This crate builds on `electionlab-core` to provide:
//! - Ensemble aggregation of flip analyses across independent trials
//! - Trend runs sweeping a population constraint
//! - TOML simulation configuration with content-addressed ids
//! - CSV and JSON export of results

pub mod config;
pub mod ensemble;
pub mod export;
pub mod trend;

pub use config::{ConfigError, ConfigId, ConstraintConfig, SimulationConfig, TrendConfig};
pub use ensemble::{
    run_election_ensemble, EnsembleAggregator, EnsembleConfig, EnsembleError, EnsembleResult,
    FailurePolicy,
};
pub use export::{Artifact, ExportError, Report};
pub use trend::{linear_sweep, ElectionTrend, TrendPoint};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn ensemble_types_are_send_sync() {
        assert_send::<EnsembleResult>();
        assert_sync::<EnsembleResult>();
        assert_send::<EnsembleAggregator>();
        assert_sync::<EnsembleAggregator>();
        assert_send::<EnsembleError>();
        assert_sync::<EnsembleError>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<SimulationConfig>();
        assert_sync::<SimulationConfig>();
    }

    #[test]
    fn trend_types_are_send_sync() {
        assert_send::<ElectionTrend>();
        assert_sync::<ElectionTrend>();
        assert_send::<TrendPoint>();
        assert_sync::<TrendPoint>();
    }
}
