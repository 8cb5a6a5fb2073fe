//! Trend runs: one ensemble per point while a population constraint is swept.
//!
//! Each point derives a fresh engine with its constraints replaced by the
//! point's constraint (`ElectionEngine::reset_and_add`). Constraints never
//! accumulate across points and the base engine is never mutated.

use log::info;
use serde::{Deserialize, Serialize};

use electionlab_core::{ElectionEngine, PopulationConstraint, VoterPredicate};

use crate::ensemble::{EnsembleAggregator, EnsembleError, EnsembleResult};

/// One point of a trend run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub index: usize,
    pub fraction: f64,
    pub label: String,
    pub result: EnsembleResult,
}

/// Runs a sequence of ensembles over a base engine.
#[derive(Debug, Clone)]
pub struct ElectionTrend {
    engine: ElectionEngine,
    aggregator: EnsembleAggregator,
}

impl ElectionTrend {
    pub fn new(engine: ElectionEngine) -> Self {
        Self {
            engine,
            aggregator: EnsembleAggregator::default(),
        }
    }

    /// Use `aggregator`'s policy and parallelism; its trial count is
    /// overridden per run.
    pub fn with_aggregator(mut self, aggregator: EnsembleAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn engine(&self) -> &ElectionEngine {
        &self.engine
    }

    /// `generator(point, points)` gives the constraint for each point.
    pub fn run_trend<G>(
        &self,
        generator: G,
        trials_per_point: usize,
        points: usize,
    ) -> Result<Vec<TrendPoint>, EnsembleError>
    where
        G: Fn(usize, usize) -> PopulationConstraint,
    {
        let aggregator = self.aggregator.clone().with_trials(trials_per_point);
        let mut out = Vec::with_capacity(points);
        for index in 0..points {
            let constraint = generator(index, points);
            let fraction = constraint.fraction();
            let label = constraint.label().to_string();
            info!("trend point {index}/{points}: {fraction:.3} {label}");

            let engine = self.engine.reset_and_add(constraint);
            let result = aggregator.run(&engine)?;
            out.push(TrendPoint {
                index,
                fraction,
                label,
                result,
            });
        }
        Ok(out)
    }
}

/// Generator for a linear sweep of one predicate from 0 towards
/// `max_fraction`: point `i` of `n` asks for `max_fraction * i / n`.
pub fn linear_sweep(
    predicate: VoterPredicate,
    max_fraction: f64,
) -> impl Fn(usize, usize) -> PopulationConstraint {
    move |index, points| {
        let fraction = if points == 0 {
            0.0
        } else {
            max_fraction * index as f64 / points as f64
        };
        PopulationConstraint::from_predicate(fraction, predicate.clone())
    }
}
