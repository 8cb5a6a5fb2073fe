//! Ensemble aggregation: many independent flip analyses reduced to
//! distributional statistics.
//!
//! Every trial draws its own electorate from the engine's RNG hierarchy
//! (population stream, trial index) and runs leave-one-out flip analysis on
//! it. Per-trial outcomes are reduced with an associative, commutative
//! `merge`, so results do not depend on thread count or completion order.

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use electionlab_core::{CandidateId, ElectionEngine, ElectionError, FlipResult};

// ─── Configuration ───────────────────────────────────────────────────

/// What to do with a trial whose pipeline leaves no candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole ensemble.
    #[default]
    Abort,
    /// Drop the trial; it is reported in `skipped`.
    Skip,
    /// Count the trial as completed with no flip. The unperturbed ranking is
    /// still recorded when the original election was decided.
    CountAsNoFlip,
}

/// Ensemble settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Number of independent trials (default 100).
    pub trials: usize,
    pub failure_policy: FailurePolicy,
    /// Run trials on the rayon pool (default true).
    pub parallel: bool,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            trials: 100,
            failure_policy: FailurePolicy::Abort,
            parallel: true,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Aggregated outcome of an ensemble.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleResult {
    /// Trials that completed (including those counted as no-flip).
    pub trials: usize,
    /// Trials dropped under `FailurePolicy::Skip`.
    pub skipped: usize,
    /// Trials in which at least one removal changed the winner.
    pub flips: usize,
    /// `histogram[candidate][rank]`: trials in which `candidate` finished at
    /// `rank` (0 = winner).
    pub per_candidate_rank_histogram: BTreeMap<CandidateId, Vec<usize>>,
}

impl EnsembleResult {
    /// Contribution of one completed trial.
    pub fn from_trial(result: &FlipResult) -> Self {
        let mut histogram = BTreeMap::new();
        for (rank, &candidate) in result.candidate_ordering.iter().enumerate() {
            let mut counts = vec![0; rank + 1];
            counts[rank] = 1;
            histogram.insert(candidate, counts);
        }
        Self {
            trials: 1,
            skipped: 0,
            flips: usize::from(result.flipped()),
            per_candidate_rank_histogram: histogram,
        }
    }

    fn skipped_trial() -> Self {
        Self {
            skipped: 1,
            ..Self::default()
        }
    }

    fn no_flip_trial() -> Self {
        Self {
            trials: 1,
            ..Self::default()
        }
    }

    /// Combine two partial results. Associative and commutative.
    pub fn merge(mut self, other: Self) -> Self {
        self.trials += other.trials;
        self.skipped += other.skipped;
        self.flips += other.flips;
        for (candidate, counts) in other.per_candidate_rank_histogram {
            let mine = self.per_candidate_rank_histogram.entry(candidate).or_default();
            if mine.len() < counts.len() {
                mine.resize(counts.len(), 0);
            }
            for (slot, count) in mine.iter_mut().zip(counts) {
                *slot += count;
            }
        }
        self
    }

    pub fn candidates(&self) -> impl Iterator<Item = CandidateId> + '_ {
        self.per_candidate_rank_histogram.keys().copied()
    }

    pub fn rank_count(&self, candidate: CandidateId, rank: usize) -> usize {
        self.per_candidate_rank_histogram
            .get(&candidate)
            .and_then(|counts| counts.get(rank))
            .copied()
            .unwrap_or(0)
    }

    pub fn win_count(&self, candidate: CandidateId) -> usize {
        self.rank_count(candidate, 0)
    }

    /// Wins over completed trials; 0.0 for an empty result.
    pub fn win_fraction(&self, candidate: CandidateId) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.win_count(candidate) as f64 / self.trials as f64
    }

    /// Trials in which `candidate` appeared in the final ranking at all.
    pub fn rank_total(&self, candidate: CandidateId) -> usize {
        self.per_candidate_rank_histogram
            .get(&candidate)
            .map_or(0, |counts| counts.iter().sum())
    }

    pub fn flip_fraction(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.flips as f64 / self.trials as f64
    }
}

/// Errors from ensemble runs.
#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("ensemble size must be at least 1")]
    InvalidEnsembleSize,
    #[error("ensemble setup failed: {0}")]
    Setup(#[from] ElectionError),
    #[error("trial {trial} failed: {source}")]
    Trial {
        trial: u64,
        #[source]
        source: ElectionError,
    },
}

impl EnsembleError {
    /// The error that stopped the run, if it came from the election itself.
    pub fn election_error(&self) -> Option<&ElectionError> {
        match self {
            Self::InvalidEnsembleSize => None,
            Self::Setup(e) | Self::Trial { source: e, .. } => Some(e),
        }
    }
}

// ─── Ensemble execution ──────────────────────────────────────────────

/// Runs ensembles of flip analyses, optionally in parallel.
#[derive(Debug, Clone, Default)]
pub struct EnsembleAggregator {
    config: EnsembleConfig,
}

impl EnsembleAggregator {
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.config.trials = trials;
        self
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Run `config.trials` independent trials against `engine`.
    ///
    /// With several failing trials under `FailurePolicy::Abort`, which one is
    /// reported depends on scheduling when running in parallel.
    pub fn run(&self, engine: &ElectionEngine) -> Result<EnsembleResult, EnsembleError> {
        if self.config.trials == 0 {
            return Err(EnsembleError::InvalidEnsembleSize);
        }
        engine.validate()?;

        info!(
            "running {} trials ({} candidates, {} people, {})",
            self.config.trials,
            engine.number_of_candidates(),
            engine.number_of_people(),
            if self.config.parallel { "parallel" } else { "sequential" }
        );

        let trials = 0..self.config.trials as u64;
        let result = if self.config.parallel {
            trials
                .into_par_iter()
                .map(|trial| self.run_trial(engine, trial))
                .try_reduce(EnsembleResult::default, |a, b| Ok(a.merge(b)))?
        } else {
            trials
                .map(|trial| self.run_trial(engine, trial))
                .try_fold(EnsembleResult::default(), |acc, r| r.map(|r| acc.merge(r)))?
        };

        info!(
            "ensemble finished: {} completed, {} skipped, {} with flips",
            result.trials, result.skipped, result.flips
        );
        Ok(result)
    }

    fn run_trial(&self, engine: &ElectionEngine, trial: u64) -> Result<EnsembleResult, EnsembleError> {
        let outcome = engine
            .generate_population(trial)
            .and_then(|voters| engine.count_flips(&voters));

        match outcome {
            Ok(flips) => Ok(EnsembleResult::from_trial(&flips)),
            Err(e) if e.is_election_failure() => match self.config.failure_policy {
                FailurePolicy::Abort => Err(EnsembleError::Trial { trial, source: e }),
                FailurePolicy::Skip => {
                    warn!("skipping trial {trial}: {e}");
                    Ok(EnsembleResult::skipped_trial())
                }
                FailurePolicy::CountAsNoFlip => {
                    warn!("trial {trial} undecided, counting as no flip: {e}");
                    Ok(match e.decided_ordering() {
                        Some(ordering) => EnsembleResult::from_trial(&FlipResult {
                            flips: 0,
                            candidate_ordering: ordering.to_vec(),
                        }),
                        None => EnsembleResult::no_flip_trial(),
                    })
                }
            },
            Err(e) => Err(EnsembleError::Trial { trial, source: e }),
        }
    }
}

/// Run `n` trials with the default policy (abort on failure, parallel).
pub fn run_election_ensemble(
    engine: &ElectionEngine,
    n: usize,
) -> Result<EnsembleResult, EnsembleError> {
    EnsembleAggregator::default().with_trials(n).run(engine)
}
