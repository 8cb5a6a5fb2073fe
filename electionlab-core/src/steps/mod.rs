//! Tabulation steps: one round of scoring or filtering in an election.
//!
//! A pipeline is an ordered list of steps. Each step sees the voters as
//! windowed down to the current survivors plus every earlier step's output,
//! and returns one `CandidateRanking` per candidate it keeps.
//!
//! Steps are shared read-only across rounds, flip re-runs and ensemble
//! trials, so they must not carry per-run mutable state.

pub mod borda;
pub mod keep_above;
pub mod keep_best;
pub mod plurality;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::ranking::CandidateRanking;
use crate::voter::Voter;

pub use borda::BordaCount;
pub use keep_above::KeepAboveFraction;
pub use keep_best::KeepBestN;
pub use plurality::PluralityFirstChoice;

/// Setup and sequencing failures raised by steps.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("invalid configuration for step '{step}': {reason}")]
    Configuration { step: String, reason: String },
    #[error("step '{0}' needs prior results and cannot run first")]
    Sequencing(String),
}

/// What a step hands back. `None` is a missing result (a defect in the
/// step); `Some(vec![])` is a legitimate but terminal empty outcome.
pub type StepOutput = Option<Vec<CandidateRanking>>;

/// One stage of an election pipeline.
pub trait TabulationStep: Send + Sync {
    /// Human-readable name (e.g., "plurality", "keep_best_n").
    fn name(&self) -> &str;

    /// Score the current electorate.
    ///
    /// `voters` already reflects the surviving candidate universe.
    /// `prior` holds earlier steps' outputs in order, empty for the first step.
    fn run(&self, voters: &[Voter], prior: &[Vec<CandidateRanking>]) -> Result<StepOutput, StepError>;

    /// Whether the step reads `prior` and so cannot open a pipeline.
    fn requires_prior(&self) -> bool {
        false
    }
}

/// The most recent prior result, or a sequencing error naming `step`.
pub(crate) fn last_result<'a>(
    step: &str,
    prior: &'a [Vec<CandidateRanking>],
) -> Result<&'a [CandidateRanking], StepError> {
    prior
        .last()
        .map(Vec::as_slice)
        .ok_or_else(|| StepError::Sequencing(step.to_string()))
}

type StepBody =
    dyn Fn(&[Voter], &[Vec<CandidateRanking>]) -> Result<StepOutput, StepError> + Send + Sync;

/// A step backed by a closure. Handy for ad-hoc scoring rules and tests.
pub struct StepFn {
    name: String,
    body: Box<StepBody>,
}

impl StepFn {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Voter], &[Vec<CandidateRanking>]) -> Result<StepOutput, StepError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }
}

impl std::fmt::Debug for StepFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepFn").field("name", &self.name).finish()
    }
}

impl TabulationStep for StepFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, voters: &[Voter], prior: &[Vec<CandidateRanking>]) -> Result<StepOutput, StepError> {
        (self.body)(voters, prior)
    }
}

// ─── Serializable step configuration ────────────────────────────────

fn default_true() -> bool {
    true
}

/// Step configuration as it appears in TOML/JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepConfig {
    /// Count each voter's single top choice.
    Plurality,

    /// Sum every voter's dense preference strengths.
    Borda,

    /// Keep the `n` best candidates of the previous step.
    KeepBestN { n: usize },

    /// Keep candidates whose previous score exceeds `min_fraction` of the electorate.
    KeepAboveFraction {
        min_fraction: f64,
        #[serde(default = "default_true")]
        on_empty_keep_all: bool,
    },
}

impl StepConfig {
    /// Create the runtime step.
    pub fn build(&self) -> Result<Arc<dyn TabulationStep>, StepError> {
        Ok(match self {
            Self::Plurality => Arc::new(PluralityFirstChoice),
            Self::Borda => Arc::new(BordaCount),
            Self::KeepBestN { n } => Arc::new(KeepBestN::new(*n)?),
            Self::KeepAboveFraction {
                min_fraction,
                on_empty_keep_all,
            } => Arc::new(
                KeepAboveFraction::new(*min_fraction)?.with_keep_all_on_empty(*on_empty_keep_all),
            ),
        })
    }

    /// Whether this step reads `prior` and therefore cannot open a pipeline.
    pub fn needs_prior(&self) -> bool {
        matches!(self, Self::KeepBestN { .. } | Self::KeepAboveFraction { .. })
    }
}

/// Build every step in order.
pub fn build_steps(configs: &[StepConfig]) -> Result<Vec<Arc<dyn TabulationStep>>, StepError> {
    configs.iter().map(StepConfig::build).collect()
}
