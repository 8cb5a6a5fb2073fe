//! Keep candidates whose previous score beats a fraction of the electorate.

use super::{last_result, StepError, StepOutput, TabulationStep};
use crate::ranking::CandidateRanking;
use crate::voter::Voter;

/// Filter on `score / number_of_voters > min_fraction`, using the most
/// recent prior result.
///
/// When nobody passes, the default is to hand back the prior result
/// unchanged. With `with_keep_all_on_empty(false)` the step returns an empty
/// result instead, which ends the election as a failure.
#[derive(Debug, Clone, Copy)]
pub struct KeepAboveFraction {
    min_fraction: f64,
    on_empty_keep_all: bool,
}

impl KeepAboveFraction {
    pub fn new(min_fraction: f64) -> Result<Self, StepError> {
        if !min_fraction.is_finite() {
            return Err(StepError::Configuration {
                step: "keep_above_fraction".into(),
                reason: format!("minimum fraction must be finite, got {min_fraction}"),
            });
        }
        Ok(Self {
            min_fraction,
            on_empty_keep_all: true,
        })
    }

    pub fn with_keep_all_on_empty(mut self, keep_all: bool) -> Self {
        self.on_empty_keep_all = keep_all;
        self
    }

    pub fn min_fraction(&self) -> f64 {
        self.min_fraction
    }

    pub fn keeps_all_on_empty(&self) -> bool {
        self.on_empty_keep_all
    }
}

impl TabulationStep for KeepAboveFraction {
    fn name(&self) -> &str {
        "keep_above_fraction"
    }

    fn requires_prior(&self) -> bool {
        true
    }

    fn run(&self, voters: &[Voter], prior: &[Vec<CandidateRanking>]) -> Result<StepOutput, StepError> {
        let last = last_result(self.name(), prior)?;
        let population = voters.len() as f64;

        let passed: Vec<CandidateRanking> = if voters.is_empty() {
            Vec::new()
        } else {
            last.iter()
                .filter(|c| c.ranking as f64 / population > self.min_fraction)
                .copied()
                .collect()
        };

        if passed.is_empty() && self.on_empty_keep_all {
            return Ok(Some(last.to_vec()));
        }
        Ok(Some(passed))
    }
}
