//! Keep the top `n` candidates of the previous step.

use super::{last_result, StepError, StepOutput, TabulationStep};
use crate::ranking::{sort_descending, CandidateRanking};
use crate::voter::Voter;

/// Filter that keeps the `n` highest scores from the most recent prior
/// result. Ties keep their order in that result. Fewer than `n` candidates
/// are all kept.
#[derive(Debug, Clone, Copy)]
pub struct KeepBestN {
    n: usize,
}

impl KeepBestN {
    pub fn new(n: usize) -> Result<Self, StepError> {
        if n == 0 {
            return Err(StepError::Configuration {
                step: "keep_best_n".into(),
                reason: "cannot keep zero candidates".into(),
            });
        }
        Ok(Self { n })
    }

    pub fn candidates_to_keep(&self) -> usize {
        self.n
    }
}

impl TabulationStep for KeepBestN {
    fn name(&self) -> &str {
        "keep_best_n"
    }

    fn requires_prior(&self) -> bool {
        true
    }

    fn run(&self, _voters: &[Voter], prior: &[Vec<CandidateRanking>]) -> Result<StepOutput, StepError> {
        let mut kept = last_result(self.name(), prior)?.to_vec();
        sort_descending(&mut kept);
        kept.truncate(self.n);
        Ok(Some(kept))
    }
}
