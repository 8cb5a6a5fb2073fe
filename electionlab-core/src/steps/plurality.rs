//! Plurality: each voter's single most preferred candidate gets one vote.

use std::collections::BTreeMap;

use super::{StepError, StepOutput, TabulationStep};
use crate::ranking::{CandidateId, CandidateRanking};
use crate::voter::Voter;

/// First-choice tally. Candidates with no first-choice votes are left out
/// of the result, so the output is sparse.
#[derive(Debug, Clone, Copy, Default)]
pub struct PluralityFirstChoice;

impl TabulationStep for PluralityFirstChoice {
    fn name(&self) -> &str {
        "plurality"
    }

    fn run(&self, voters: &[Voter], _prior: &[Vec<CandidateRanking>]) -> Result<StepOutput, StepError> {
        let mut tally: BTreeMap<CandidateId, i64> = BTreeMap::new();
        for top in voters.iter().filter_map(Voter::most_preferred) {
            *tally.entry(top).or_insert(0) += 1;
        }
        Ok(Some(
            tally
                .into_iter()
                .map(|(candidate, votes)| CandidateRanking::new(candidate, votes))
                .collect(),
        ))
    }
}
