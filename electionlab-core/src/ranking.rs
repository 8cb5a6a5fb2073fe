//! The unit of tabulation output: a candidate paired with a step-specific score.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Candidate identity. Candidates in a fresh universe are numbered `0..N`.
pub type CandidateId = u32;

/// A candidate and the score a tabulation step assigned to it.
///
/// The meaning of `ranking` belongs to the step that produced it: vote count,
/// Borda points, or a dense preference position. Scores from different steps
/// are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateRanking {
    pub candidate: CandidateId,
    pub ranking: i64,
}

impl CandidateRanking {
    pub fn new(candidate: CandidateId, ranking: i64) -> Self {
        Self { candidate, ranking }
    }
}

impl fmt::Display for CandidateRanking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.candidate, self.ranking)
    }
}

/// Stable descending sort by score. Equal scores keep their incoming order.
pub fn sort_descending(rankings: &mut [CandidateRanking]) {
    rankings.sort_by(|a, b| b.ranking.cmp(&a.ranking));
}

/// The set of candidate ids present in a step result.
pub fn candidate_set(rankings: &[CandidateRanking]) -> BTreeSet<CandidateId> {
    rankings.iter().map(|r| r.candidate).collect()
}
