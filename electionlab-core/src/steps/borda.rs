//! Borda count: every voter awards each candidate its dense preference strength.

use std::collections::BTreeMap;

use super::{StepError, StepOutput, TabulationStep};
use crate::ranking::{CandidateId, CandidateRanking};
use crate::voter::Voter;

/// Sum of preference strengths per candidate. A voter's favourite among `M`
/// candidates earns `M-1` points, the least favourite earns `0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BordaCount;

impl TabulationStep for BordaCount {
    fn name(&self) -> &str {
        "borda"
    }

    fn run(&self, voters: &[Voter], _prior: &[Vec<CandidateRanking>]) -> Result<StepOutput, StepError> {
        let mut points: BTreeMap<CandidateId, i64> = BTreeMap::new();
        for voter in voters {
            for r in voter.full_ranking() {
                *points.entry(r.candidate).or_insert(0) += r.ranking;
            }
        }
        Ok(Some(
            points
                .into_iter()
                .map(|(candidate, score)| CandidateRanking::new(candidate, score))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_voter_scores_follow_preference() {
        let voters = vec![Voter::from_preference_order(&[2, 1, 0]).unwrap()];
        let out = BordaCount.run(&voters, &[]).unwrap().unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(
            out,
            vec![
                CandidateRanking::new(0, 0),
                CandidateRanking::new(1, 1),
                CandidateRanking::new(2, 2),
            ]
        );
    }

    #[test]
    fn sums_across_voters() {
        let voters = vec![
            Voter::from_preference_order(&[0, 1, 2]).unwrap(),
            Voter::from_preference_order(&[1, 0, 2]).unwrap(),
            Voter::from_preference_order(&[1, 2, 0]).unwrap(),
        ];
        let out = BordaCount.run(&voters, &[]).unwrap().unwrap();
        // 0: 2+1+0, 1: 1+2+2, 2: 0+0+1
        assert_eq!(
            out,
            vec![
                CandidateRanking::new(0, 3),
                CandidateRanking::new(1, 5),
                CandidateRanking::new(2, 1),
            ]
        );
    }

    #[test]
    fn dense_output_covers_every_candidate() {
        let voters = vec![Voter::from_preference_order(&[3, 0, 1, 2]).unwrap(); 5];
        let out = BordaCount.run(&voters, &[]).unwrap().unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.iter().any(|r| r.candidate == 2 && r.ranking == 0));
    }
}
