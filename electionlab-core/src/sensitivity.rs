//! Leave-one-candidate-out flip analysis.
//!
//! Elect a winner over the full electorate, then re-run the same pipeline
//! once per losing candidate with that candidate removed from every voter.
//! A flip is a perturbed run that elects someone else.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::engine::{ElectionEngine, ElectionError};
use crate::ranking::CandidateId;
use crate::voter::Voter;

/// Outcome of one flip analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipResult {
    /// Perturbed runs whose winner differed from the original.
    pub flips: usize,
    /// The unperturbed result, winner first.
    pub candidate_ordering: Vec<CandidateId>,
}

impl FlipResult {
    pub fn winner(&self) -> Option<CandidateId> {
        self.candidate_ordering.first().copied()
    }

    pub fn flipped(&self) -> bool {
        self.flips > 0
    }
}

impl ElectionEngine {
    /// Flip analysis over a freshly generated electorate.
    pub fn run_election(&self) -> Result<FlipResult, ElectionError> {
        self.validate()?;
        let voters = self.generate_population(0)?;
        self.count_flips(&voters)
    }

    /// Flip analysis over a caller supplied electorate.
    ///
    /// Errors from any perturbed run propagate unchanged; the caller decides
    /// what an `ElectionFailure` means for it.
    pub fn count_flips(&self, voters: &[Voter]) -> Result<FlipResult, ElectionError> {
        let original = self.tabulate(voters)?;
        // tabulate never hands back an empty ranking
        let winner = original[0].candidate;

        let candidate_ordering: Vec<CandidateId> = original.iter().map(|r| r.candidate).collect();

        let universe: BTreeSet<CandidateId> = voters.iter().flat_map(|v| v.candidates()).collect();
        let mut flips = 0;
        for &dropped in universe.iter().filter(|c| **c != winner) {
            let removed = BTreeSet::from([dropped]);
            let perturbed: Vec<Voter> = voters.iter().map(|v| v.with_removed(&removed)).collect();
            let result = self.tabulate(&perturbed).map_err(|e| match e {
                ElectionError::ElectionFailure { round, step } => ElectionError::RemovalFailure {
                    removed: dropped,
                    round,
                    step,
                    candidate_ordering: candidate_ordering.clone(),
                },
                other => other,
            })?;
            if result[0].candidate != winner {
                debug!(
                    "removing candidate {dropped} flips winner {winner} -> {}",
                    result[0].candidate
                );
                flips += 1;
            }
        }

        Ok(FlipResult {
            flips,
            candidate_ordering,
        })
    }
}
