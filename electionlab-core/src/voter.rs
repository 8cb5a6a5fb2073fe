//! Synthetic voter with a total, gap-free preference order.
//!
//! A voter maps every candidate in its universe to a preference strength.
//! Strengths always form a permutation of `0..N`, larger meaning more
//! preferred. Removing or restricting candidates never edits a voter in
//! place: it builds a new voter whose strengths are re-densified to
//! `0..M` over the survivors, preserving their relative order.

use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::ranking::{CandidateId, CandidateRanking};

/// Validation failures when building or querying a voter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoterError {
    #[error("candidate {0} is not in this voter's universe")]
    UnknownCandidate(CandidateId),
    #[error("candidate {0} appears more than once in the preference order")]
    DuplicateCandidate(CandidateId),
    #[error("candidate {0} is missing from the preference order")]
    MissingCandidate(CandidateId),
}

/// One voter's preferences over a candidate universe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Voter {
    /// candidate -> strength; strengths are exactly `0..preferences.len()`.
    preferences: BTreeMap<CandidateId, u32>,
}

impl Voter {
    /// Random total order over candidates `0..num_candidates`.
    ///
    /// Each candidate draws a uniform key; sorting by key gives the
    /// preference order, lowest key least preferred. Equal keys fall back to
    /// candidate order, so a fixed seed always yields the same voter.
    pub fn random<R: Rng + ?Sized>(num_candidates: u32, rng: &mut R) -> Self {
        let mut keyed: Vec<(u64, CandidateId)> = (0..num_candidates)
            .map(|candidate| (rng.gen::<u64>(), candidate))
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        Self::from_ascending(keyed.into_iter().map(|(_, candidate)| candidate))
    }

    /// Build from an explicit order, most preferred candidate first.
    ///
    /// The order must name every candidate in `0..order.len()` exactly once.
    /// `from_preference_order(&[2, 0, 1])` prefers 2 over 0 over 1, giving
    /// strengths `2 -> 2`, `0 -> 1`, `1 -> 0`.
    pub fn from_preference_order(order: &[CandidateId]) -> Result<Self, VoterError> {
        let n = order.len();
        let mut preferences = BTreeMap::new();
        for (position, &candidate) in order.iter().enumerate() {
            if preferences
                .insert(candidate, (n - 1 - position) as u32)
                .is_some()
            {
                return Err(VoterError::DuplicateCandidate(candidate));
            }
        }
        if let Some(missing) = (0..n as CandidateId).find(|c| !preferences.contains_key(c)) {
            return Err(VoterError::MissingCandidate(missing));
        }
        Ok(Self { preferences })
    }

    /// Candidates given least preferred first; strengths assigned by position.
    fn from_ascending(candidates: impl IntoIterator<Item = CandidateId>) -> Self {
        let preferences = candidates
            .into_iter()
            .enumerate()
            .map(|(strength, candidate)| (candidate, strength as u32))
            .collect();
        Self { preferences }
    }

    pub fn num_candidates(&self) -> usize {
        self.preferences.len()
    }

    /// Candidate ids in this voter's universe, ascending by id.
    pub fn candidates(&self) -> impl Iterator<Item = CandidateId> + '_ {
        self.preferences.keys().copied()
    }

    pub fn contains(&self, candidate: CandidateId) -> bool {
        self.preferences.contains_key(&candidate)
    }

    /// Preference strength for `candidate`; larger is more preferred.
    pub fn preference_of(&self, candidate: CandidateId) -> Result<u32, VoterError> {
        self.preferences
            .get(&candidate)
            .copied()
            .ok_or(VoterError::UnknownCandidate(candidate))
    }

    /// The single most preferred candidate, if the universe is not empty.
    pub fn most_preferred(&self) -> Option<CandidateId> {
        self.preferences
            .iter()
            .max_by_key(|(_, strength)| **strength)
            .map(|(candidate, _)| *candidate)
    }

    /// The single least preferred candidate, if the universe is not empty.
    pub fn least_preferred(&self) -> Option<CandidateId> {
        self.preferences
            .iter()
            .min_by_key(|(_, strength)| **strength)
            .map(|(candidate, _)| *candidate)
    }

    /// Every candidate with its strength, ascending by strength.
    pub fn full_ranking(&self) -> Vec<CandidateRanking> {
        self.ranking_where(|_| true)
    }

    /// Ranking over the candidates not in `excluded`, ascending by strength
    /// and re-densified to `0..M`. Ids in `excluded` that this voter never
    /// knew about are ignored.
    pub fn full_ranking_excluding(&self, excluded: &BTreeSet<CandidateId>) -> Vec<CandidateRanking> {
        self.ranking_where(|c| !excluded.contains(&c))
    }

    /// New voter over `keep ∩ universe`.
    pub fn restricted_to(&self, keep: &BTreeSet<CandidateId>) -> Voter {
        Self::from_ranking(&self.ranking_where(|c| keep.contains(&c)))
    }

    /// New voter over `universe \ removed`.
    pub fn with_removed(&self, removed: &BTreeSet<CandidateId>) -> Voter {
        Self::from_ranking(&self.full_ranking_excluding(removed))
    }

    fn from_ranking(ascending: &[CandidateRanking]) -> Voter {
        Self::from_ascending(ascending.iter().map(|r| r.candidate))
    }

    fn ranking_where(&self, keep: impl Fn(CandidateId) -> bool) -> Vec<CandidateRanking> {
        let mut surviving: Vec<(u32, CandidateId)> = self
            .preferences
            .iter()
            .filter(|(candidate, _)| keep(**candidate))
            .map(|(candidate, strength)| (*strength, *candidate))
            .collect();
        surviving.sort_unstable();
        surviving
            .into_iter()
            .enumerate()
            .map(|(dense, (_, candidate))| CandidateRanking::new(candidate, dense as i64))
            .collect()
    }
}
