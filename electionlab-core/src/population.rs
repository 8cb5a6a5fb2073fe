//! Voter population generation under proportional constraints.
//!
//! A constraint says "this fraction of the population must satisfy this
//! predicate". Constraints are filled one at a time in ascending fraction
//! order by a small state machine:
//!
//! - `active` is the constraint currently being filled, `satisfied` its count.
//! - A drawn voter is accepted only if it fails every earlier constraint and
//!   satisfies the active one.
//! - When `satisfied` reaches the active target, the next constraint becomes
//!   active and its count is seeded by re-scanning the voters accepted so far.
//! - Once every constraint is met, new voters must fail all predicates so no
//!   fraction is exceeded.
//!
//! Running out of population before a target is met, or exhausting the draw
//! budget, is reported as `UnsatisfiableConstraints`. The budget is shared by
//! the whole population (`num_people * max_draws_per_voter` draws), so a rare
//! but reachable predicate only fails when the population as a whole runs
//! dry, not when one voter is unlucky.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::ranking::CandidateId;
use crate::voter::Voter;

/// Default draw allowance per voter. The allowance is pooled across the
/// population rather than enforced voter by voter.
pub const DEFAULT_MAX_DRAWS_PER_VOTER: usize = 10_000;

/// Errors from population generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PopulationError {
    #[error("invalid population configuration: {0}")]
    Configuration(String),
    #[error("constraints cannot be satisfied: {0}")]
    UnsatisfiableConstraints(String),
}

type PredicateFn = dyn Fn(&Voter) -> bool + Send + Sync;

/// Serializable voter predicates for use in config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoterPredicate {
    /// The voter's top choice is `candidate`.
    RanksFirst { candidate: CandidateId },
    /// The voter's bottom choice is `candidate`.
    RanksLast { candidate: CandidateId },
    /// The voter gives `candidate` exactly this preference strength.
    HasPreference { candidate: CandidateId, strength: u32 },
    /// The voter prefers `candidate` to `over`.
    Prefers { candidate: CandidateId, over: CandidateId },
}

impl VoterPredicate {
    pub fn matches(&self, voter: &Voter) -> bool {
        match *self {
            Self::RanksFirst { candidate } => voter.most_preferred() == Some(candidate),
            Self::RanksLast { candidate } => voter.least_preferred() == Some(candidate),
            Self::HasPreference {
                candidate,
                strength,
            } => voter.preference_of(candidate) == Ok(strength),
            Self::Prefers { candidate, over } => {
                match (voter.preference_of(candidate), voter.preference_of(over)) {
                    (Ok(a), Ok(b)) => a > b,
                    _ => false,
                }
            }
        }
    }
}

impl fmt::Display for VoterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RanksFirst { candidate } => write!(f, "ranks {candidate} first"),
            Self::RanksLast { candidate } => write!(f, "ranks {candidate} last"),
            Self::HasPreference {
                candidate,
                strength,
            } => write!(f, "gives {candidate} strength {strength}"),
            Self::Prefers { candidate, over } => write!(f, "prefers {candidate} over {over}"),
        }
    }
}

/// "`fraction` of the population must satisfy `predicate`."
#[derive(Clone)]
pub struct PopulationConstraint {
    fraction: f64,
    label: String,
    predicate: Arc<PredicateFn>,
}

impl PopulationConstraint {
    pub fn new<F>(fraction: f64, predicate: F) -> Self
    where
        F: Fn(&Voter) -> bool + Send + Sync + 'static,
    {
        Self {
            fraction,
            label: "custom".to_string(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn from_predicate(fraction: f64, predicate: VoterPredicate) -> Self {
        let label = predicate.to_string();
        Self {
            fraction,
            label,
            predicate: Arc::new(move |v: &Voter| predicate.matches(v)),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matches(&self, voter: &Voter) -> bool {
        (self.predicate)(voter)
    }

    /// Number of voters this constraint asks for, rounded half away from zero.
    pub fn target_count(&self, population: usize) -> usize {
        (self.fraction * population as f64).round() as usize
    }
}

impl fmt::Debug for PopulationConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopulationConstraint")
            .field("fraction", &self.fraction)
            .field("label", &self.label)
            .finish()
    }
}

/// Draws voters until the population is complete and every constraint is met.
#[derive(Debug, Clone)]
pub struct PopulationGenerator {
    num_candidates: u32,
    num_people: usize,
    constraints: Vec<PopulationConstraint>,
    max_draws_per_voter: usize,
}

impl PopulationGenerator {
    /// Validate fractions and order constraints by ascending fraction.
    pub fn new(
        num_candidates: u32,
        num_people: usize,
        constraints: &[PopulationConstraint],
    ) -> Result<Self, PopulationError> {
        check_fractions(constraints)?;
        let mut constraints = constraints.to_vec();
        constraints.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
        Ok(Self {
            num_candidates,
            num_people,
            constraints,
            max_draws_per_voter: DEFAULT_MAX_DRAWS_PER_VOTER,
        })
    }

    pub fn with_max_draws_per_voter(mut self, max_draws: usize) -> Self {
        self.max_draws_per_voter = max_draws.max(1);
        self
    }

    /// Total draws allowed for one population.
    pub fn draw_budget(&self) -> usize {
        self.num_people.saturating_mul(self.max_draws_per_voter)
    }

    /// Constraints in the order they are filled.
    pub fn constraints(&self) -> &[PopulationConstraint] {
        &self.constraints
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Voter>, PopulationError> {
        let targets: Vec<usize> = self
            .constraints
            .iter()
            .map(|c| c.target_count(self.num_people))
            .collect();
        let mut voters: Vec<Voter> = Vec::with_capacity(self.num_people);
        let mut active = 0usize;
        let mut satisfied = 0usize;
        let mut draws_left = self.draw_budget();
        self.advance(&mut active, &mut satisfied, &targets, &voters);

        while voters.len() < self.num_people {
            let voter = self.draw_acceptable(rng, active, &mut draws_left)?;
            if active < self.constraints.len() {
                satisfied += 1;
            }
            voters.push(voter);
            self.advance(&mut active, &mut satisfied, &targets, &voters);
        }

        if active < self.constraints.len() {
            return Err(PopulationError::UnsatisfiableConstraints(format!(
                "constraint '{}' reached {} of {} voters before the population of {} was complete",
                self.constraints[active].label, satisfied, targets[active], self.num_people
            )));
        }
        Ok(voters)
    }

    /// Move `active` past every constraint whose target is already met,
    /// seeding each newly active constraint from the accepted voters.
    fn advance(&self, active: &mut usize, satisfied: &mut usize, targets: &[usize], voters: &[Voter]) {
        while *active < self.constraints.len() && *satisfied >= targets[*active] {
            debug!(
                "constraint '{}' satisfied with {} voters",
                self.constraints[*active].label, satisfied
            );
            *active += 1;
            if let Some(next) = self.constraints.get(*active) {
                *satisfied = voters.iter().filter(|v| next.matches(v)).count();
            }
        }
    }

    fn acceptable(&self, voter: &Voter, active: usize) -> bool {
        if self.constraints[..active].iter().any(|c| c.matches(voter)) {
            return false;
        }
        self.constraints
            .get(active)
            .map_or(true, |c| c.matches(voter))
    }

    fn draw_acceptable<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        active: usize,
        draws_left: &mut usize,
    ) -> Result<Voter, PopulationError> {
        while *draws_left > 0 {
            *draws_left -= 1;
            let voter = Voter::random(self.num_candidates, rng);
            if self.acceptable(&voter, active) {
                return Ok(voter);
            }
        }
        let wanted = match self.constraints.get(active) {
            Some(c) => format!("satisfying '{}'", c.label),
            None => "failing every constraint".to_string(),
        };
        Err(PopulationError::UnsatisfiableConstraints(format!(
            "draw budget of {} exhausted looking for a voter {}",
            self.draw_budget(),
            wanted
        )))
    }
}

/// Every fraction must be a number in `[0, 1]`.
pub(crate) fn check_fractions(constraints: &[PopulationConstraint]) -> Result<(), PopulationError> {
    match constraints
        .iter()
        .find(|c| !(0.0..=1.0).contains(&c.fraction))
    {
        Some(bad) => Err(PopulationError::Configuration(format!(
            "constraint '{}' has fraction {} outside [0, 1]",
            bad.label, bad.fraction
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn count(voters: &[Voter], predicate: &VoterPredicate) -> usize {
        voters.iter().filter(|v| predicate.matches(v)).count()
    }

    #[test]
    fn unconstrained_population_has_requested_size() {
        let generator = PopulationGenerator::new(4, 50, &[]).unwrap();
        let voters = generator.generate(&mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(voters.len(), 50);
        assert!(voters.iter().all(|v| v.num_candidates() == 4));
    }

    #[test]
    fn single_constraint_hits_exact_fraction() {
        let last = VoterPredicate::RanksLast { candidate: 0 };
        let generator = PopulationGenerator::new(
            5,
            100,
            &[PopulationConstraint::from_predicate(0.2, last.clone())],
        )
        .unwrap();
        let voters = generator.generate(&mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(voters.len(), 100);
        assert_eq!(count(&voters, &last), 20);
    }

    #[test]
    fn zero_fraction_excludes_predicate_entirely() {
        let first = VoterPredicate::RanksFirst { candidate: 0 };
        let generator = PopulationGenerator::new(
            2,
            10,
            &[PopulationConstraint::from_predicate(0.0, first.clone())],
        )
        .unwrap();
        let voters = generator.generate(&mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(count(&voters, &first), 0);
    }

    #[test]
    fn two_disjoint_constraints_are_both_exact() {
        let first0 = VoterPredicate::RanksFirst { candidate: 0 };
        let first1 = VoterPredicate::RanksFirst { candidate: 1 };
        let generator = PopulationGenerator::new(
            4,
            40,
            &[
                PopulationConstraint::from_predicate(0.5, first1.clone()),
                PopulationConstraint::from_predicate(0.25, first0.clone()),
            ],
        )
        .unwrap();
        assert_eq!(generator.constraints()[0].fraction(), 0.25);
        let voters = generator.generate(&mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(count(&voters, &first0), 10);
        assert_eq!(count(&voters, &first1), 20);
    }

    #[test]
    fn fraction_out_of_range_is_configuration_error() {
        let c = PopulationConstraint::new(1.5, |_| true);
        assert!(matches!(
            PopulationGenerator::new(3, 10, &[c]),
            Err(PopulationError::Configuration(_))
        ));
        let nan = PopulationConstraint::new(f64::NAN, |_| true);
        assert!(PopulationGenerator::new(3, 10, &[nan]).is_err());
    }

    #[test]
    fn exclusive_constraints_exhaust_population() {
        let a = PopulationConstraint::from_predicate(0.6, VoterPredicate::RanksFirst { candidate: 0 });
        let b = PopulationConstraint::from_predicate(0.8, VoterPredicate::RanksFirst { candidate: 1 });
        let generator = PopulationGenerator::new(3, 10, &[a, b]).unwrap();
        let err = generator.generate(&mut StdRng::seed_from_u64(5)).unwrap_err();
        assert!(matches!(err, PopulationError::UnsatisfiableConstraints(_)));
    }

    #[test]
    fn draw_budget_is_shared_across_the_population() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        // Matches on every fifth call only: each constrained voter needs five
        // draws, more than the per-voter allowance of three.
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let every_fifth = PopulationConstraint::new(0.2, move |_| {
            counter.fetch_add(1, Ordering::SeqCst) % 5 == 4
        });
        let generator = PopulationGenerator::new(3, 10, &[every_fifth])
            .unwrap()
            .with_max_draws_per_voter(3);
        assert_eq!(generator.draw_budget(), 30);
        let voters = generator.generate(&mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(voters.len(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 19);
    }

    #[test]
    fn rare_last_place_quota_at_default_sizes() {
        // 80 of 400 voters must rank candidate 0 last among 1000.
        let last = VoterPredicate::RanksLast { candidate: 0 };
        let generator = PopulationGenerator::new(
            1000,
            400,
            &[PopulationConstraint::from_predicate(0.2, last.clone())],
        )
        .unwrap();
        let voters = generator.generate(&mut StdRng::seed_from_u64(12)).unwrap();
        assert_eq!(voters.len(), 400);
        assert_eq!(count(&voters, &last), 80);
    }

    #[test]
    fn impossible_predicate_exhausts_draw_budget() {
        let never = PopulationConstraint::new(0.5, |_| false).with_label("never");
        let generator = PopulationGenerator::new(3, 10, &[never])
            .unwrap()
            .with_max_draws_per_voter(50);
        let err = generator.generate(&mut StdRng::seed_from_u64(6)).unwrap_err();
        assert!(err.to_string().contains("never"));
    }

    #[test]
    fn always_true_predicate_cannot_stay_at_fraction() {
        let always = PopulationConstraint::new(0.5, |_| true);
        let generator = PopulationGenerator::new(3, 10, &[always])
            .unwrap()
            .with_max_draws_per_voter(50);
        assert!(matches!(
            generator.generate(&mut StdRng::seed_from_u64(7)),
            Err(PopulationError::UnsatisfiableConstraints(_))
        ));
    }

    #[test]
    fn generation_is_deterministic_for_seed() {
        let c = PopulationConstraint::from_predicate(0.3, VoterPredicate::RanksFirst { candidate: 2 });
        let generator = PopulationGenerator::new(4, 30, &[c]).unwrap();
        let a = generator.generate(&mut StdRng::seed_from_u64(8)).unwrap();
        let b = generator.generate(&mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn predicates_match_expected_voters() {
        let v = Voter::from_preference_order(&[2, 0, 1]).unwrap();
        assert!(VoterPredicate::RanksFirst { candidate: 2 }.matches(&v));
        assert!(VoterPredicate::RanksLast { candidate: 1 }.matches(&v));
        assert!(VoterPredicate::HasPreference { candidate: 0, strength: 1 }.matches(&v));
        assert!(VoterPredicate::Prefers { candidate: 0, over: 1 }.matches(&v));
        assert!(!VoterPredicate::Prefers { candidate: 1, over: 0 }.matches(&v));
        assert!(!VoterPredicate::Prefers { candidate: 9, over: 0 }.matches(&v));
    }

    #[test]
    fn target_count_rounds() {
        let c = PopulationConstraint::new(0.1 * 3.0, |_| true);
        assert_eq!(c.target_count(10), 3);
        let half = PopulationConstraint::new(0.25, |_| true);
        assert_eq!(half.target_count(10), 3);
    }
}
