//! Election engine: runs a tabulation pipeline to a single winner or a full ranking.
//!
//! Per round:
//! 1. If the candidates present in the previous step's result differ from
//!    what voters currently see, every voter is re-derived with
//!    `restricted_to(survivors)` (windowing). The first round and rounds whose
//!    survivor set did not change reuse the current voters as-is.
//! 2. The step runs. A missing result is `NullStepResult`; an empty result is
//!    `ElectionFailure`.
//! 3. A single survivor ends the election immediately.
//!
//! If every step runs without reaching a single survivor, the last result is
//! returned sorted winner-first.

use log::{debug, trace};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::population::{
    check_fractions, PopulationConstraint, PopulationError, PopulationGenerator,
};
use crate::ranking::{candidate_set, sort_descending, CandidateId, CandidateRanking};
use crate::rng::{RngHierarchy, POPULATION_STREAM};
use crate::steps::{StepError, TabulationStep};
use crate::voter::{Voter, VoterError};

pub const DEFAULT_NUMBER_OF_PEOPLE: usize = 400;
pub const DEFAULT_NUMBER_OF_CANDIDATES: u32 = 1000;
pub const DEFAULT_SEED: u64 = 42;

/// Winner-first ranking, or a singleton when a step left one candidate.
pub type SingleElectionResult = Vec<CandidateRanking>;

/// Errors from running an election.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElectionError {
    #[error("no tabulation steps configured")]
    NoStepsConfigured,
    #[error("the electorate is empty")]
    EmptyElectorate,
    #[error("the candidate universe is empty")]
    NoCandidates,
    #[error("step {round} ('{step}') returned no result")]
    NullStepResult { round: usize, step: String },
    #[error("election failed: step {round} ('{step}') left no candidates")]
    ElectionFailure { round: usize, step: String },
    /// The unperturbed election was decided, but re-running it without
    /// `removed` left no candidates.
    #[error("election without candidate {removed} failed: step {round} ('{step}') left no candidates")]
    RemovalFailure {
        removed: CandidateId,
        round: usize,
        step: String,
        candidate_ordering: Vec<CandidateId>,
    },
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Voter(#[from] VoterError),
    #[error(transparent)]
    Population(#[from] PopulationError),
}

impl ElectionError {
    /// The pipeline ran correctly but could not decide this electorate.
    pub fn is_election_failure(&self) -> bool {
        matches!(
            self,
            Self::ElectionFailure { .. } | Self::RemovalFailure { .. }
        )
    }

    /// Winner-first ordering of the unperturbed election, when it was decided
    /// before a perturbed run failed.
    pub fn decided_ordering(&self) -> Option<&[CandidateId]> {
        match self {
            Self::RemovalFailure {
                candidate_ordering, ..
            } => Some(candidate_ordering),
            _ => None,
        }
    }

    /// The population constraints cannot be met for this configuration.
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(
            self,
            Self::Population(PopulationError::UnsatisfiableConstraints(_))
        )
    }
}

/// Election configuration: electorate size, candidate universe, pipeline and
/// population constraints.
///
/// Cloning is cheap; steps are shared. An engine must not be mutated while
/// runs that borrow it are in flight. To vary constraints across parallel
/// work, derive a new engine with [`ElectionEngine::reset_and_add`] or
/// [`ElectionEngine::with_constraints`].
#[derive(Clone)]
pub struct ElectionEngine {
    number_of_candidates: u32,
    number_of_people: usize,
    seed: u64,
    max_draws_per_voter: usize,
    steps: Vec<Arc<dyn TabulationStep>>,
    constraints: Vec<PopulationConstraint>,
}

impl Default for ElectionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_NUMBER_OF_CANDIDATES, DEFAULT_NUMBER_OF_PEOPLE)
    }
}

impl fmt::Debug for ElectionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<&str> = self.steps.iter().map(|s| s.name()).collect();
        f.debug_struct("ElectionEngine")
            .field("number_of_candidates", &self.number_of_candidates)
            .field("number_of_people", &self.number_of_people)
            .field("seed", &self.seed)
            .field("steps", &steps)
            .field("constraints", &self.constraints)
            .finish()
    }
}

impl ElectionEngine {
    pub fn new(number_of_candidates: u32, number_of_people: usize) -> Self {
        Self {
            number_of_candidates,
            number_of_people,
            seed: DEFAULT_SEED,
            max_draws_per_voter: crate::population::DEFAULT_MAX_DRAWS_PER_VOTER,
            steps: Vec::new(),
            constraints: Vec::new(),
        }
    }

    // ── Configuration ──────────────────────────────────────────────

    pub fn with_candidates(mut self, number_of_candidates: u32) -> Self {
        self.number_of_candidates = number_of_candidates;
        self
    }

    pub fn with_people(mut self, number_of_people: usize) -> Self {
        self.number_of_people = number_of_people;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_draws_per_voter(mut self, max_draws: usize) -> Self {
        self.max_draws_per_voter = max_draws;
        self
    }

    /// Append a step to the pipeline.
    pub fn add_step<S: TabulationStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Append an already shared step.
    pub fn add_shared_step(&mut self, step: Arc<dyn TabulationStep>) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Drop every configured step.
    pub fn clear_steps(&mut self) -> &mut Self {
        self.steps.clear();
        self
    }

    pub fn add_people_constraint<F>(&mut self, fraction: f64, predicate: F) -> &mut Self
    where
        F: Fn(&Voter) -> bool + Send + Sync + 'static,
    {
        self.constraints
            .push(PopulationConstraint::new(fraction, predicate));
        self
    }

    pub fn add_constraint(&mut self, constraint: PopulationConstraint) -> &mut Self {
        self.constraints.push(constraint);
        self
    }

    pub fn clear_people_constraints(&mut self) -> &mut Self {
        self.constraints.clear();
        self
    }

    /// A copy of this engine whose constraints are replaced by `constraints`.
    pub fn with_constraints(&self, constraints: Vec<PopulationConstraint>) -> Self {
        Self {
            constraints,
            ..self.clone()
        }
    }

    /// A copy of this engine whose constraints are replaced by a single one.
    pub fn reset_and_add(&self, constraint: PopulationConstraint) -> Self {
        self.with_constraints(vec![constraint])
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn number_of_candidates(&self) -> u32 {
        self.number_of_candidates
    }

    pub fn number_of_people(&self) -> usize {
        self.number_of_people
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn steps(&self) -> &[Arc<dyn TabulationStep>] {
        &self.steps
    }

    pub fn constraints(&self) -> &[PopulationConstraint] {
        &self.constraints
    }

    pub fn rng_hierarchy(&self) -> RngHierarchy {
        RngHierarchy::new(self.seed)
    }

    // ── Running ────────────────────────────────────────────────────

    /// Fail fast on configuration problems before any voters are drawn.
    pub fn validate(&self) -> Result<(), ElectionError> {
        let first = self.steps.first().ok_or(ElectionError::NoStepsConfigured)?;
        if first.requires_prior() {
            return Err(StepError::Sequencing(first.name().to_string()).into());
        }
        if self.number_of_people == 0 {
            return Err(ElectionError::EmptyElectorate);
        }
        if self.number_of_candidates == 0 {
            return Err(ElectionError::NoCandidates);
        }
        check_fractions(&self.constraints)?;
        Ok(())
    }

    /// Generate the electorate for `trial` from its own seeded RNG.
    pub fn generate_population(&self, trial: u64) -> Result<Vec<Voter>, ElectionError> {
        let generator = PopulationGenerator::new(
            self.number_of_candidates,
            self.number_of_people,
            &self.constraints,
        )?
        .with_max_draws_per_voter(self.max_draws_per_voter);
        let mut rng = self.rng_hierarchy().rng_for(POPULATION_STREAM, trial);
        Ok(generator.generate(&mut rng)?)
    }

    /// Run one election over a freshly generated electorate.
    pub fn run_single_election(&self) -> Result<SingleElectionResult, ElectionError> {
        self.validate()?;
        let voters = self.generate_population(0)?;
        self.tabulate(&voters)
    }

    /// Run the pipeline over a caller supplied electorate.
    pub fn tabulate(&self, voters: &[Voter]) -> Result<SingleElectionResult, ElectionError> {
        if self.steps.is_empty() {
            return Err(ElectionError::NoStepsConfigured);
        }
        if voters.is_empty() {
            return Err(ElectionError::EmptyElectorate);
        }

        let mut visible: BTreeSet<CandidateId> = voters.iter().flat_map(|v| v.candidates()).collect();
        let mut windowed: Option<Vec<Voter>> = None;
        let mut results: Vec<Vec<CandidateRanking>> = Vec::with_capacity(self.steps.len());

        for (round, step) in self.steps.iter().enumerate() {
            if let Some(last) = results.last() {
                let survivors = candidate_set(last);
                if survivors != visible {
                    trace!(
                        "round {round}: windowing {} -> {} candidates",
                        visible.len(),
                        survivors.len()
                    );
                    windowed = Some(voters.iter().map(|v| v.restricted_to(&survivors)).collect());
                    visible = survivors;
                }
            }
            let current = windowed.as_deref().unwrap_or(voters);

            let output = step
                .run(current, &results)?
                .ok_or_else(|| ElectionError::NullStepResult {
                    round,
                    step: step.name().to_string(),
                })?;

            match output.len() {
                0 => {
                    return Err(ElectionError::ElectionFailure {
                        round,
                        step: step.name().to_string(),
                    })
                }
                1 => {
                    debug!(
                        "round {round} ('{}') decided candidate {}",
                        step.name(),
                        output[0].candidate
                    );
                    return Ok(output);
                }
                n => trace!("round {round} ('{}') kept {n} candidates", step.name()),
            }
            results.push(output);
        }

        let mut ranking = results.pop().ok_or(ElectionError::NoStepsConfigured)?;
        sort_descending(&mut ranking);
        Ok(ranking)
    }
}
