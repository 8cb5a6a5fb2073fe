//! Serializable simulation configuration, loaded from TOML.
//!
//! ```toml
//! preset = "runoff"
//!
//! [election]
//! candidates = 5
//! people = 200
//! seed = 7
//!
//! [[constraints]]
//! fraction = 0.2
//! predicate = { type = "RANKS_LAST", candidate = 0 }
//!
//! [ensemble]
//! trials = 500
//! failure_policy = "skip"
//!
//! [trend]
//! points = 10
//! trials_per_point = 50
//! max_fraction = 1.0
//! predicate = { type = "RANKS_FIRST", candidate = 0 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use electionlab_core::engine::{
    DEFAULT_NUMBER_OF_CANDIDATES, DEFAULT_NUMBER_OF_PEOPLE, DEFAULT_SEED,
};
use electionlab_core::population::DEFAULT_MAX_DRAWS_PER_VOTER;
use electionlab_core::steps::build_steps;
use electionlab_core::{
    ElectionEngine, PipelinePreset, PopulationConstraint, StepConfig, StepError, VoterPredicate,
};

use crate::ensemble::{EnsembleAggregator, EnsembleConfig};

/// Unique identifier for a simulation configuration (content-addressable hash).
pub type ConfigId = String;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Validation(String),
    #[error("invalid step: {0}")]
    Step(#[from] StepError),
    #[error("failed to hash config: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ─── Sections ────────────────────────────────────────────────────────

/// `[election]`: electorate and candidate universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionSection {
    pub candidates: u32,
    pub people: usize,
    pub seed: u64,
    pub max_draws_per_voter: usize,
}

impl Default for ElectionSection {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_NUMBER_OF_CANDIDATES,
            people: DEFAULT_NUMBER_OF_PEOPLE,
            seed: DEFAULT_SEED,
            max_draws_per_voter: DEFAULT_MAX_DRAWS_PER_VOTER,
        }
    }
}

/// `[[constraints]]`: a fraction of voters that must match a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintConfig {
    pub fraction: f64,
    pub predicate: VoterPredicate,
}

impl ConstraintConfig {
    pub fn to_constraint(&self) -> PopulationConstraint {
        PopulationConstraint::from_predicate(self.fraction, self.predicate.clone())
    }
}

/// `[trend]`: linear sweep of one predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    pub points: usize,
    pub trials_per_point: usize,
    #[serde(default = "default_max_fraction")]
    pub max_fraction: f64,
    pub predicate: VoterPredicate,
}

fn default_max_fraction() -> f64 {
    1.0
}

// ─── Top-level config ────────────────────────────────────────────────

/// Everything needed to reproduce a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub election: ElectionSection,

    /// Named pipeline; mutually exclusive with `steps`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<PipelinePreset>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintConfig>,

    #[serde(default)]
    pub ensemble: EnsembleConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendConfig>,
}

impl SimulationConfig {
    /// Config for a named preset with default sizes.
    pub fn from_preset(preset: PipelinePreset) -> Self {
        Self {
            election: ElectionSection::default(),
            preset: Some(preset),
            steps: Vec::new(),
            constraints: Vec::new(),
            ensemble: EnsembleConfig::default(),
            trend: None,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// The pipeline this config describes.
    pub fn step_configs(&self) -> Vec<StepConfig> {
        match self.preset {
            Some(preset) => preset.steps(),
            None => self.steps.clone(),
        }
    }

    /// Reject configurations that cannot run, before any voters are drawn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        if self.election.candidates == 0 {
            return invalid("election.candidates must be at least 1".into());
        }
        if self.election.people == 0 {
            return invalid("election.people must be at least 1".into());
        }
        if self.election.max_draws_per_voter == 0 {
            return invalid("election.max_draws_per_voter must be at least 1".into());
        }

        match (self.preset, self.steps.is_empty()) {
            (Some(_), false) => return invalid("set either 'preset' or '[[steps]]', not both".into()),
            (None, true) => return invalid("no pipeline: set 'preset' or add '[[steps]]'".into()),
            _ => {}
        }
        let steps = self.step_configs();
        if let Some(first) = steps.first().filter(|s| s.needs_prior()) {
            return invalid(format!("{first:?} needs prior results and cannot be the first step"));
        }
        build_steps(&steps)?;

        for (i, c) in self.constraints.iter().enumerate() {
            if !(0.0..=1.0).contains(&c.fraction) {
                return invalid(format!("constraints[{i}].fraction {} is outside [0, 1]", c.fraction));
            }
        }

        if self.ensemble.trials == 0 {
            return invalid("ensemble.trials must be at least 1".into());
        }

        if let Some(trend) = &self.trend {
            if trend.points == 0 {
                return invalid("trend.points must be at least 1".into());
            }
            if trend.trials_per_point == 0 {
                return invalid("trend.trials_per_point must be at least 1".into());
            }
            if !(0.0..=1.0).contains(&trend.max_fraction) {
                return invalid(format!("trend.max_fraction {} is outside [0, 1]", trend.max_fraction));
            }
        }
        Ok(())
    }

    /// Deterministic hash of the canonical JSON form. Identical configs share
    /// an id, so exported artifacts can be matched to the run that made them.
    pub fn config_id(&self) -> Result<ConfigId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Engine with sizes, seed, pipeline and constraints applied.
    pub fn build_engine(&self) -> Result<ElectionEngine, ConfigError> {
        let mut engine = ElectionEngine::new(self.election.candidates, self.election.people)
            .with_seed(self.election.seed)
            .with_max_draws_per_voter(self.election.max_draws_per_voter);
        for step in build_steps(&self.step_configs())? {
            engine.add_shared_step(step);
        }
        for constraint in &self.constraints {
            engine.add_constraint(constraint.to_constraint());
        }
        Ok(engine)
    }

    pub fn aggregator(&self) -> EnsembleAggregator {
        EnsembleAggregator::new(self.ensemble.clone())
    }
}
