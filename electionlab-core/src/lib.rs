//! ElectionLab Core: voters, tabulation steps and the election engine.
//!
//! This crate contains:
//! - Voters with dense, strictly ordered candidate preferences
//! - Tabulation steps (plurality, Borda, keep-best-N, keep-above-fraction)
//! - The election engine with per-round candidate windowing
//! - Population generation under proportional constraints
//! - Leave-one-out flip analysis
//! - Named pipeline presets
//! - A deterministic per-trial RNG hierarchy

pub mod engine;
pub mod population;
pub mod presets;
pub mod ranking;
pub mod rng;
pub mod sensitivity;
pub mod steps;
pub mod voter;

pub use engine::{ElectionEngine, ElectionError, SingleElectionResult};
pub use population::{PopulationConstraint, PopulationError, PopulationGenerator, VoterPredicate};
pub use presets::{PipelinePreset, UnknownPreset};
pub use ranking::{CandidateId, CandidateRanking};
pub use sensitivity::FlipResult;
pub use steps::{StepConfig, StepError, StepFn, TabulationStep};
pub use voter::{Voter, VoterError};
