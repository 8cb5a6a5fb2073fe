//! Named pipeline presets for common election schemes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::engine::ElectionEngine;
use crate::steps::{build_steps, StepConfig, StepError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown preset '{0}' (expected majority, runoff or borda)")]
pub struct UnknownPreset(pub String);

/// Named pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePreset {
    /// Single plurality round; most first choices wins.
    Majority,
    /// Plurality; an outright majority wins, otherwise the top two go to a
    /// second plurality round.
    Runoff,
    /// Single Borda round.
    Borda,
}

impl PipelinePreset {
    pub const ALL: [PipelinePreset; 3] = [Self::Majority, Self::Runoff, Self::Borda];

    pub fn name(self) -> &'static str {
        match self {
            Self::Majority => "majority",
            Self::Runoff => "runoff",
            Self::Borda => "borda",
        }
    }

    pub fn steps(self) -> Vec<StepConfig> {
        match self {
            Self::Majority => vec![StepConfig::Plurality],
            Self::Runoff => vec![
                StepConfig::Plurality,
                StepConfig::KeepAboveFraction {
                    min_fraction: 0.5,
                    on_empty_keep_all: true,
                },
                StepConfig::KeepBestN { n: 2 },
                StepConfig::Plurality,
            ],
            Self::Borda => vec![StepConfig::Borda],
        }
    }
}

impl fmt::Display for PipelinePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PipelinePreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

impl ElectionEngine {
    /// Append every step of `preset`.
    pub fn add_preset(&mut self, preset: PipelinePreset) -> Result<&mut Self, StepError> {
        for step in build_steps(&preset.steps())? {
            self.add_shared_step(step);
        }
        Ok(self)
    }
}
