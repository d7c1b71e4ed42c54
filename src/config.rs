//! Runtime configuration for the pipeline: dialect, strictness, and
//! tracker starting state, loadable from TOML.

use std::fs::File;
use std::io::{BufRead, Read, Seek};

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::GcodeError;
use crate::instruction_set::InstructionSet;
use crate::stream::StreamProcessor;
use crate::track::{SpeedTracker, TrackConfig};

/// Everything needed to assemble a processor: which dialect to clean
/// against, whether rejections abort, and how the trackers start out.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub dialect: Dialect,

    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub track: TrackConfig,
}

impl Config {
    /// Load and validate a TOML configuration file.
    pub fn load(path: &str) -> Result<Self, GcodeError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let config = Self::parse_toml(&contents)?;
        tracing::info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn parse_toml(contents: &str) -> Result<Self, GcodeError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GcodeError> {
        if !self.track.inch_factor.is_finite() || self.track.inch_factor <= 0.0 {
            return Err(GcodeError::Config(
                "inch_factor must be a positive number".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the instruction set this configuration selects.
    pub fn instruction_set(&self) -> Result<InstructionSet, GcodeError> {
        self.dialect.instruction_set(self.strict)
    }

    /// Build the full distance/size/speed tracker stack.
    pub fn tracker(&self) -> SpeedTracker {
        SpeedTracker::new(self.track)
    }

    /// Build a processor over `source`, ready to run.
    pub fn processor<R: BufRead + Seek>(
        &self,
        source: R,
    ) -> Result<StreamProcessor<R, SpeedTracker>, GcodeError> {
        Ok(
            StreamProcessor::new(self.instruction_set()?, source, self.tracker())
                .strict(self.strict),
        )
    }
}
