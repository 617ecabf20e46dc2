//! Pipeline configuration
//!
//! Every stage takes a small parameter struct with documented defaults.
//! [`PipelineConfig`] gathers them so the CLI can load one JSON file; any
//! missing field keeps its default.

use crate::cadence::{FeatureParams, FlagThresholds, MatcherParams};
use crate::error::{Error, Result};
use crate::filter::{DecombParams, StaticMergeParams, SwitchParams, TelecineParams};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of field and cycle analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub flags: FlagThresholds,
    pub features: FeatureParams,
    pub matcher: MatcherParams,
}

/// All tunables of the inverse telecine pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub analysis: AnalysisConfig,
    pub telecine: TelecineParams,
    pub decomb: DecombParams,
    pub switch: SwitchParams,
    pub static_merge: StaticMergeParams,
}

impl PipelineConfig {
    /// Parse from a JSON string and validate
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file and validate
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Pretty JSON of the full configuration
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let flags = &self.analysis.flags;
        for (name, value) in [
            ("motion_luma", flags.motion_luma),
            ("comb_luma", flags.comb_luma),
            ("motion_chroma", flags.motion_chroma),
            ("comb_chroma", flags.comb_chroma),
        ] {
            if value < 0 {
                return Err(Error::config(format!("{} must not be negative: {}", name, value)));
            }
        }

        let features = &self.analysis.features;
        for (name, value) in [
            ("large_comb_weight", features.large_comb_weight),
            ("neighbor_threshold", features.neighbor_threshold),
            ("baseline_ratio", features.baseline_ratio),
            ("matcher.cost_threshold", self.analysis.matcher.cost_threshold),
            ("switch.cost_threshold", self.switch.cost_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::config(format!(
                    "{} must be finite and non-negative: {}",
                    name, value
                )));
            }
        }
        if features.baseline_ratio <= 0.0 {
            return Err(Error::config("baseline_ratio must be positive"));
        }

        self.decomb.validate()?;
        self.static_merge.validate()
    }
}
