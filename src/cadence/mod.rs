//! Pulldown cadence detection
//!
//! - `flags`: per-pixel motion and comb flags between consecutive fields
//! - `features`: per-cycle feature windows built from field flag counts
//! - `pattern`: pulldown pattern tables and the global catalog
//! - `mapper`: 24p frame / 60-field index mapping over a pattern window
//! - `matcher`: cadence matching strategies
//! - `analysis`: frame and cycle analysis stages, binary analysis records

pub mod analysis;
pub mod features;
pub mod flags;
pub mod mapper;
pub mod matcher;
pub mod pattern;

pub use analysis::{CadenceTrack, CycleAnalyzer, CycleSource, FieldAnalysis};
pub use features::{CadenceFeatureBuilder, CadenceFeatures, FeatureParams};
pub use flags::{FieldCount, FieldFlagAnalyzer, FlagThresholds};
pub use mapper::Frame24Info;
pub use matcher::{CadenceMatcher, MatchResult, MatchStrategy, MatcherParams};
pub use pattern::{catalog, PatternField, PulldownPattern, PulldownPatternCatalog};
