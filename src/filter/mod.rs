//! Frame reconstruction stages
//!
//! Each stage is a [`FrameSource`](crate::source::FrameSource) pulling from
//! the stage before it:
//!
//! ```text
//! interlaced -> Telecine -> Decomb -> FrameSwitch <- native 60p
//! interlaced -> StaticMerge <- native 60p
//! ```

pub mod combing;
pub mod decomb;
pub mod overlay;
pub mod static_merge;
pub mod switch;
pub mod telecine;
pub mod weave;

pub use combing::{CombingBlockClassifier, CombingBlockMap};
pub use decomb::{BlockMapSource, Decomb, DecombOutput, DecombParams};
pub use static_merge::{
    block_deviation, BlockDeviation, MergeOutput, ShowBlocks, StaticMerge, StaticMergeParams,
};
pub use switch::{FrameKind, FrameSwitch, SwitchOutput, SwitchParams};
pub use telecine::{telecine_frame_count, Telecine, TelecineParams};
pub use weave::{create_weave_frame, weave_fields, weave_three};
