//! 24p reconstruction
//!
//! Every output frame is woven from the field span its cycle's pattern assigns
//! to it. Each 5-frame cycle of the interlaced source yields 4 frames.

use super::weave::create_weave_frame;
use crate::cadence::analysis::{CycleSource, CYCLE_SOURCE_FRAMES};
use crate::cadence::pattern::CYCLE_FRAMES;
use crate::cadence::{Frame24Info, MatchResult, PulldownPatternCatalog};
use crate::error::Result;
use crate::source::{clamp_index, ClipInfo, FrameSource};
use crate::util::{FieldOrder, Pixel, PlanarFrame};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, trace};

/// Parameters of the telecine stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelecineParams {
    /// Log the selected pattern of every output frame
    pub show: bool,
}

/// Number of 24p frames recovered from `n` interlaced frames
pub fn telecine_frame_count(n: usize) -> usize {
    n / CYCLE_SOURCE_FRAMES * CYCLE_FRAMES + n % CYCLE_SOURCE_FRAMES
}

/// Inverse telecine driven by per-cycle match results
pub struct Telecine<'c, T, S, C> {
    source: S,
    cycles: C,
    catalog: &'c PulldownPatternCatalog,
    params: TelecineParams,
    info: ClipInfo,
    _pixel: PhantomData<T>,
}

impl<'c, T: Pixel, S: FrameSource<T>, C: CycleSource> Telecine<'c, T, S, C> {
    pub fn new(
        source: S,
        cycles: C,
        catalog: &'c PulldownPatternCatalog,
        params: TelecineParams,
    ) -> Self {
        let src = source.info();
        let info = src
            .retimed(telecine_frame_count(src.num_frames), 4, 5)
            .with_field_order(FieldOrder::TopFieldFirst);
        info!(
            "telecine: {} frames -> {} frames",
            src.num_frames, info.num_frames
        );
        Telecine {
            source,
            cycles,
            catalog,
            params,
            info,
            _pixel: PhantomData,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cycles(&self) -> &C {
        &self.cycles
    }

    /// Match result and field span of output frame `n24`
    pub fn frame_info(&self, n24: i64) -> Result<(MatchResult, Frame24Info)> {
        let result = self.cycles.cycle(n24.div_euclid(CYCLE_FRAMES as i64))?;
        let span = self.catalog.get_frame24(result.pattern, n24)?;
        Ok((result, span))
    }
}

impl<'c, T: Pixel, S: FrameSource<T>, C: CycleSource> FrameSource<T> for Telecine<'c, T, S, C> {
    fn info(&self) -> ClipInfo {
        self.info
    }

    fn get_frame(&self, n: i64) -> Result<Arc<PlanarFrame<T>>> {
        let n24 = clamp_index(n, self.info.num_frames) as i64;
        let (result, span) = self.frame_info(n24)?;
        let field_start = span.absolute_field_start();
        if self.params.show {
            info!(
                "telecine {}: {} ({:.1}) - fields {}+{}",
                n24,
                self.catalog.describe(result.pattern),
                result.cost,
                field_start,
                span.num_fields
            );
        }
        trace!(
            "telecine {}: cycle {} field {} count {}",
            n24,
            span.cycle_index,
            field_start,
            span.num_fields
        );
        create_weave_frame(&self.source, field_start, span.num_fields)
    }
}
