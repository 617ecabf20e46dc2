//! Adaptive 24p / 60p frame selection
//!
//! For every native-rate frame the selector decides between the native frame,
//! the reconstructed 24p frame covering the same instant, or a per-tile blend
//! of the two where the 24p frame still shows combing.

use super::combing::{CombingBlockMap, OVERLAP};
use super::decomb::BlockMapSource;
use super::telecine::telecine_frame_count;
use crate::cadence::analysis::CycleSource;
use crate::cadence::pattern::{CYCLE_FIELDS, CYCLE_FRAMES};
use crate::cadence::PulldownPatternCatalog;
use crate::error::{Error, Result};
use crate::source::{ClipInfo, FrameSource};
use crate::util::{Pixel, PlanarFrame};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, trace, warn};

/// Parameters of the frame selector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchParams {
    /// Cycles whose match cost exceeds this are treated as native video
    pub cost_threshold: f32,
    /// Log the decision for every output frame
    pub show: bool,
}

impl Default for SwitchParams {
    fn default() -> Self {
        SwitchParams {
            cost_threshold: 0.3,
            show: false,
        }
    }
}

/// Where an output frame came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Native,
    Film,
    Blended,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::Native => "60p",
            FrameKind::Film => "24p",
            FrameKind::Blended => "24p+60p",
        };
        write!(f, "{}", name)
    }
}

/// A selected frame
#[derive(Debug, Clone)]
pub struct SwitchOutput<T> {
    pub frame: Arc<PlanarFrame<T>>,
    pub kind: FrameKind,
    /// 24p frame used, if any
    pub film_frame: Option<i64>,
}

/// Copy of `film` with every dirty tile taken from `native`
pub fn merge_blocks<T: Pixel>(
    film: &PlanarFrame<T>,
    native: &PlanarFrame<T>,
    map: &CombingBlockMap,
) -> Result<PlanarFrame<T>> {
    film.ensure_same_geometry(native)?;
    let sub = film.subsampling();
    let mut dst = film.clone();
    for (bx, by) in map.iter_dirty() {
        for p in 0..3 {
            let (tw, th) = (OVERLAP >> sub.plane_log_x(p), OVERLAP >> sub.plane_log_y(p));
            let src = native.plane(p);
            let plane = dst.plane_mut(p);
            let x0 = bx * tw;
            let x1 = (x0 + tw).min(plane.width());
            for y in by * th..((by + 1) * th).min(plane.height()) {
                if x0 < x1 {
                    plane.row_mut(y)[x0..x1].copy_from_slice(&src.row(y)[x0..x1]);
                }
            }
        }
    }
    Ok(dst)
}

/// Chooses between native frames and reconstructed 24p frames
pub struct FrameSwitch<'c, T, N, F, C> {
    native: N,
    film: F,
    cycles: C,
    catalog: &'c PulldownPatternCatalog,
    params: SwitchParams,
    _pixel: PhantomData<T>,
}

impl<'c, T, N, F, C> FrameSwitch<'c, T, N, F, C>
where
    T: Pixel,
    N: FrameSource<T>,
    F: BlockMapSource<T>,
    C: CycleSource,
{
    /// `native` runs at field rate; `film` holds the 24p frames recovered
    /// from the same content
    pub fn new(
        native: N,
        film: F,
        cycles: C,
        catalog: &'c PulldownPatternCatalog,
        params: SwitchParams,
    ) -> Result<Self> {
        let info = native.info();
        info.ensure_aligned(OVERLAP, "switch")?;

        let film_info = film.info();
        if (film_info.width, film_info.height, film_info.subsampling)
            != (info.width, info.height, info.subsampling)
        {
            return Err(Error::config(format!(
                "[switch]: film clip is {}x{}, native clip is {}x{}",
                film_info.width, film_info.height, info.width, info.height
            )));
        }
        let expected = telecine_frame_count(info.num_frames / 2);
        if film_info.num_frames != expected {
            return Err(Error::config(format!(
                "[switch]: film clip has {} frames, expected {} for {} native frames",
                film_info.num_frames, expected, info.num_frames
            )));
        }

        info!(
            "switch: {} native frames, {} film frames, cost threshold {}",
            info.num_frames, film_info.num_frames, params.cost_threshold
        );
        Ok(FrameSwitch {
            native,
            film,
            cycles,
            catalog,
            params,
            _pixel: PhantomData,
        })
    }

    /// 24p frame covering native frame `n60`, or `None` when the cycle is
    /// not film
    pub fn film_frame(&self, n60: i64) -> Result<Option<i64>> {
        let cycle = n60.div_euclid(CYCLE_FIELDS as i64);
        let result = self.cycles.cycle(cycle)?;
        if result.cost > self.params.cost_threshold {
            if n60.rem_euclid(CYCLE_FIELDS as i64) == 0 {
                warn!(
                    "switch: cycle {} cost {:.3} above {}, using native frames",
                    cycle, result.cost, self.params.cost_threshold
                );
            }
            return Ok(None);
        }

        let span = self.catalog.get_frame60(result.pattern, n60)?;
        let base = span.cycle_index * CYCLE_FRAMES as i64;
        let n24 = if span.frame_index < 0 {
            base - 1
        } else if span.frame_index >= CYCLE_FRAMES as i32 {
            // the next cycle decides whether its first frame starts here
            let next = self.cycles.cycle(cycle + 1)?;
            let head = self.catalog.get_frame24(next.pattern, 0)?;
            if head.field_start > 0 {
                base + CYCLE_FRAMES as i64 - 1
            } else {
                base + CYCLE_FRAMES as i64
            }
        } else {
            span.frame24()
        };
        Ok(Some(n24))
    }

    /// Select output frame `n60`
    pub fn select(&self, n60: i64) -> Result<SwitchOutput<T>> {
        let (frame, kind, film_frame) = match self.film_frame(n60)? {
            None => (self.native.get_frame(n60)?, FrameKind::Native, None),
            Some(n24) => {
                let film = self.film.get_with_blocks(n24)?;
                if film.blocks.is_clean() {
                    (film.frame, FrameKind::Film, Some(n24))
                } else {
                    let native = self.native.get_frame(n60)?;
                    let merged = merge_blocks(&film.frame, &native, &film.blocks)?;
                    (Arc::new(merged), FrameKind::Blended, Some(n24))
                }
            }
        };

        if self.params.show {
            let result = self.cycles.cycle(n60.div_euclid(CYCLE_FIELDS as i64))?;
            info!(
                "switch {}: {} pattern {:2} cost {:.1}",
                n60, kind, result.pattern, result.cost
            );
        }
        trace!("switch {}: {:?} from {:?}", n60, kind, film_frame);
        Ok(SwitchOutput {
            frame,
            kind,
            film_frame,
        })
    }
}

impl<'c, T, N, F, C> FrameSource<T> for FrameSwitch<'c, T, N, F, C>
where
    T: Pixel,
    N: FrameSource<T>,
    F: BlockMapSource<T>,
    C: CycleSource,
{
    fn info(&self) -> ClipInfo {
        self.native.info()
    }

    fn get_frame(&self, n: i64) -> Result<Arc<PlanarFrame<T>>> {
        Ok(self.select(n)?.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::{catalog, CadenceTrack, MatchResult};
    use crate::filter::decomb::{DecombParams, Decomb};
    use crate::source::MemoryClip;
    use crate::util::Subsampling;

    fn flat(v: u8) -> PlanarFrame<u8> {
        PlanarFrame::filled(32, 32, Subsampling::YUV420, [v, 128, 128])
    }

    fn striped(v: u8) -> PlanarFrame<u8> {
        let mut frame = flat(v);
        for y in (1..32).step_by(2) {
            frame.plane_mut(0).row_mut(y)[16..24].fill(v + 60);
        }
        frame
    }

    fn track(entries: &[(usize, f32)]) -> CadenceTrack {
        CadenceTrack::new(
            entries
                .iter()
                .map(|&(pattern, cost)| MatchResult {
                    pattern,
                    cost,
                    score: 0.0,
                })
                .collect(),
        )
    }

    fn switch(
        cycles: CadenceTrack,
    ) -> FrameSwitch<'static, u8, MemoryClip<u8>, Decomb<u8, MemoryClip<u8>>, CadenceTrack> {
        let native = MemoryClip::new((0..20).map(|n| flat(200 + n as u8)).collect()).unwrap();
        let film = (0..8)
            .map(|k| if k == 2 { striped(100) } else { flat(k as u8 * 10) })
            .collect();
        let film = Decomb::new(MemoryClip::new(film).unwrap(), DecombParams::default()).unwrap();
        FrameSwitch::new(native, film, cycles, catalog(), SwitchParams::default()).unwrap()
    }

    #[test]
    fn test_film_frame_mapping() {
        let sw = switch(track(&[(1, 0.0), (4, 0.0)]));
        assert_eq!(sw.film_frame(0).unwrap(), Some(0));
        assert_eq!(sw.film_frame(6).unwrap(), Some(3));
        // 2-3-2-3 phase 1 ends with the head of a frame the next cycle
        // (phase 4) starts late, so it stays in this cycle
        assert_eq!(sw.film_frame(9).unwrap(), Some(3));
        // phase 4 opens with the tail of the previous cycle
        assert_eq!(sw.film_frame(10).unwrap(), Some(3));
        assert_eq!(sw.film_frame(11).unwrap(), Some(4));

        let sw = switch(track(&[(1, 0.0), (1, 0.0)]));
        assert_eq!(sw.film_frame(9).unwrap(), Some(4));
    }

    #[test]
    fn test_clean_map_returns_film() {
        let sw = switch(track(&[(1, 0.0), (4, 0.0)]));
        let out = sw.select(11).unwrap();
        assert_eq!(out.kind, FrameKind::Film);
        assert_eq!(out.frame.plane(0).get(0, 0), 40);
    }

    #[test]
    fn test_high_cost_returns_native() {
        let sw = switch(track(&[(1, 0.0), (4, 0.5)]));
        let out = sw.select(12).unwrap();
        assert_eq!(out.kind, FrameKind::Native);
        assert_eq!(out.film_frame, None);
        assert_eq!(out.frame.plane(0).get(0, 0), 212);
    }

    #[test]
    fn test_dirty_tiles_blended() {
        let sw = switch(track(&[(1, 0.0), (4, 0.0)]));
        let out = sw.select(4).unwrap();
        assert_eq!(out.kind, FrameKind::Blended);
        assert_eq!(out.film_frame, Some(2));
        let luma = out.frame.plane(0);
        assert_eq!(luma.get(0, 0), 100);
        assert_eq!(luma.get(20, 1), 160);
        assert_eq!(luma.get(8, 8), 204);
        assert_eq!(luma.get(31, 31), 204);
        assert_eq!(luma.get(7, 8), 100);
    }

    #[test]
    fn test_rejects_mismatched_clips() {
        let native = MemoryClip::new((0..20).map(|_| flat(0)).collect()).unwrap();
        let film = MemoryClip::new((0..7).map(|_| flat(0)).collect()).unwrap();
        let film = Decomb::new(film, DecombParams::default()).unwrap();
        let result = FrameSwitch::new(native, film, track(&[(0, 0.0)]), catalog(), SwitchParams::default());
        assert!(matches!(result, Err(Error::Config(_))));

        let odd = PlanarFrame::filled(36, 32, Subsampling::YUV420, [0u8, 128, 128]);
        let native = MemoryClip::new(vec![odd; 20]).unwrap();
        let film = MemoryClip::new((0..8).map(|_| flat(0)).collect()).unwrap();
        let film = Decomb::new(film, DecombParams::default()).unwrap();
        let result = FrameSwitch::new(native, film, track(&[(0, 0.0)]), catalog(), SwitchParams::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
