//! Per-pixel field comparison
//!
//! Two consecutive interlaced frames are compared field against field. Every
//! pixel of every analysed row receives a flag byte:
//!
//! - [`MOTION`]: the pixel changed by more than the motion threshold between
//!   this field and the next field of the same parity
//! - [`SMALL_COMB`] / [`LARGE_COMB`]: the vertical contrast operator
//!   `a + 4c + e - 3(b + d)` over the line and its neighbours from the opposite
//!   field exceeds the comb thresholds
//!
//! Chroma flags are OR-merged into the luma flag plane shifted into the high
//! nibble, so a single luma-sized plane carries the state of all three planes.

use crate::error::Result;
use crate::util::{BitDepth, FieldOrder, PlanarFrame, Pixel, Plane};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Rows excluded at the top and bottom (luma units)
pub const BORDER: usize = 4;

/// Pixel moved between same-parity fields
pub const MOTION: u8 = 1;
/// Small vertical comb
pub const SMALL_COMB: u8 = 2;
/// Large vertical comb
pub const LARGE_COMB: u8 = 4;
/// Shift applied to chroma flags merged into the luma plane
pub const CHROMA_SHIFT: u32 = 4;

const SMALL_COMB_SCALE: i32 = 6;
const LARGE_COMB_SCALE: i32 = 18;

/// Motion and comb thresholds at 8-bit scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagThresholds {
    /// Luma motion threshold
    pub motion_luma: i32,
    /// Luma comb threshold (before scaling)
    pub comb_luma: i32,
    /// Chroma motion threshold
    pub motion_chroma: i32,
    /// Chroma comb threshold (before scaling)
    pub comb_chroma: i32,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        FlagThresholds {
            motion_luma: 15,
            comb_luma: 7,
            motion_chroma: 20,
            comb_chroma: 8,
        }
    }
}

/// Effective thresholds for one plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneThresholds {
    pub motion: i32,
    pub comb: i32,
    pub large_comb: i32,
}

impl FlagThresholds {
    /// Scale to the operator's range and the stream's bit depth
    pub fn for_plane(&self, plane: usize, depth: BitDepth) -> PlaneThresholds {
        let (motion, comb) = if plane == 0 {
            (self.motion_luma, self.comb_luma)
        } else {
            (self.motion_chroma, self.comb_chroma)
        };
        PlaneThresholds {
            motion: depth.scale(motion),
            comb: depth.scale(comb * SMALL_COMB_SCALE),
            large_comb: depth.scale(comb * LARGE_COMB_SCALE),
        }
    }
}

/// Flag counts of one field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCount {
    pub motion: i32,
    pub comb: i32,
    pub large_comb: i32,
}

/// 5-tap vertical comb operator
#[inline(always)]
pub fn comb_value(a: i32, b: i32, c: i32, d: i32, e: i32) -> i32 {
    a + 4 * c + e - 3 * (b + d)
}

/// Compares the fields of consecutive frames
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldFlagAnalyzer {
    thresholds: FlagThresholds,
    depth: BitDepth,
}

impl FieldFlagAnalyzer {
    pub fn new(thresholds: FlagThresholds, depth: BitDepth) -> Self {
        FieldFlagAnalyzer { thresholds, depth }
    }

    pub fn thresholds(&self) -> &FlagThresholds {
        &self.thresholds
    }

    /// Flag plane for the pair `(f0, f1)` with chroma merged into luma
    ///
    /// `f0` supplies the lines under test. Each field is compared against the
    /// field that follows it in time: the first field of `f0` against the
    /// opposite lines of `f0`, the second field against the opposite lines of
    /// `f1`. Motion always compares `f0` with `f1`.
    pub fn flag_frame<T: Pixel>(
        &self,
        f0: &PlanarFrame<T>,
        f1: &PlanarFrame<T>,
        order: FieldOrder,
    ) -> Result<Plane<u8>> {
        f0.ensure_same_geometry(f1)?;
        let sub = f0.subsampling();

        let mut planes: [Plane<u8>; 3] = std::array::from_fn(|p| {
            Plane::new(f0.plane(p).width(), f0.plane(p).height())
        });
        for (p, flags) in planes.iter_mut().enumerate() {
            let border = BORDER >> sub.plane_log_y(p);
            let th = self.thresholds.for_plane(p, self.depth);
            compare_fields(flags, f0.plane(p), f1.plane(p), border, th, order);
        }

        let [mut luma, u, v] = planes;
        merge_chroma_flags(&mut luma, &u, &v, sub.log_x, sub.log_y);
        Ok(luma)
    }

    /// Flag counts of both fields of frame `n`, in temporal order
    ///
    /// `f0` is frame `n` and `f1` frame `n + 1`. The first returned count
    /// describes the first field of `f0`.
    pub fn field_counts<T: Pixel>(
        &self,
        f0: &PlanarFrame<T>,
        f1: &PlanarFrame<T>,
        order: FieldOrder,
    ) -> Result<[FieldCount; 2]> {
        let flags = self.flag_frame(f0, f1, order)?;
        let mut counts = [count_flags(&flags, 0), count_flags(&flags, 1)];
        if order == FieldOrder::BottomFieldFirst {
            counts.swap(0, 1);
        }
        trace!(
            "field counts: {:?} / {:?} ({:?})",
            counts[0],
            counts[1],
            order
        );
        Ok(counts)
    }
}

fn compare_fields<T: Pixel>(
    flags: &mut Plane<u8>,
    f0: &Plane<T>,
    f1: &Plane<T>,
    border: usize,
    th: PlaneThresholds,
    order: FieldOrder,
) {
    let width = f0.width();
    let height = f0.height();
    let rows = height.saturating_sub(border * 2) / 2;

    for parity in 0..2 {
        let opposite = if parity == order.first_field_parity() {
            f0
        } else {
            f1
        };
        for j in 0..rows {
            let y = border + parity + 2 * j;
            let (ra, rc, re) = (f0.row(y - 2), f0.row(y), f0.row(y + 2));
            let (rb, rd) = (opposite.row(y - 1), opposite.row(y + 1));
            let rm = f1.row(y);
            let out = flags.row_mut(y);
            for x in 0..width {
                let c = rc[x].to_i32();
                let t = comb_value(
                    ra[x].to_i32(),
                    rb[x].to_i32(),
                    c,
                    rd[x].to_i32(),
                    re[x].to_i32(),
                );
                let mut flag = 0;
                if t > th.comb {
                    flag |= SMALL_COMB;
                }
                if t > th.large_comb {
                    flag |= LARGE_COMB;
                }
                if (rm[x].to_i32() - c).abs() > th.motion {
                    flag |= MOTION;
                }
                out[x] = flag;
            }
        }
    }
}

fn merge_chroma_flags(luma: &mut Plane<u8>, u: &Plane<u8>, v: &Plane<u8>, log_x: u32, log_y: u32) {
    let width = luma.width();
    let height = luma.height();
    for y in BORDER..height.saturating_sub(BORDER) {
        let (ru, rv) = (u.row(y >> log_y), v.row(y >> log_y));
        let out = luma.row_mut(y);
        for x in 0..width {
            let xc = x >> log_x;
            out[x] |= (ru[xc] | rv[xc]) << CHROMA_SHIFT;
        }
    }
}

/// Count the luma flags of the rows of one parity
pub fn count_flags(flags: &Plane<u8>, parity: usize) -> FieldCount {
    let rows = flags.height().saturating_sub(BORDER * 2) / 2;
    let mut cnt = FieldCount::default();
    for j in 0..rows {
        for &flag in flags.row(BORDER + parity + 2 * j) {
            if flag & MOTION != 0 {
                cnt.motion += 1;
            }
            if flag & SMALL_COMB != 0 {
                cnt.comb += 1;
            }
            if flag & LARGE_COMB != 0 {
                cnt.large_comb += 1;
            }
        }
    }
    cnt
}
