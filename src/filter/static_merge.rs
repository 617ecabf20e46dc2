//! Static-block merge
//!
//! A native-rate (60p) clip built from interlaced video loses vertical
//! detail wherever the picture does not move. For every 8×8 block this stage
//! measures how far the interlaced source deviates over three consecutive
//! frames. Blocks that stay still in every plane are taken from the source
//! frame and lightly cleaned vertically; all other blocks keep the native
//! frame.

use crate::error::{Error, Result};
use crate::source::{ClipInfo, FrameSource};
use crate::util::{nblocks, BitDepth, Pixel, PlanarFrame, Plane};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, trace};

/// Block size in luma samples
pub const BLOCK: usize = 8;

/// Source frames on either side of the centre frame
const DIST: i64 = 1;

/// Luma value of painted blocks at 8-bit scale
const PAINT: i32 = 20;

/// Which blocks to paint instead of merging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowBlocks {
    #[default]
    None,
    Static,
    Moving,
}

/// Parameters of the static-block merge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticMergeParams {
    /// Mean per-pixel range below which a block counts as static, also the
    /// neighbour difference accepted by the vertical clean (8-bit scale)
    pub threshold: f32,
    pub show: ShowBlocks,
}

impl Default for StaticMergeParams {
    fn default() -> Self {
        StaticMergeParams {
            threshold: 2.0,
            show: ShowBlocks::None,
        }
    }
}

impl StaticMergeParams {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(Error::config(format!(
                "static_merge.threshold must be finite and non-negative: {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Per-block deviation of one source frame
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDeviation {
    nx: usize,
    ny: usize,
    values: Vec<[f32; 3]>,
}

impl BlockDeviation {
    pub fn blocks_x(&self) -> usize {
        self.nx
    }

    pub fn blocks_y(&self) -> usize {
        self.ny
    }

    /// Mean max-min range of block (bx, by) in each plane
    pub fn get(&self, bx: usize, by: usize) -> [f32; 3] {
        self.values[bx + by * self.nx]
    }

    /// Whether every plane of the block stays below `threshold`
    pub fn is_static(&self, bx: usize, by: usize, threshold: f32) -> bool {
        self.get(bx, by).iter().all(|&v| v < threshold)
    }

    pub fn static_blocks(&self, threshold: f32) -> usize {
        self.values
            .iter()
            .filter(|v| v.iter().all(|&d| d < threshold))
            .count()
    }
}

/// Mean range over `refs` of every block of every plane
pub fn block_deviation<T: Pixel>(refs: &[&PlanarFrame<T>]) -> Result<BlockDeviation> {
    let first = refs
        .first()
        .ok_or_else(|| Error::invalid_input("block deviation needs at least one frame"))?;
    for frame in &refs[1..] {
        first.ensure_same_geometry(frame)?;
    }
    let sub = first.subsampling();
    let nx = nblocks(first.width(), BLOCK);
    let ny = nblocks(first.height(), BLOCK);
    let mut values = vec![[0.0f32; 3]; nx * ny];

    for p in 0..3 {
        let planes: Vec<&Plane<T>> = refs.iter().map(|f| f.plane(p)).collect();
        let (width, height) = (planes[0].width(), planes[0].height());
        let (bw, bh) = (BLOCK >> sub.plane_log_x(p), BLOCK >> sub.plane_log_y(p));
        for by in 0..ny {
            let (y0, y1) = (by * bh, ((by + 1) * bh).min(height));
            for bx in 0..nx {
                let (x0, x1) = (bx * bw, ((bx + 1) * bw).min(width));
                let mut sum = 0i64;
                for y in y0..y1 {
                    for x in x0..x1 {
                        let (mut lo, mut hi) = (i32::MAX, i32::MIN);
                        for plane in &planes {
                            let v = plane.get(x, y).to_i32();
                            lo = lo.min(v);
                            hi = hi.max(v);
                        }
                        sum += (hi - lo) as i64;
                    }
                }
                let area = (y1.saturating_sub(y0)) * (x1.saturating_sub(x0));
                if area > 0 {
                    values[bx + by * nx][p] = sum as f32 / area as f32;
                }
            }
        }
    }
    Ok(BlockDeviation { nx, ny, values })
}

/// Binomial vertical clean of rows `y0 + 1 .. y1 - 1`, columns `x0 .. x1`
///
/// Neighbours further than `threshold` from the centre are replaced by the
/// centre before filtering.
fn vertical_clean<T: Pixel>(
    dst: &mut Plane<T>,
    src: &Plane<T>,
    (x0, x1): (usize, usize),
    (y0, y1): (usize, usize),
    threshold: f32,
) {
    for y in y0 + 1..y1.saturating_sub(1) {
        for x in x0..x1 {
            let c = src.get(x, y).to_i32();
            let near = |v: i32| if ((v - c).abs() as f32) <= threshold { v } else { c };
            let a = near(src.get(x, y - 1).to_i32());
            let b = near(src.get(x, y + 1).to_i32());
            dst.set(x, y, T::from_i32((a + 2 * c + b + 2) >> 2));
        }
    }
}

/// A merged frame and the deviation that decided it
#[derive(Debug, Clone)]
pub struct MergeOutput<T> {
    pub frame: PlanarFrame<T>,
    pub deviation: BlockDeviation,
}

/// Replaces the static blocks of a native-rate clip with its interlaced source
pub struct StaticMerge<T, N, S> {
    native: N,
    source: S,
    params: StaticMergeParams,
    threshold: f32,
    depth: BitDepth,
    _pixel: PhantomData<T>,
}

impl<T: Pixel, N: FrameSource<T>, S: FrameSource<T>> StaticMerge<T, N, S> {
    /// `native` must hold exactly two frames per `source` frame
    pub fn new(native: N, source: S, params: StaticMergeParams) -> Result<Self> {
        params.validate()?;
        let info = native.info();
        let src = source.info();
        if (src.width, src.height, src.subsampling) != (info.width, info.height, info.subsampling)
        {
            return Err(Error::config(format!(
                "[static merge]: source is {}x{}, native clip is {}x{}",
                src.width, src.height, info.width, info.height
            )));
        }
        if info.num_frames != src.num_frames * 2 {
            return Err(Error::config(format!(
                "[static merge]: native clip has {} frames, expected {}",
                info.num_frames,
                src.num_frames * 2
            )));
        }

        let depth = info.bit_depth;
        let threshold = params.threshold * (1u32 << (depth.bits() - 8)) as f32;
        info!(
            "static merge: {}x{}, {} native frames, threshold {}",
            info.width, info.height, info.num_frames, params.threshold
        );
        Ok(StaticMerge {
            native,
            source,
            params,
            threshold,
            depth,
            _pixel: PhantomData,
        })
    }

    /// Static threshold at the clip's bit depth
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Block deviation around source frame `n30`
    pub fn deviation(&self, n30: i64) -> Result<BlockDeviation> {
        let frames = (n30 - DIST..=n30 + DIST)
            .map(|n| self.source.get_frame(n))
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&PlanarFrame<T>> = frames.iter().map(|f| f.as_ref()).collect();
        block_deviation(&refs)
    }

    /// Output frame `n`
    pub fn process(&self, n: i64) -> Result<MergeOutput<T>> {
        let n30 = n.div_euclid(2);
        let deviation = self.deviation(n30)?;
        let src = self.source.get_frame(n30)?;
        let native = self.native.get_frame(n)?;

        let sub = src.subsampling();
        let paint = self.depth.scale(PAINT);
        let mut dst = (*native).clone();
        let mut merged = 0;

        for by in 0..deviation.blocks_y() {
            for bx in 0..deviation.blocks_x() {
                let still = deviation.is_static(bx, by, self.threshold);
                let painted = match self.params.show {
                    ShowBlocks::None => false,
                    ShowBlocks::Static => still,
                    ShowBlocks::Moving => !still,
                };
                if !painted && !still {
                    continue;
                }
                if still {
                    merged += 1;
                }

                for p in 0..3 {
                    let (bw, bh) = (BLOCK >> sub.plane_log_x(p), BLOCK >> sub.plane_log_y(p));
                    let from = src.plane(p);
                    let plane = dst.plane_mut(p);
                    let xs = (bx * bw, ((bx + 1) * bw).min(plane.width()));
                    let ys = (by * bh, ((by + 1) * bh).min(plane.height()));
                    if xs.0 >= xs.1 {
                        continue;
                    }
                    for y in ys.0..ys.1 {
                        let row = &mut plane.row_mut(y)[xs.0..xs.1];
                        if painted {
                            row.fill(T::from_i32(paint));
                        } else {
                            row.copy_from_slice(&from.row(y)[xs.0..xs.1]);
                        }
                    }
                    if !painted {
                        vertical_clean(plane, from, xs, ys, self.threshold);
                    }
                }
            }
        }
        trace!("static merge {}: {} static blocks", n, merged);
        Ok(MergeOutput {
            frame: dst,
            deviation,
        })
    }
}

impl<T: Pixel, N: FrameSource<T>, S: FrameSource<T>> FrameSource<T> for StaticMerge<T, N, S> {
    fn info(&self) -> ClipInfo {
        self.native.info()
    }

    fn get_frame(&self, n: i64) -> Result<Arc<PlanarFrame<T>>> {
        Ok(Arc::new(self.process(n)?.frame))
    }
}
