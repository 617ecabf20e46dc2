//! Frame sources
//!
//! Every stage pulls frames by index from a [`FrameSource`]. Sources clamp
//! out-of-range indices to the first or last frame, so a stage may ask for
//! `n - 2` or `n + 6` near either end of a clip without special cases.
//! Fetches are not memoized: the same frame may be requested many times by
//! overlapping cycle windows.

use crate::error::{Error, Result};
use crate::util::{BitDepth, FieldOrder, PlanarFrame, Pixel, Subsampling};
use std::sync::Arc;

/// Geometry and timing of a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipInfo {
    /// Luma width
    pub width: usize,
    /// Luma height
    pub height: usize,
    /// Chroma subsampling
    pub subsampling: Subsampling,
    /// Significant bits per sample
    pub bit_depth: BitDepth,
    /// Number of frames
    pub num_frames: usize,
    /// Field order of interlaced content
    pub field_order: FieldOrder,
    /// Frame rate numerator
    pub fps_num: u64,
    /// Frame rate denominator
    pub fps_den: u64,
}

impl ClipInfo {
    /// Create clip info with a 30000/1001 rate and top field first order
    pub fn new(width: usize, height: usize, subsampling: Subsampling, num_frames: usize) -> Self {
        ClipInfo {
            width,
            height,
            subsampling,
            bit_depth: BitDepth::EIGHT,
            num_frames,
            field_order: FieldOrder::TopFieldFirst,
            fps_num: 30000,
            fps_den: 1001,
        }
    }

    /// Builder: set bit depth
    pub fn with_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    /// Builder: set field order
    pub fn with_field_order(mut self, field_order: FieldOrder) -> Self {
        self.field_order = field_order;
        self
    }

    /// Builder: set frame rate
    pub fn with_frame_rate(mut self, num: u64, den: u64) -> Self {
        self.fps_num = num;
        self.fps_den = den;
        self
    }

    /// Same clip with a different frame count and rate scaled by `mul / div`
    pub fn retimed(mut self, num_frames: usize, mul: u64, div: u64) -> Self {
        self.num_frames = num_frames;
        self.fps_num *= mul;
        self.fps_den *= div;
        self
    }

    /// Fail with `Config` unless both dimensions are multiples of `align`
    pub fn ensure_aligned(&self, align: usize, stage: &str) -> Result<()> {
        if self.width % align != 0 {
            return Err(Error::config(format!(
                "[{}]: width must be multiple of {}",
                stage, align
            )));
        }
        if self.height % align != 0 {
            return Err(Error::config(format!(
                "[{}]: height must be multiple of {}",
                stage, align
            )));
        }
        Ok(())
    }
}

/// Clamp a possibly out-of-range frame index into `0..count`
#[inline]
pub fn clamp_index(n: i64, count: usize) -> usize {
    if count == 0 || n <= 0 {
        0
    } else {
        (n as u64).min(count as u64 - 1) as usize
    }
}

/// Pull interface to a clip of planar frames
pub trait FrameSource<T: Pixel>: Send + Sync {
    /// Clip geometry
    fn info(&self) -> ClipInfo;

    /// Fetch frame `n`, clamping out-of-range indices
    fn get_frame(&self, n: i64) -> Result<Arc<PlanarFrame<T>>>;

    /// Field order of frame `n`
    fn field_order(&self, _n: i64) -> FieldOrder {
        self.info().field_order
    }

    /// Number of frames
    fn num_frames(&self) -> usize {
        self.info().num_frames
    }
}

impl<T: Pixel, S: FrameSource<T> + ?Sized> FrameSource<T> for Arc<S> {
    fn info(&self) -> ClipInfo {
        (**self).info()
    }

    fn get_frame(&self, n: i64) -> Result<Arc<PlanarFrame<T>>> {
        (**self).get_frame(n)
    }

    fn field_order(&self, n: i64) -> FieldOrder {
        (**self).field_order(n)
    }
}

/// A clip held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryClip<T> {
    info: ClipInfo,
    frames: Vec<Arc<PlanarFrame<T>>>,
}

impl<T: Pixel> MemoryClip<T> {
    /// Wrap a list of frames sharing one geometry
    pub fn new(frames: Vec<PlanarFrame<T>>) -> Result<Self> {
        let first = frames
            .first()
            .ok_or_else(|| Error::invalid_input("clip has no frames"))?;
        let info = ClipInfo::new(
            first.width(),
            first.height(),
            first.subsampling(),
            frames.len(),
        );
        for frame in &frames[1..] {
            first.ensure_same_geometry(frame)?;
        }
        let bit_depth = if T::STORAGE_BITS > 8 {
            BitDepth::SIXTEEN
        } else {
            BitDepth::EIGHT
        };
        Ok(MemoryClip {
            info: info.with_bit_depth(bit_depth),
            frames: frames.into_iter().map(Arc::new).collect(),
        })
    }

    /// Builder: set field order
    pub fn with_field_order(mut self, field_order: FieldOrder) -> Self {
        self.info.field_order = field_order;
        self
    }

    /// Builder: set significant bits per sample
    pub fn with_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.info.bit_depth = bit_depth;
        self
    }

    /// Builder: set frame rate
    pub fn with_frame_rate(mut self, num: u64, den: u64) -> Self {
        self.info = self.info.with_frame_rate(num, den);
        self
    }

    /// Frames in order
    pub fn frames(&self) -> &[Arc<PlanarFrame<T>>] {
        &self.frames
    }

    /// Collect every frame of another source
    pub fn collect<S: FrameSource<T> + ?Sized>(source: &S) -> Result<Self> {
        let info = source.info();
        let frames = (0..info.num_frames as i64)
            .map(|n| source.get_frame(n))
            .collect::<Result<Vec<_>>>()?;
        if frames.is_empty() {
            return Err(Error::invalid_input("clip has no frames"));
        }
        Ok(MemoryClip { info, frames })
    }
}

impl<T: Pixel> FrameSource<T> for MemoryClip<T> {
    fn info(&self) -> ClipInfo {
        self.info
    }

    fn get_frame(&self, n: i64) -> Result<Arc<PlanarFrame<T>>> {
        Ok(Arc::clone(&self.frames[clamp_index(n, self.frames.len())]))
    }
}
