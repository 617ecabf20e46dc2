//! Residual comb removal
//!
//! Reconstructed 24p frames can keep combing where the cadence guess was
//! wrong or the source was edited. [`Decomb`] smooths lightly combed pixels
//! vertically, then measures what is left and summarises it as a
//! [`CombingBlockMap`] that travels with the frame.

use super::combing::{CombingBlockClassifier, CombingBlockMap, OVERLAP};
use super::overlay::{paint_dirty_blocks, paint_flagged_pixels};
use crate::cadence::flags::comb_value;
use crate::error::{Error, Result};
use crate::source::{ClipInfo, FrameSource};
use crate::util::{BitDepth, Pixel, PlanarFrame, Plane, Subsampling};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, trace};

/// Parameters of the decomb stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecombParams {
    /// Comb value above which a pixel is smoothed
    pub smooth_threshold: i32,
    /// Maximum 5-sample range that may be smoothed
    pub smooth: i32,
    /// Comb value counted as residual combing
    pub comb_threshold: i32,
    /// Units per block that mark it suspect
    pub ratio1: i32,
    /// Units per block that mark it confirmed
    pub ratio2: i32,
    /// Return the input with residual comb pixels painted
    pub show: bool,
}

impl Default for DecombParams {
    fn default() -> Self {
        DecombParams {
            smooth_threshold: 30,
            smooth: 50,
            comb_threshold: 150,
            ratio1: 0,
            ratio2: 5,
            show: false,
        }
    }
}

impl DecombParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("smooth_threshold", self.smooth_threshold),
            ("smooth", self.smooth),
            ("comb_threshold", self.comb_threshold),
        ] {
            if value < 0 {
                return Err(Error::config(format!("{} must not be negative: {}", name, value)));
            }
        }
        CombingBlockClassifier::new(self.ratio1, self.ratio2).map(|_| ())
    }
}

/// A frame with its residual combing
#[derive(Debug, Clone)]
pub struct DecombOutput<T> {
    pub frame: Arc<PlanarFrame<T>>,
    pub blocks: CombingBlockMap,
}

/// A frame source whose frames carry a combing block map
pub trait BlockMapSource<T: Pixel>: FrameSource<T> {
    fn get_with_blocks(&self, n: i64) -> Result<DecombOutput<T>>;
}

impl<T: Pixel, S: BlockMapSource<T> + ?Sized> BlockMapSource<T> for Arc<S> {
    fn get_with_blocks(&self, n: i64) -> Result<DecombOutput<T>> {
        (**self).get_with_blocks(n)
    }
}

/// Row `y` reflected into `0..height`
#[inline]
fn mirror(y: isize, height: usize) -> usize {
    let h = height as isize;
    let y = if y < 0 { -y - 1 } else if y >= h { 2 * h - y - 1 } else { y };
    y.clamp(0, h - 1) as usize
}

/// The five rows centred on `y`
fn window<T: Pixel>(plane: &Plane<T>, y: usize) -> [&[T]; 5] {
    std::array::from_fn(|k| plane.row(mirror(y as isize + k as isize - 2, plane.height())))
}

fn find_combs<T: Pixel>(plane: &Plane<T>, thresh: i32) -> Plane<u8> {
    let mut flags = Plane::new(plane.width(), plane.height());
    for y in 0..plane.height() {
        let [a, b, c, d, e] = window(plane, y);
        for (x, out) in flags.row_mut(y).iter_mut().enumerate() {
            let t = comb_value(
                a[x].to_i32(),
                b[x].to_i32(),
                c[x].to_i32(),
                d[x].to_i32(),
                e[x].to_i32(),
            );
            *out = (t > thresh) as u8;
        }
    }
    flags
}

/// Flag the rows directly above and below every flagged pixel
fn extend_flags(flags: &Plane<u8>) -> Plane<u8> {
    let height = flags.height();
    Plane::from_fn(flags.width(), height, |x, y| {
        let above = flags.get(x, y.saturating_sub(1));
        let below = flags.get(x, (y + 1).min(height - 1));
        above | flags.get(x, y) | below
    })
}

fn merge_chroma(luma: &mut Plane<u8>, u: &Plane<u8>, v: &Plane<u8>, sub: Subsampling) {
    for y in 0..luma.height() {
        let (ru, rv) = (u.row(y >> sub.log_y), v.row(y >> sub.log_y));
        for (x, out) in luma.row_mut(y).iter_mut().enumerate() {
            let xc = x >> sub.log_x;
            *out |= ru[xc] | rv[xc];
        }
    }
}

/// Chroma flag plane covering every flagged luma pixel
fn broadcast_luma(luma: &Plane<u8>, width: usize, height: usize, sub: Subsampling) -> Plane<u8> {
    let mut chroma = Plane::new(width, height);
    for y in 0..luma.height() {
        for (x, &flag) in luma.row(y).iter().enumerate() {
            if flag != 0 {
                chroma.set(x >> sub.log_x, y >> sub.log_y, flag);
            }
        }
    }
    chroma
}

/// Vertical binomial on flagged pixels whose neighbourhood is flat enough
fn smooth_plane<T: Pixel>(src: &Plane<T>, flags: &Plane<u8>, thresh: i32) -> Plane<T> {
    let mut dst = src.clone();
    for y in 0..src.height() {
        let [a, b, c, d, e] = window(src, y);
        let fl = flags.row(y);
        for (x, out) in dst.row_mut(y).iter_mut().enumerate() {
            if fl[x] == 0 {
                continue;
            }
            let v = [a[x], b[x], c[x], d[x], e[x]].map(Pixel::to_i32);
            let (lo, hi) = v
                .iter()
                .fold((i32::MAX, i32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
            if hi - lo < thresh {
                *out = T::from_i32((v[1] + 2 * v[2] + v[3] + 2) >> 2);
            }
        }
    }
    dst
}

/// Luma comb flags of a frame with chroma flags folded in
fn frame_comb_flags<T: Pixel>(frame: &PlanarFrame<T>, thresh: i32, extend: bool) -> Plane<u8> {
    let [mut luma, u, v] = std::array::from_fn(|p| {
        let flags = find_combs(frame.plane(p), thresh);
        if extend {
            extend_flags(&flags)
        } else {
            flags
        }
    });
    merge_chroma(&mut luma, &u, &v, frame.subsampling());
    luma
}

/// Residual comb smoothing stage
pub struct Decomb<T, S> {
    source: S,
    params: DecombParams,
    classifier: CombingBlockClassifier,
    depth: BitDepth,
    _pixel: PhantomData<T>,
}

impl<T: Pixel, S: FrameSource<T>> Decomb<T, S> {
    /// Fails with `Config` unless both dimensions are multiples of 8
    pub fn new(source: S, params: DecombParams) -> Result<Self> {
        let info = source.info();
        info.ensure_aligned(OVERLAP, "decomb")?;
        params.validate()?;
        let classifier = CombingBlockClassifier::new(params.ratio1, params.ratio2)?;
        info!(
            "decomb: {}x{}, smooth {} / {}, comb {}, ratios {} / {}",
            info.width,
            info.height,
            params.smooth_threshold,
            params.smooth,
            params.comb_threshold,
            params.ratio1,
            params.ratio2
        );
        Ok(Decomb {
            source,
            params,
            classifier,
            depth: info.bit_depth,
            _pixel: PhantomData,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Smooth frame `n` and map what combing remains
    pub fn process(&self, n: i64) -> Result<DecombOutput<T>> {
        let src = self.source.get_frame(n)?;
        let sub = src.subsampling();
        let scale = |v: i32| self.depth.scale(v);

        let luma = frame_comb_flags(&src, scale(self.params.smooth_threshold), true);
        let (cw, ch) = sub.plane_dims(1, src.width(), src.height());
        let chroma = broadcast_luma(&luma, cw, ch, sub);

        let smooth = scale(self.params.smooth);
        let planes = std::array::from_fn(|p| {
            let flags = if p == 0 { &luma } else { &chroma };
            smooth_plane(src.plane(p), flags, smooth)
        });
        let smoothed = PlanarFrame::from_planes(planes, sub)?;

        let residual = frame_comb_flags(&smoothed, scale(self.params.comb_threshold), false);
        let blocks = self.classifier.block_map(&residual);
        trace!("decomb {}: {} dirty blocks", n, blocks.dirty_blocks());

        let frame = if self.params.show {
            let mut shown = (*src).clone();
            paint_flagged_pixels(&mut shown, &residual, self.depth);
            shown
        } else {
            smoothed
        };
        Ok(DecombOutput {
            frame: Arc::new(frame),
            blocks,
        })
    }

    /// Smoothed frame `n` with its dirty blocks painted
    pub fn show_blocks(&self, n: i64) -> Result<PlanarFrame<T>> {
        Ok(self.paint_blocks(&self.process(n)?))
    }

    /// Paint the dirty blocks of an already processed frame
    pub fn paint_blocks(&self, output: &DecombOutput<T>) -> PlanarFrame<T> {
        paint_dirty_blocks(&output.frame, &output.blocks, self.depth)
    }
}

impl<T: Pixel, S: FrameSource<T>> FrameSource<T> for Decomb<T, S> {
    fn info(&self) -> ClipInfo {
        self.source.info()
    }

    fn get_frame(&self, n: i64) -> Result<Arc<PlanarFrame<T>>> {
        Ok(self.process(n)?.frame)
    }
}

impl<T: Pixel, S: FrameSource<T>> BlockMapSource<T> for Decomb<T, S> {
    fn get_with_blocks(&self, n: i64) -> Result<DecombOutput<T>> {
        self.process(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryClip;

    fn gradient(w: usize, h: usize) -> PlanarFrame<u8> {
        let mut frame = PlanarFrame::filled(w, h, Subsampling::YUV420, [0, 128, 128]);
        for y in 0..h {
            frame.plane_mut(0).row_mut(y).fill((y * 2) as u8);
        }
        frame
    }

    fn combed(w: usize, h: usize, amplitude: u8) -> PlanarFrame<u8> {
        let mut frame = PlanarFrame::filled(w, h, Subsampling::YUV420, [100, 128, 128]);
        for y in (1..h).step_by(2) {
            frame.plane_mut(0).row_mut(y).fill(100 + amplitude);
        }
        frame
    }

    #[test]
    fn test_mirror() {
        assert_eq!(mirror(-1, 8), 0);
        assert_eq!(mirror(-2, 8), 1);
        assert_eq!(mirror(8, 8), 7);
        assert_eq!(mirror(9, 8), 6);
        assert_eq!(mirror(3, 8), 3);
    }

    #[test]
    fn test_rejects_unaligned_source() {
        let clip = MemoryClip::new(vec![gradient(36, 32)]).unwrap();
        assert!(matches!(
            Decomb::new(clip, DecombParams::default()),
            Err(Error::Config(_))
        ));
        let clip = MemoryClip::new(vec![gradient(32, 32)]).unwrap();
        let params = DecombParams {
            ratio1: 5,
            ..Default::default()
        };
        assert!(matches!(Decomb::new(clip, params), Err(Error::Config(_))));
    }

    #[test]
    fn test_smooth_content_unchanged() {
        let clip = MemoryClip::new(vec![gradient(32, 32)]).unwrap();
        let decomb = Decomb::new(clip, DecombParams::default()).unwrap();
        let out = decomb.process(0).unwrap();
        assert_eq!(*out.frame, gradient(32, 32));
        assert!(out.blocks.is_clean());
    }

    #[test]
    fn test_light_combing_smoothed() {
        // comb value 6 * 10 = 60 exceeds 30, range 10 is below 50
        let clip = MemoryClip::new(vec![combed(32, 32, 10)]).unwrap();
        let decomb = Decomb::new(clip, DecombParams::default()).unwrap();
        let out = decomb.process(0).unwrap();
        let luma = out.frame.plane(0);
        assert_eq!(luma.get(5, 10), 105);
        assert_eq!(luma.get(5, 11), 105);
        assert!(out.blocks.is_clean());
    }

    #[test]
    fn test_heavy_combing_flagged() {
        // range 60 is too wide to smooth, comb value 360 exceeds 150
        let clip = MemoryClip::new(vec![combed(32, 32, 60)]).unwrap();
        let decomb = Decomb::new(clip, DecombParams::default()).unwrap();
        let out = decomb.process(0).unwrap();
        assert_eq!(out.frame.plane(0).get(5, 11), 160);
        assert_eq!(out.blocks.get(0, 0), 0);
        assert_eq!(out.blocks.get(1, 1), 3);
        assert_eq!(out.blocks.dirty_blocks(), 9);

        let painted = decomb.show_blocks(0).unwrap();
        assert_eq!(painted.plane(0).get(8, 8), 73);
        assert_eq!(painted.plane(0).get(0, 0), 100);
        assert_eq!(decomb.paint_blocks(&out), painted);
    }

    #[test]
    fn test_show_paints_residual_pixels() {
        let clip = MemoryClip::new(vec![combed(32, 32, 60)]).unwrap();
        let params = DecombParams {
            show: true,
            ..Default::default()
        };
        let decomb = Decomb::new(clip, params).unwrap();
        let out = decomb.get_frame(0).unwrap();
        assert_eq!(out.plane(0).get(3, 7), 73);
        assert_eq!(out.plane(0).get(3, 6), 100);
    }
}
