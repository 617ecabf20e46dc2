//! Common test utilities for fieldmatch integration tests
//!
//! Synthetic film frames, telecined field sequences built from them, and the
//! memory clips the pipeline stages read.

#![allow(dead_code)]

use fieldmatch::util::{FieldOrder, PlanarFrame, Subsampling};
use fieldmatch::MemoryClip;
use std::sync::Arc;

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 64;

/// Rows the content scrolls per film frame
const SCROLL: usize = 6;

// ============================================================================
// Film content
// ============================================================================

/// Film frame `k`: a vertical sinusoid scrolling down by 6 rows per frame
///
/// Each frame is smooth on its own, but weaving rows of two different frames
/// produces strong combing.
pub fn film(k: usize) -> PlanarFrame<u8> {
    let mut frame = PlanarFrame::filled(WIDTH, HEIGHT, Subsampling::YUV420, [0, 128, 128]);
    for y in 0..HEIGHT {
        let phase = 2.0 * std::f64::consts::PI * (y + SCROLL * k) as f64 / HEIGHT as f64;
        let value = (128.0 + 100.0 * phase.sin()).round() as u8;
        frame.plane_mut(0).row_mut(y).fill(value);
    }
    frame
}

// ============================================================================
// Field sequences
// ============================================================================

/// Film frame carried by every field of a pulldown cadence
///
/// `counts` lists the fields per film frame over one cycle (`[2, 3, 2, 3]`
/// for 3:2 pulldown); the first `phase` fields of the sequence are dropped.
pub fn pulldown_fields(counts: &[usize], phase: usize, num_fields: usize) -> Vec<usize> {
    let mut fields = Vec::with_capacity(num_fields + phase + 10);
    let mut k = 0;
    while fields.len() < num_fields + phase {
        for &nf in counts {
            fields.extend(std::iter::repeat(k).take(nf));
            k += 1;
        }
    }
    fields.drain(..phase);
    fields.truncate(num_fields);
    fields
}

/// Native interlaced video: every field shows a new moment
pub fn video_fields(num_fields: usize) -> Vec<usize> {
    (0..num_fields).collect()
}

// ============================================================================
// Clips
// ============================================================================

/// Top-field-first frame `n`: even rows from field `2n`, odd rows from `2n + 1`
pub fn interlaced_frame(fields: &[usize], n: usize) -> PlanarFrame<u8> {
    ordered_frame(fields, n, FieldOrder::TopFieldFirst)
}

/// Frame `n` with field `2n` on the rows of the first field of `order`
pub fn ordered_frame(fields: &[usize], n: usize, order: FieldOrder) -> PlanarFrame<u8> {
    let (first, second) = (film(fields[2 * n]), film(fields[2 * n + 1]));
    let (top, bottom) = match order {
        FieldOrder::TopFieldFirst => (first, second),
        FieldOrder::BottomFieldFirst => (second, first),
    };
    let mut frame = top;
    for p in 0..3 {
        let src = bottom.plane(p);
        let plane = frame.plane_mut(p);
        for y in (1..plane.height()).step_by(2) {
            plane.row_mut(y).copy_from_slice(src.row(y));
        }
    }
    frame
}

/// `num_frames` interlaced frames built from a field sequence
pub fn interlaced_clip(fields: &[usize], num_frames: usize) -> Arc<MemoryClip<u8>> {
    let frames = (0..num_frames)
        .map(|n| interlaced_frame(fields, n))
        .collect();
    Arc::new(MemoryClip::new(frames).expect("uniform geometry"))
}

/// `num_frames` interlaced frames in the given field order
pub fn ordered_clip(fields: &[usize], num_frames: usize, order: FieldOrder) -> Arc<MemoryClip<u8>> {
    let frames = (0..num_frames)
        .map(|n| ordered_frame(fields, n, order))
        .collect();
    Arc::new(
        MemoryClip::new(frames)
            .expect("uniform geometry")
            .with_field_order(order),
    )
}

/// Field-rate clip showing the film frame of every field in full
pub fn native_clip(fields: &[usize], num_frames: usize) -> Arc<MemoryClip<u8>> {
    let frames = (0..num_frames).map(|f| film(fields[f])).collect();
    Arc::new(
        MemoryClip::new(frames)
            .expect("uniform geometry")
            .with_frame_rate(60000, 1001),
    )
}

/// Clip of a single still frame
pub fn still_clip(num_frames: usize) -> Arc<MemoryClip<u8>> {
    interlaced_clip(&vec![0; num_frames * 2], num_frames)
}
