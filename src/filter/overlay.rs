//! Diagnostic overlays

use super::combing::{CombingBlockMap, OVERLAP};
use crate::cadence::flags::{BORDER, CHROMA_SHIFT, MOTION, SMALL_COMB};
use crate::util::{BitDepth, Pixel, PlanarFrame, Plane, Subsampling};

/// 8-bit YUV colour
pub type Color = [i32; 3];

pub const BLACK: Color = [0, 128, 128];
pub const BLUE: Color = [73, 230, 111];
pub const GRAY: Color = [140, 128, 128];
pub const PURPLE: Color = [197, 160, 122];

fn samples<T: Pixel>(color: Color, depth: BitDepth) -> [T; 3] {
    color.map(|c| T::from_i32(depth.scale(c)))
}

/// Paint luma position `(x, y)` and its chroma site
fn put<T: Pixel>(frame: &mut PlanarFrame<T>, x: usize, y: usize, color: [T; 3]) {
    let sub = frame.subsampling();
    frame.plane_mut(0).set(x, y, color[0]);
    for p in 1..3 {
        frame
            .plane_mut(p)
            .set(x >> sub.plane_log_x(p), y >> sub.plane_log_y(p), color[p]);
    }
}

/// Render a field flag plane: blue motion, gray comb, purple both
pub fn visualize_field_flags<T: Pixel>(
    flags: &Plane<u8>,
    subsampling: Subsampling,
    depth: BitDepth,
) -> PlanarFrame<T> {
    let (width, height) = (flags.width(), flags.height());
    let mut dst = PlanarFrame::filled(width, height, subsampling, samples(BLACK, depth));
    let (blue, gray, purple) = (
        samples(BLUE, depth),
        samples(GRAY, depth),
        samples(PURPLE, depth),
    );

    for y in BORDER..height.saturating_sub(BORDER) {
        for x in 0..width {
            let mut flag = flags.get(x, y);
            flag |= flag >> CHROMA_SHIFT;
            let color = match (flag & MOTION != 0, flag & SMALL_COMB != 0) {
                (true, true) => purple,
                (true, false) => blue,
                (false, true) => gray,
                (false, false) => continue,
            };
            put(&mut dst, x, y, color);
        }
    }
    dst
}

/// Paint every flagged pixel blue
pub fn paint_flagged_pixels<T: Pixel>(frame: &mut PlanarFrame<T>, flags: &Plane<u8>, depth: BitDepth) {
    let blue = samples(BLUE, depth);
    for y in 0..flags.height() {
        for x in 0..flags.width() {
            if flags.get(x, y) != 0 {
                put(frame, x, y, blue);
            }
        }
    }
}

/// Copy of `frame` with every dirty block tile painted blue
pub fn paint_dirty_blocks<T: Pixel>(
    frame: &PlanarFrame<T>,
    map: &CombingBlockMap,
    depth: BitDepth,
) -> PlanarFrame<T> {
    let mut dst = frame.clone();
    let blue = samples(BLUE, depth);
    let sub = frame.subsampling();
    for (bx, by) in map.iter_dirty() {
        for (p, &value) in blue.iter().enumerate() {
            let (tw, th) = (OVERLAP >> sub.plane_log_x(p), OVERLAP >> sub.plane_log_y(p));
            let plane = dst.plane_mut(p);
            let (x0, y0) = (bx * tw, by * th);
            for y in y0..(y0 + th).min(plane.height()) {
                let row = plane.row_mut(y);
                let end = (x0 + tw).min(row.len());
                if x0 < end {
                    row[x0..end].fill(value);
                }
            }
        }
    }
    dst
}
