//! Common utilities and data structures

pub mod pixel;
pub mod plane;

pub use pixel::{BitDepth, Pixel};
pub use plane::{FieldOrder, PlanarFrame, Plane, Subsampling};

/// Number of `size`-wide blocks needed to cover `len`
#[inline]
pub fn nblocks(len: usize, size: usize) -> usize {
    len.div_ceil(size)
}
