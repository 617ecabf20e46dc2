//! Sample types
//!
//! All pixel arithmetic in fieldmatch is written once, generic over [`Pixel`].
//! The concrete sample width (8 or 16 bits per sample) is chosen once per
//! stream and never dispatched per pixel.

use std::fmt;

/// A planar sample type
pub trait Pixel: Copy + Default + PartialEq + Send + Sync + fmt::Debug + 'static {
    /// Storage width in bits
    const STORAGE_BITS: u32;

    /// Widen to i32 for arithmetic
    fn to_i32(self) -> i32;

    /// Narrow from i32, clamping to the storage range
    fn from_i32(value: i32) -> Self;
}

impl Pixel for u8 {
    const STORAGE_BITS: u32 = 8;

    #[inline(always)]
    fn to_i32(self) -> i32 {
        self as i32
    }

    #[inline(always)]
    fn from_i32(value: i32) -> Self {
        value.clamp(0, u8::MAX as i32) as u8
    }
}

impl Pixel for u16 {
    const STORAGE_BITS: u32 = 16;

    #[inline(always)]
    fn to_i32(self) -> i32 {
        self as i32
    }

    #[inline(always)]
    fn from_i32(value: i32) -> Self {
        value.clamp(0, u16::MAX as i32) as u16
    }
}

/// Significant bits per sample of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitDepth(u32);

impl BitDepth {
    /// 8-bit samples
    pub const EIGHT: BitDepth = BitDepth(8);
    /// 10-bit samples stored in u16
    pub const TEN: BitDepth = BitDepth(10);
    /// 16-bit samples
    pub const SIXTEEN: BitDepth = BitDepth(16);

    /// Create a bit depth, accepting 8..=16
    pub fn new(bits: u32) -> Option<Self> {
        (8..=16).contains(&bits).then_some(BitDepth(bits))
    }

    /// Number of significant bits
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Scale an 8-bit referenced threshold to this depth
    pub fn scale(self, value: i32) -> i32 {
        value << (self.0 - 8)
    }

    /// Whether samples of this depth need 16-bit storage
    pub fn needs_wide_storage(self) -> bool {
        self.0 > 8
    }
}

impl Default for BitDepth {
    fn default() -> Self {
        BitDepth::EIGHT
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrowing_clamps() {
        assert_eq!(u8::from_i32(300), 255);
        assert_eq!(u8::from_i32(-4), 0);
        assert_eq!(u16::from_i32(70000), u16::MAX);
        assert_eq!(u16::from_i32(1023), 1023);
    }

    #[test]
    fn test_bit_depth_scaling() {
        assert_eq!(BitDepth::EIGHT.scale(42), 42);
        assert_eq!(BitDepth::TEN.scale(42), 168);
        assert_eq!(BitDepth::SIXTEEN.scale(1), 256);
        assert!(BitDepth::new(7).is_none());
        assert!(BitDepth::new(17).is_none());
        assert!(!BitDepth::EIGHT.needs_wide_storage());
        assert!(BitDepth::TEN.needs_wide_storage());
    }
}
