//! Raw video container handling
//!
//! Only YUV4MPEG2 is supported; it carries planar frames of any bit depth
//! with no compression, which is all the reconstruction pipeline needs.

pub mod y4m;

pub use self::y4m::{read_y4m, write_y4m, Y4mClip, Y4mDemuxer, Y4mMuxer};

/// Detect format from file extension
pub fn detect_format_from_extension(path: &str) -> Option<&'static str> {
    let ext = path.rsplit('.').next()?.to_lowercase();
    match ext.as_str() {
        "y4m" | "yuv4mpeg" => Some("y4m"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format_from_extension("clip.y4m"), Some("y4m"));
        assert_eq!(detect_format_from_extension("CLIP.Y4M"), Some("y4m"));
        assert_eq!(detect_format_from_extension("clip.mp4"), None);
    }
}
