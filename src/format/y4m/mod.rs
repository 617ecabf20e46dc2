//! Y4M (YUV4MPEG2) format support
//!
//! Raw planar video in and out of the pipeline. Streams deeper than 8 bits
//! are held in 16-bit storage with their significant bit depth recorded in
//! the clip info.

pub mod demuxer;
pub mod muxer;

pub use demuxer::{read_y4m, Y4mDemuxer};
pub use muxer::{write_y4m, Y4mMuxer};

use crate::error::{Error, Result};
use crate::source::{ClipInfo, FrameSource, MemoryClip};
use crate::util::Subsampling;
use y4m::Colorspace;

/// A clip read from a Y4M file
#[derive(Debug, Clone)]
pub enum Y4mClip {
    /// 8-bit samples
    Eight(MemoryClip<u8>),
    /// 9 to 16-bit samples
    Deep(MemoryClip<u16>),
}

impl Y4mClip {
    pub fn info(&self) -> ClipInfo {
        match self {
            Y4mClip::Eight(clip) => clip.info(),
            Y4mClip::Deep(clip) => clip.info(),
        }
    }
}

/// Subsampling and bit depth of a Y4M colorspace
pub(crate) fn colorspace_format(colorspace: Colorspace) -> Result<(Subsampling, u32)> {
    let format = match colorspace {
        Colorspace::C420 | Colorspace::C420jpeg | Colorspace::C420paldv => {
            (Subsampling::YUV420, 8)
        }
        Colorspace::C420p10 => (Subsampling::YUV420, 10),
        Colorspace::C420p12 => (Subsampling::YUV420, 12),
        Colorspace::C422 => (Subsampling::YUV422, 8),
        Colorspace::C422p10 => (Subsampling::YUV422, 10),
        Colorspace::C422p12 => (Subsampling::YUV422, 12),
        Colorspace::C444 => (Subsampling::YUV444, 8),
        Colorspace::C444p10 => (Subsampling::YUV444, 10),
        Colorspace::C444p12 => (Subsampling::YUV444, 12),
        other => {
            return Err(Error::format(format!(
                "Unsupported Y4M colorspace: {:?}",
                other
            )))
        }
    };
    Ok(format)
}

/// Y4M colorspace for a subsampling and bit depth
pub(crate) fn format_colorspace(subsampling: Subsampling, bits: u32) -> Result<Colorspace> {
    let colorspace = match (subsampling.log_x, subsampling.log_y, bits) {
        (1, 1, 8) => Colorspace::C420jpeg,
        (1, 1, 10) => Colorspace::C420p10,
        (1, 1, 12) => Colorspace::C420p12,
        (1, 0, 8) => Colorspace::C422,
        (1, 0, 10) => Colorspace::C422p10,
        (1, 0, 12) => Colorspace::C422p12,
        (0, 0, 8) => Colorspace::C444,
        (0, 0, 10) => Colorspace::C444p10,
        (0, 0, 12) => Colorspace::C444p12,
        _ => {
            return Err(Error::format(format!(
                "No Y4M colorspace for {:?} at {} bits",
                subsampling, bits
            )))
        }
    };
    Ok(colorspace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorspace_mapping() {
        for (sub, bits) in [
            (Subsampling::YUV420, 8),
            (Subsampling::YUV422, 10),
            (Subsampling::YUV444, 12),
        ] {
            let cs = format_colorspace(sub, bits).unwrap();
            assert_eq!(colorspace_format(cs).unwrap(), (sub, bits));
        }
        assert!(format_colorspace(Subsampling::YUV420, 16).is_err());
        assert!(colorspace_format(Colorspace::Cmono).is_err());
    }
}
