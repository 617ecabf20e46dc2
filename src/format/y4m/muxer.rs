//! Y4M muxer implementation

use super::format_colorspace;
use crate::error::{Error, Result};
use crate::source::{ClipInfo, FrameSource};
use crate::util::{Pixel, PlanarFrame};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;
use y4m::Encoder;

/// Y4M muxer for writing planar frames as YUV4MPEG2
pub struct Y4mMuxer<W: Write> {
    encoder: Encoder<W>,
    info: ClipInfo,
    wide: bool,
    frames_written: u64,
}

impl Y4mMuxer<BufWriter<File>> {
    /// Create a file and write the stream header
    pub fn create(path: &Path, info: &ClipInfo) -> Result<Self> {
        let file = File::create(path)
            .map_err(|e| Error::format(format!("Failed to create {}: {}", path.display(), e)))?;
        Self::new(BufWriter::new(file), info)
    }
}

impl<W: Write> Y4mMuxer<W> {
    /// Write the stream header for clips shaped like `info`
    pub fn new(writer: W, info: &ClipInfo) -> Result<Self> {
        let colorspace = format_colorspace(info.subsampling, info.bit_depth.bits())?;
        let framerate = y4m::Ratio::new(info.fps_num as usize, info.fps_den as usize);
        let encoder = y4m::encode(info.width, info.height, framerate)
            .with_colorspace(colorspace)
            .write_header(writer)
            .map_err(|e| Error::format(format!("Failed to write Y4M header: {}", e)))?;
        Ok(Y4mMuxer {
            encoder,
            info: *info,
            wide: info.bit_depth.needs_wide_storage(),
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Append one frame
    pub fn write_frame<T: Pixel>(&mut self, frame: &PlanarFrame<T>) -> Result<()> {
        if (frame.width(), frame.height(), frame.subsampling())
            != (self.info.width, self.info.height, self.info.subsampling)
        {
            return Err(Error::invalid_input(format!(
                "Frame is {}x{}, stream is {}x{}",
                frame.width(),
                frame.height(),
                self.info.width,
                self.info.height
            )));
        }

        let mut data: [Vec<u8>; 3] = Default::default();
        for (p, buf) in data.iter_mut().enumerate() {
            for row in frame.plane(p).rows() {
                for &sample in row {
                    let value = sample.to_i32();
                    if self.wide {
                        buf.write_u16::<LittleEndian>(value as u16)?;
                    } else {
                        buf.push(value as u8);
                    }
                }
            }
        }

        let y4m_frame = y4m::Frame::new([&data[0][..], &data[1][..], &data[2][..]], None);
        self.encoder
            .write_frame(&y4m_frame)
            .map_err(|e| Error::format(format!("Failed to write frame: {}", e)))?;
        self.frames_written += 1;
        Ok(())
    }
}

/// Write every frame of `source` to a Y4M file
pub fn write_y4m<T: Pixel, S: FrameSource<T> + ?Sized>(path: &Path, source: &S) -> Result<u64> {
    let info = source.info();
    let mut muxer = Y4mMuxer::create(path, &info)?;
    for n in 0..info.num_frames as i64 {
        muxer.write_frame(&*source.get_frame(n)?)?;
    }
    info!("wrote {} frames to {}", muxer.frames_written(), path.display());
    Ok(muxer.frames_written())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::y4m::Y4mDemuxer;
    use crate::util::{BitDepth, Subsampling};

    #[test]
    fn test_write_then_read() {
        let mut frame = PlanarFrame::filled(8, 4, Subsampling::YUV420, [16u8, 128, 128]);
        frame.plane_mut(0).set(7, 3, 235);
        let info = ClipInfo::new(8, 4, Subsampling::YUV420, 1);

        let mut bytes = Vec::new();
        {
            let mut muxer = Y4mMuxer::new(&mut bytes, &info).unwrap();
            muxer.write_frame(&frame).unwrap();
            muxer.write_frame(&frame).unwrap();
            assert_eq!(muxer.frames_written(), 2);
        }
        assert!(bytes.starts_with(b"YUV4MPEG2 W8 H4"));

        let mut demuxer = Y4mDemuxer::new(&bytes[..]).unwrap();
        let back: PlanarFrame<u8> = demuxer.read_frame().unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_ten_bit_samples() {
        let depth = BitDepth::new(10).unwrap();
        let frame = PlanarFrame::filled(4, 2, Subsampling::YUV420, [940u16, 512, 512]);
        let info = ClipInfo::new(4, 2, Subsampling::YUV420, 1).with_bit_depth(depth);

        let mut bytes = Vec::new();
        Y4mMuxer::new(&mut bytes, &info)
            .unwrap()
            .write_frame(&frame)
            .unwrap();
        let mut demuxer = Y4mDemuxer::new(&bytes[..]).unwrap();
        assert_eq!(demuxer.info().bit_depth, depth);
        let back: PlanarFrame<u16> = demuxer.read_frame().unwrap();
        assert_eq!(back.plane(0).get(3, 1), 940);
        assert!(demuxer.read_frame::<u8>().is_err());
    }

    #[test]
    fn test_rejects_wrong_geometry() {
        let info = ClipInfo::new(8, 4, Subsampling::YUV420, 1);
        let mut muxer = Y4mMuxer::new(Vec::new(), &info).unwrap();
        let frame = PlanarFrame::filled(4, 4, Subsampling::YUV420, [0u8; 3]);
        assert!(matches!(
            muxer.write_frame(&frame),
            Err(Error::InvalidInput(_))
        ));
    }
}
