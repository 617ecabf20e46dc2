//! Y4M demuxer implementation

use super::{colorspace_format, Y4mClip};
use crate::error::{Error, Result};
use crate::source::{ClipInfo, MemoryClip};
use crate::util::{BitDepth, FieldOrder, Pixel, PlanarFrame, Plane};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;
use y4m::Decoder;

/// Y4M demuxer for reading YUV4MPEG2 files into planar frames
pub struct Y4mDemuxer<R: Read> {
    decoder: Decoder<R>,
    info: ClipInfo,
    bytes_per_sample: usize,
    frame_number: u64,
}

impl Y4mDemuxer<BufReader<File>> {
    /// Open a file
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::format(format!("Failed to open {}: {}", path.display(), e)))?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> Y4mDemuxer<R> {
    /// Parse the stream header
    pub fn new(reader: R) -> Result<Self> {
        let decoder = y4m::decode(reader)
            .map_err(|e| Error::format(format!("Failed to decode Y4M header: {}", e)))?;

        let (subsampling, bits) = colorspace_format(decoder.get_colorspace())?;
        let bit_depth = BitDepth::new(bits)
            .ok_or_else(|| Error::format(format!("Unsupported bit depth: {}", bits)))?;
        let framerate = decoder.get_framerate();
        let info = ClipInfo::new(decoder.get_width(), decoder.get_height(), subsampling, 0)
            .with_bit_depth(bit_depth)
            .with_frame_rate(framerate.num as u64, framerate.den as u64);
        let bytes_per_sample = decoder.get_bytes_per_sample();

        debug!(
            "y4m: {}x{} {:?} {}-bit {}/{}",
            info.width, info.height, subsampling, bits, framerate.num, framerate.den
        );
        Ok(Y4mDemuxer {
            decoder,
            info,
            bytes_per_sample,
            frame_number: 0,
        })
    }

    /// Stream geometry; `num_frames` counts the frames read so far
    pub fn info(&self) -> ClipInfo {
        ClipInfo {
            num_frames: self.frame_number as usize,
            ..self.info
        }
    }

    /// Read the next frame, `Error::EndOfStream` after the last one
    pub fn read_frame<T: Pixel>(&mut self) -> Result<PlanarFrame<T>> {
        if self.bytes_per_sample > 1 && T::STORAGE_BITS == 8 {
            return Err(Error::invalid_input(
                "Cannot read high bit depth samples into 8-bit frames",
            ));
        }
        let (width, height, sub) = (self.info.width, self.info.height, self.info.subsampling);
        let bps = self.bytes_per_sample;

        let frame = self.decoder.read_frame().map_err(|e| match e {
            y4m::Error::EOF => Error::EndOfStream,
            _ => Error::format(format!("Failed to read frame: {}", e)),
        })?;

        let raw = [frame.get_y_plane(), frame.get_u_plane(), frame.get_v_plane()];
        let mut planes = Vec::with_capacity(3);
        for (p, bytes) in raw.into_iter().enumerate() {
            let (w, h) = sub.plane_dims(p, width, height);
            if bytes.len() < w * h * bps {
                return Err(Error::format(format!(
                    "Plane {} too small: expected {} bytes, got {}",
                    p,
                    w * h * bps,
                    bytes.len()
                )));
            }
            let samples = if bps == 1 {
                bytes[..w * h].iter().map(|&b| T::from_i32(b as i32)).collect()
            } else {
                bytes[..w * h * 2]
                    .chunks_exact(2)
                    .map(|c| T::from_i32(LittleEndian::read_u16(c) as i32))
                    .collect()
            };
            planes.push(Plane::from_vec(samples, w, h, w)?);
        }
        let planes: [Plane<T>; 3] = planes
            .try_into()
            .map_err(|_| Error::format("Frame must have 3 planes"))?;

        self.frame_number += 1;
        PlanarFrame::from_planes(planes, sub)
    }

    /// Read every remaining frame
    pub fn read_all<T: Pixel>(&mut self) -> Result<Vec<PlanarFrame<T>>> {
        let mut frames = Vec::new();
        loop {
            match self.read_frame() {
                Ok(frame) => frames.push(frame),
                Err(Error::EndOfStream) => return Ok(frames),
                Err(e) => return Err(e),
            }
        }
    }

    /// Read the whole stream into memory, 16-bit storage above 8 bits
    pub fn read_clip(mut self, field_order: FieldOrder) -> Result<Y4mClip> {
        let (depth, (num, den)) = (self.info.bit_depth, (self.info.fps_num, self.info.fps_den));
        let clip = if self.bytes_per_sample == 1 {
            let clip = MemoryClip::new(self.read_all::<u8>()?)?;
            Y4mClip::Eight(clip.with_field_order(field_order).with_frame_rate(num, den))
        } else {
            let clip = MemoryClip::new(self.read_all::<u16>()?)?;
            Y4mClip::Deep(
                clip.with_bit_depth(depth)
                    .with_field_order(field_order)
                    .with_frame_rate(num, den),
            )
        };
        Ok(clip)
    }
}

/// Read a whole Y4M file
pub fn read_y4m(path: &Path, field_order: FieldOrder) -> Result<Y4mClip> {
    Y4mDemuxer::open(path)?.read_clip(field_order)
}
