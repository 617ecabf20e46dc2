//! Planar image storage
//!
//! A [`PlanarFrame`] holds one luma and two chroma [`Plane`]s. Chroma planes
//! are reduced by the frame's [`Subsampling`] shifts. Rows are addressed
//! through a pitch so frames produced elsewhere with padded rows can be
//! wrapped without copying.

use super::pixel::Pixel;
use crate::error::{Error, Result};

/// Field order of an interlaced source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum FieldOrder {
    /// Top field first
    #[default]
    TopFieldFirst,
    /// Bottom field first
    BottomFieldFirst,
}

impl FieldOrder {
    /// Row parity (0 = even rows, 1 = odd rows) of the temporally first field
    pub fn first_field_parity(self) -> usize {
        match self {
            FieldOrder::TopFieldFirst => 0,
            FieldOrder::BottomFieldFirst => 1,
        }
    }

    /// Row parity of the temporally second field
    pub fn second_field_parity(self) -> usize {
        1 - self.first_field_parity()
    }
}

/// Chroma subsampling as log2 shifts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subsampling {
    /// Horizontal shift
    pub log_x: u32,
    /// Vertical shift
    pub log_y: u32,
}

impl Subsampling {
    /// 4:2:0
    pub const YUV420: Subsampling = Subsampling { log_x: 1, log_y: 1 };
    /// 4:2:2
    pub const YUV422: Subsampling = Subsampling { log_x: 1, log_y: 0 };
    /// 4:4:4
    pub const YUV444: Subsampling = Subsampling { log_x: 0, log_y: 0 };

    /// Dimensions of a plane for a frame of the given size
    ///
    /// Chroma sizes round up so odd luma sizes keep their last column and row.
    pub fn plane_dims(self, plane: usize, width: usize, height: usize) -> (usize, usize) {
        if plane == 0 {
            (width, height)
        } else {
            (ceil_shift(width, self.log_x), ceil_shift(height, self.log_y))
        }
    }

    /// Vertical shift that applies to a plane
    pub fn plane_log_y(self, plane: usize) -> u32 {
        if plane == 0 {
            0
        } else {
            self.log_y
        }
    }

    /// Horizontal shift that applies to a plane
    pub fn plane_log_x(self, plane: usize) -> u32 {
        if plane == 0 {
            0
        } else {
            self.log_x
        }
    }
}

fn ceil_shift(size: usize, shift: u32) -> usize {
    (size + (1 << shift) - 1) >> shift
}

impl Default for Subsampling {
    fn default() -> Self {
        Subsampling::YUV420
    }
}

/// One plane of samples
#[derive(Debug, Clone, PartialEq)]
pub struct Plane<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
    pitch: usize,
}

impl<T: Pixel> Plane<T> {
    /// Create a zero-filled plane
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }

    /// Create a plane filled with one value
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Plane {
            data: vec![value; width * height],
            width,
            height,
            pitch: width,
        }
    }

    /// Wrap existing samples with a row pitch
    pub fn from_vec(data: Vec<T>, width: usize, height: usize, pitch: usize) -> Result<Self> {
        if pitch < width {
            return Err(Error::invalid_input(format!(
                "pitch {} smaller than width {}",
                pitch, width
            )));
        }
        let need = if height == 0 {
            0
        } else {
            pitch * (height - 1) + width
        };
        if data.len() < need {
            return Err(Error::invalid_input(format!(
                "plane needs {} samples, got {}",
                need,
                data.len()
            )));
        }
        Ok(Plane {
            data,
            width,
            height,
            pitch,
        })
    }

    /// Create a plane by evaluating a function at every position
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Plane {
            data,
            width,
            height,
            pitch: width,
        }
    }

    /// Width in samples
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in rows
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance between rows in samples
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Sample at (x, y)
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[x + y * self.pitch]
    }

    /// Overwrite the sample at (x, y)
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.data[x + y * self.pitch] = value;
    }

    /// One row, `width` samples long
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.pitch;
        &self.data[start..start + self.width]
    }

    /// One mutable row, `width` samples long
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.pitch;
        &mut self.data[start..start + self.width]
    }

    /// Iterate rows top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.height).map(move |y| self.row(y))
    }

    /// Copy samples out into a tightly packed vector
    pub fn to_packed(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.width * self.height);
        for row in self.rows() {
            out.extend_from_slice(row);
        }
        out
    }

    /// Whether two planes share dimensions
    pub fn same_size(&self, other: &Plane<T>) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// A three-plane YUV frame
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarFrame<T> {
    planes: [Plane<T>; 3],
    width: usize,
    height: usize,
    subsampling: Subsampling,
}

impl<T: Pixel> PlanarFrame<T> {
    /// Create a zero-filled frame
    pub fn new(width: usize, height: usize, subsampling: Subsampling) -> Self {
        Self::filled(width, height, subsampling, [T::default(); 3])
    }

    /// Create a frame with each plane filled by a constant
    pub fn filled(width: usize, height: usize, subsampling: Subsampling, values: [T; 3]) -> Self {
        let planes = std::array::from_fn(|p| {
            let (w, h) = subsampling.plane_dims(p, width, height);
            Plane::filled(w, h, values[p])
        });
        PlanarFrame {
            planes,
            width,
            height,
            subsampling,
        }
    }

    /// Assemble a frame from planes, checking their geometry
    pub fn from_planes(planes: [Plane<T>; 3], subsampling: Subsampling) -> Result<Self> {
        let width = planes[0].width();
        let height = planes[0].height();
        for (p, plane) in planes.iter().enumerate().skip(1) {
            let (w, h) = subsampling.plane_dims(p, width, height);
            if plane.width() != w || plane.height() != h {
                return Err(Error::invalid_input(format!(
                    "plane {} is {}x{}, expected {}x{}",
                    p,
                    plane.width(),
                    plane.height(),
                    w,
                    h
                )));
            }
        }
        Ok(PlanarFrame {
            planes,
            width,
            height,
            subsampling,
        })
    }

    /// Luma width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Luma height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Chroma subsampling
    pub fn subsampling(&self) -> Subsampling {
        self.subsampling
    }

    /// Plane by index (0 = Y, 1 = U, 2 = V)
    pub fn plane(&self, index: usize) -> &Plane<T> {
        &self.planes[index]
    }

    /// Mutable plane by index
    pub fn plane_mut(&mut self, index: usize) -> &mut Plane<T> {
        &mut self.planes[index]
    }

    /// All planes
    pub fn planes(&self) -> &[Plane<T>; 3] {
        &self.planes
    }

    /// Whether two frames can be combined sample for sample
    pub fn same_geometry(&self, other: &PlanarFrame<T>) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.subsampling == other.subsampling
    }

    /// Fail with `InvalidInput` unless `other` matches this frame's geometry
    pub fn ensure_same_geometry(&self, other: &PlanarFrame<T>) -> Result<()> {
        if self.same_geometry(other) {
            Ok(())
        } else {
            Err(Error::invalid_input(format!(
                "frame geometry mismatch: {}x{} vs {}x{}",
                self.width, self.height, other.width, other.height
            )))
        }
    }
}
