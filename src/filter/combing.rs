//! Combing block map
//!
//! The frame is covered by `BLOCK_SIZE`-pixel blocks placed every `OVERLAP`
//! pixels. Block `(bx, by)` of the map describes the block whose top-left
//! corner sits at `((bx - 1) * OVERLAP, (by - 1) * OVERLAP)`, so row and
//! column 0 never carry a score.

use crate::error::{Error, Result};
use crate::util::{nblocks, Plane};

/// Stride between blocks
pub const OVERLAP: usize = 8;
/// Block edge length
pub const BLOCK_SIZE: usize = OVERLAP * 2;
/// Pixels counted as one unit along a row
const UNIT: usize = 4;

/// Block flagged by the weak ratio
pub const SUSPECT: u8 = 1;
/// Block flagged by the strong ratio
pub const CONFIRMED: u8 = 2;

/// Per-block combing flags of one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombingBlockMap {
    blocks_x: usize,
    blocks_y: usize,
    data: Vec<u8>,
}

impl CombingBlockMap {
    /// Empty map for a `width` x `height` frame
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_blocks(nblocks(width, OVERLAP), nblocks(height, OVERLAP))
    }

    /// Empty map of `blocks_x` x `blocks_y` blocks
    pub fn with_blocks(blocks_x: usize, blocks_y: usize) -> Self {
        CombingBlockMap {
            blocks_x,
            blocks_y,
            data: vec![0; blocks_x * blocks_y],
        }
    }

    pub fn blocks_x(&self) -> usize {
        self.blocks_x
    }

    pub fn blocks_y(&self) -> usize {
        self.blocks_y
    }

    #[inline]
    pub fn get(&self, bx: usize, by: usize) -> u8 {
        self.data[by * self.blocks_x + bx]
    }

    #[inline]
    pub fn set(&mut self, bx: usize, by: usize, value: u8) {
        self.data[by * self.blocks_x + bx] = value;
    }

    /// Whether no block is flagged
    pub fn is_clean(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    /// Number of flagged blocks
    pub fn dirty_blocks(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Coordinates of every flagged block
    pub fn iter_dirty(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(move |(i, _)| (i % self.blocks_x, i / self.blocks_x))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Builds block maps from per-pixel comb flags
#[derive(Debug, Clone, Copy)]
pub struct CombingBlockClassifier {
    ratio1: i32,
    ratio2: i32,
}

impl CombingBlockClassifier {
    /// Fails with `Config` unless `ratio1 < ratio2`
    pub fn new(ratio1: i32, ratio2: i32) -> Result<Self> {
        if ratio1 >= ratio2 {
            return Err(Error::config(format!(
                "ratio1 must be less than ratio2 ({} >= {})",
                ratio1, ratio2
            )));
        }
        Ok(CombingBlockClassifier { ratio1, ratio2 })
    }

    /// Classify, denoise and dilate
    pub fn block_map(&self, flags: &Plane<u8>) -> CombingBlockMap {
        let mut map = self.classify(flags);
        denoise(&mut map);
        dilate(&mut map);
        map
    }

    /// Score every overlapping block
    ///
    /// A block counts the 4-pixel units of its rows holding any flag.
    pub fn classify(&self, flags: &Plane<u8>) -> CombingBlockMap {
        let width = flags.width();
        let height = flags.height();
        let mut map = CombingBlockMap::new(width, height);

        for by in 0..map.blocks_y.saturating_sub(1) {
            let y0 = by * OVERLAP;
            let y1 = (y0 + BLOCK_SIZE).min(height);
            for bx in 0..map.blocks_x.saturating_sub(1) {
                let x0 = bx * OVERLAP;
                let x1 = (x0 + BLOCK_SIZE).min(width);
                let mut sum = 0;
                for y in y0..y1 {
                    let row = &flags.row(y)[x0..x1];
                    sum += row
                        .chunks(UNIT)
                        .filter(|unit| unit.iter().any(|&f| f != 0))
                        .count() as i32;
                }
                let value = (sum > self.ratio1) as u8 | ((sum > self.ratio2) as u8) << 1;
                map.set(bx + 1, by + 1, value);
            }
        }
        map
    }
}

/// Clear suspect blocks without a confirmed block within two blocks
pub fn denoise(map: &mut CombingBlockMap) {
    let (nx, ny) = (map.blocks_x, map.blocks_y);
    for by in 1..ny {
        for bx in 1..nx {
            if map.get(bx, by) != SUSPECT {
                continue;
            }
            let xs = bx.saturating_sub(2).max(1)..(bx + 3).min(nx);
            let confirmed = (by.saturating_sub(2).max(1)..(by + 3).min(ny))
                .any(|y| xs.clone().any(|x| map.get(x, y) & CONFIRMED != 0));
            if !confirmed {
                map.set(bx, by, 0);
            }
        }
    }
}

/// Spread flags one block left, then one block up
///
/// Row and column 0 are cleared first and never receive flags.
pub fn dilate(map: &mut CombingBlockMap) {
    let (nx, ny) = (map.blocks_x, map.blocks_y);
    for bx in 0..nx {
        map.set(bx, 0, 0);
    }
    for by in 0..ny {
        map.set(0, by, 0);
    }
    for by in 1..ny {
        for bx in 2..nx {
            let v = map.get(bx - 1, by) | map.get(bx, by);
            map.set(bx - 1, by, v);
        }
    }
    for by in 2..ny {
        for bx in 1..nx {
            let v = map.get(bx, by - 1) | map.get(bx, by);
            map.set(bx, by - 1, v);
        }
    }
}
