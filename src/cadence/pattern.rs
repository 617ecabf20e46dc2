//! Pulldown pattern tables
//!
//! A pattern is the list of field counts per output frame over one cycle of
//! 10 fields (`2-3-2-3` is classic 3:2 pulldown). The table stores four
//! repeats of the cycle so that any 14-field window starting two fields before
//! a phase inside the second repeat stays in bounds.
//!
//! The catalog flattens every (pattern, phase) pair into one global index.
//! Film cadences come first and pure progressive last, so the matchers'
//! first-maximum tie break prefers pulldown.

use super::features::WINDOW;
use super::mapper::{self, Frame24Info};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use tracing::debug;

/// Fields per cadence cycle
pub const CYCLE_FIELDS: usize = 10;
/// Output frames per cadence cycle
pub const CYCLE_FRAMES: usize = 4;
/// Stored cycle repeats
const REPEATS: usize = 4;
const TABLE_LEN: usize = CYCLE_FIELDS * REPEATS;
/// Largest accepted field shift in either direction
pub const MAX_FIELD_SHIFT: i32 = 8;

/// Role of one field in a cadence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternField {
    /// Last field of an output frame
    pub split: bool,
    /// Field repeated into a third (or fourth) field slot
    pub merge: bool,
}

/// One cadence table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulldownPattern {
    counts: Vec<usize>,
    fields: [PatternField; TABLE_LEN],
    period: usize,
    field_shift: i32,
}

impl PulldownPattern {
    /// Build a pattern from per-frame field counts
    ///
    /// The counts must sum to one cycle and every frame needs at least two
    /// fields.
    pub fn new(counts: &[usize]) -> Result<Self> {
        let total: usize = counts.iter().sum();
        if total != CYCLE_FIELDS {
            return Err(Error::config(format!(
                "sum of field counts {:?} is {}, must be {}",
                counts, total, CYCLE_FIELDS
            )));
        }
        if let Some(&nf) = counts.iter().find(|&&nf| nf < 2) {
            return Err(Error::config(format!(
                "frame with {} fields in pattern {:?}",
                nf, counts
            )));
        }

        let mut fields = [PatternField::default(); TABLE_LEN];
        let mut fstart = 0;
        for _ in 0..REPEATS {
            for &nf in counts {
                for field in &mut fields[fstart..fstart + nf - 2] {
                    field.merge = true;
                }
                fields[fstart + nf - 1].split = true;
                fstart += nf;
            }
        }

        // smallest divisor of the cycle the table repeats with
        let period = (1..=CYCLE_FIELDS)
            .filter(|p| CYCLE_FIELDS % p == 0)
            .find(|&p| (0..TABLE_LEN - p).all(|i| fields[i] == fields[i + p]))
            .unwrap_or(CYCLE_FIELDS);

        Ok(PulldownPattern {
            counts: counts.to_vec(),
            fields,
            period,
            field_shift: 0,
        })
    }

    /// Builder: move the window by whole fields
    pub fn with_field_shift(mut self, field_shift: i32) -> Result<Self> {
        if field_shift.abs() > MAX_FIELD_SHIFT {
            return Err(Error::config(format!(
                "field shift {} outside -{}..={}",
                field_shift, MAX_FIELD_SHIFT, MAX_FIELD_SHIFT
            )));
        }
        self.field_shift = field_shift;
        Ok(self)
    }

    /// Field counts per output frame
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Distinct phases of this pattern
    pub fn period(&self) -> usize {
        self.period
    }

    pub fn field_shift(&self) -> i32 {
        self.field_shift
    }

    /// A pattern without repeated fields
    pub fn is_progressive(&self) -> bool {
        self.counts.iter().all(|&nf| nf == 2)
    }

    /// Display name such as `2-3-2-3`
    pub fn name(&self) -> String {
        self.counts
            .iter()
            .map(|nf| nf.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// The 14 fields starting two fields before `phase`
    pub fn window(&self, phase: usize) -> Result<&[PatternField]> {
        if phase >= CYCLE_FIELDS {
            return Err(Error::pattern_table(format!(
                "phase {} outside the cycle",
                phase
            )));
        }
        let start = (CYCLE_FIELDS + phase) as i64 - 2 + self.field_shift as i64;
        if start < 0 || start as usize + WINDOW > TABLE_LEN {
            return Err(Error::pattern_table(format!(
                "window at {} leaves the table",
                start
            )));
        }
        let start = start as usize;
        Ok(&self.fields[start..start + WINDOW])
    }
}

/// A (pattern, phase) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Index into the catalog's pattern list
    pub pattern: usize,
    /// Phase within the pattern's period
    pub phase: usize,
}

/// All supported cadences, indexable by global pattern index
#[derive(Debug, Clone)]
pub struct PulldownPatternCatalog {
    patterns: Vec<PulldownPattern>,
    entries: Vec<CatalogEntry>,
}

impl PulldownPatternCatalog {
    /// Catalog over the given patterns, in order
    pub fn from_patterns(patterns: Vec<PulldownPattern>) -> Self {
        let entries = patterns
            .iter()
            .enumerate()
            .flat_map(|(pattern, p)| {
                (0..p.period()).map(move |phase| CatalogEntry { pattern, phase })
            })
            .collect();
        PulldownPatternCatalog { patterns, entries }
    }

    /// 2-3-2-3, 2-2-3-3, 2-2-2-4 and progressive
    pub fn standard() -> Result<Self> {
        let patterns = [
            &[2, 3, 2, 3][..],
            &[2, 2, 3, 3][..],
            &[2, 2, 2, 4][..],
            &[2, 2, 2, 2, 2][..],
        ]
        .iter()
        .map(|counts| PulldownPattern::new(counts))
        .collect::<Result<Vec<_>>>()?;

        let catalog = Self::from_patterns(patterns);
        debug!("pulldown catalog: {} entries", catalog.len());
        Ok(catalog)
    }

    /// Number of global entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn patterns(&self) -> &[PulldownPattern] {
        &self.patterns
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entry for a global index
    pub fn entry(&self, index: usize) -> Result<CatalogEntry> {
        self.entries.get(index).copied().ok_or_else(|| {
            Error::pattern_table(format!(
                "pattern index {} outside catalog of {}",
                index,
                self.entries.len()
            ))
        })
    }

    /// Pattern behind a global index
    pub fn pattern(&self, index: usize) -> Result<&PulldownPattern> {
        let entry = self.entry(index)?;
        Ok(&self.patterns[entry.pattern])
    }

    /// 14-field window of a global index
    pub fn window(&self, index: usize) -> Result<&[PatternField]> {
        let entry = self.entry(index)?;
        self.patterns[entry.pattern].window(entry.phase)
    }

    pub fn is_progressive(&self, index: usize) -> bool {
        self.pattern(index).map_or(false, |p| p.is_progressive())
    }

    /// Readable label such as `2-3-2-3 phase 1`
    pub fn describe(&self, index: usize) -> String {
        match self.entry(index) {
            Ok(entry) => format!(
                "{} phase {}",
                self.patterns[entry.pattern].name(),
                entry.phase
            ),
            Err(_) => format!("invalid pattern {}", index),
        }
    }

    /// Fields woven into 24p frame `n24` under pattern `index`
    pub fn get_frame24(&self, index: usize, n24: i64) -> Result<Frame24Info> {
        let pattern = self.pattern(index)?;
        mapper::get_frame24(self.window(index)?, pattern.field_shift(), n24)
    }

    /// 24p frame containing native field position `n60` under pattern `index`
    pub fn get_frame60(&self, index: usize, n60: i64) -> Result<Frame24Info> {
        let pattern = self.pattern(index)?;
        Ok(mapper::get_frame60(
            self.window(index)?,
            pattern.field_shift(),
            n60,
        ))
    }
}

static CATALOG: Lazy<PulldownPatternCatalog> = Lazy::new(|| {
    PulldownPatternCatalog::standard().expect("built-in pulldown patterns sum to one cycle")
});

/// The process-wide standard catalog
pub fn catalog() -> &'static PulldownPatternCatalog {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_layout() {
        let cat = catalog();
        assert_eq!(cat.len(), 27);
        let periods: Vec<_> = cat.patterns().iter().map(|p| p.period()).collect();
        assert_eq!(periods, vec![5, 10, 10, 2]);
        assert_eq!(cat.entry(0).unwrap(), CatalogEntry { pattern: 0, phase: 0 });
        assert_eq!(cat.entry(5).unwrap(), CatalogEntry { pattern: 1, phase: 0 });
        assert_eq!(cat.entry(26).unwrap(), CatalogEntry { pattern: 3, phase: 1 });
        assert!(cat.is_progressive(25));
        assert!(!cat.is_progressive(24));
        assert!(cat.entry(27).is_err());
    }

    #[test]
    fn test_film_counts_sum_to_cycle() {
        for p in catalog().patterns() {
            assert_eq!(p.counts().iter().sum::<usize>(), CYCLE_FIELDS);
        }
    }

    #[test]
    fn test_malformed_pattern_rejected() {
        let err = PulldownPattern::new(&[2, 3, 3, 3]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(PulldownPattern::new(&[1, 3, 3, 3]).is_err());
    }

    #[test]
    fn test_split_and_merge_layout() {
        let p = PulldownPattern::new(&[2, 3, 2, 3]).unwrap();
        let w = p.window(2).unwrap();
        // window starts at table position 10, the start of a cycle
        let splits: Vec<usize> = (0..WINDOW).filter(|&i| w[i].split).collect();
        assert_eq!(splits, vec![1, 4, 6, 9, 11]);
        let merges: Vec<usize> = (0..WINDOW).filter(|&i| w[i].merge).collect();
        assert_eq!(merges, vec![2, 7, 12]);
    }

    #[test]
    fn test_window_bounds() {
        let p = PulldownPattern::new(&[2, 2, 2, 4]).unwrap();
        assert!(p.window(9).is_ok());
        assert!(p.window(10).is_err());
        let shifted = p.clone().with_field_shift(8).unwrap();
        assert!(shifted.window(9).is_ok());
        assert!(p.clone().with_field_shift(9).is_err());
        let back = p.with_field_shift(-8).unwrap();
        assert_eq!(back.window(0).unwrap().len(), WINDOW);
    }

    #[test]
    fn test_names() {
        let cat = catalog();
        assert_eq!(cat.describe(6), "2-2-3-3 phase 1");
        assert_eq!(cat.pattern(25).unwrap().name(), "2-2-2-2-2");
    }
}
