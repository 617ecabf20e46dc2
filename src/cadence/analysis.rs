//! Field and cycle analysis stages
//!
//! [`FieldAnalysis`] turns each interlaced frame into two [`FieldCount`]s.
//! [`CycleAnalyzer`] gathers the 18 counts around one cycle, builds its
//! features and matches them, producing one [`MatchResult`] per 5 source
//! frames. Results can be kept as a [`CadenceTrack`] or serialized into the
//! fixed-size analysis rasters used to pass them between processes.

use super::features::{CadenceFeatureBuilder, CadenceFeatures, SAMPLES};
use super::flags::{FieldCount, FieldFlagAnalyzer};
use super::matcher::{CadenceMatcher, MatchResult};
use super::pattern::PulldownPatternCatalog;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::source::{clamp_index, FrameSource};
use crate::filter::overlay::visualize_field_flags;
use crate::util::{nblocks, Pixel, PlanarFrame};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rayon::prelude::*;
use serde::Serialize;
use std::io::Cursor;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

/// Source frames per cadence cycle
pub const CYCLE_SOURCE_FRAMES: usize = 5;
/// Leading frames of context fetched before a cycle
const LEAD_FRAMES: i64 = 2;

/// Per-frame field counts of an interlaced source
pub struct FieldAnalysis<T, S> {
    source: S,
    analyzer: FieldFlagAnalyzer,
    _pixel: PhantomData<T>,
}

impl<T: Pixel, S: FrameSource<T>> FieldAnalysis<T, S> {
    pub fn new(source: S, config: &AnalysisConfig) -> Self {
        let depth = source.info().bit_depth;
        FieldAnalysis {
            source,
            analyzer: FieldFlagAnalyzer::new(config.flags, depth),
            _pixel: PhantomData,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Counts of both fields of frame `n`, first field first
    pub fn get(&self, n: i64) -> Result<[FieldCount; 2]> {
        let f0 = self.source.get_frame(n)?;
        let f1 = self.source.get_frame(n + 1)?;
        self.analyzer
            .field_counts(&f0, &f1, self.source.field_order(n))
    }

    /// Flag overlay of frame `n` against `n + 1`
    pub fn visualize(&self, n: i64) -> Result<PlanarFrame<T>> {
        let f0 = self.source.get_frame(n)?;
        let f1 = self.source.get_frame(n + 1)?;
        let flags = self
            .analyzer
            .flag_frame(&f0, &f1, self.source.field_order(n))?;
        let info = self.source.info();
        Ok(visualize_field_flags(&flags, info.subsampling, info.bit_depth))
    }
}

/// Matches every cadence cycle of an interlaced source
pub struct CycleAnalyzer<'c, T, S> {
    fields: FieldAnalysis<T, S>,
    builder: CadenceFeatureBuilder,
    matcher: CadenceMatcher<'c>,
    width: usize,
    height: usize,
}

impl<'c, T: Pixel, S: FrameSource<T>> CycleAnalyzer<'c, T, S> {
    pub fn new(source: S, catalog: &'c PulldownPatternCatalog, config: &AnalysisConfig) -> Self {
        let info = source.info();
        info!(
            "cycle analysis: {}x{}, {} frames, {} cycles, {:?} strategy",
            info.width,
            info.height,
            info.num_frames,
            nblocks(info.num_frames, CYCLE_SOURCE_FRAMES),
            config.matcher.strategy
        );
        CycleAnalyzer {
            fields: FieldAnalysis::new(source, config),
            builder: CadenceFeatureBuilder::new(config.features, info.width, info.height),
            matcher: CadenceMatcher::new(catalog, config.matcher),
            width: info.width,
            height: info.height,
        }
    }

    pub fn source(&self) -> &S {
        self.fields.source()
    }

    /// Number of cycles covering the source
    pub fn num_cycles(&self) -> usize {
        nblocks(self.fields.source().num_frames(), CYCLE_SOURCE_FRAMES)
    }

    /// The 18 field counts around `cycle`
    pub fn samples(&self, cycle: i64) -> Result<[FieldCount; SAMPLES]> {
        let mut samples = [FieldCount::default(); SAMPLES];
        let first = cycle * CYCLE_SOURCE_FRAMES as i64 - LEAD_FRAMES;
        for (k, pair) in samples.chunks_exact_mut(2).enumerate() {
            pair.copy_from_slice(&self.fields.get(first + k as i64)?);
        }
        Ok(samples)
    }

    /// Feature window of `cycle`
    pub fn features(&self, cycle: i64) -> Result<CadenceFeatures> {
        Ok(self.builder.build(&self.samples(cycle)?))
    }

    /// Match one cycle
    pub fn analyze(&self, cycle: i64) -> Result<MatchResult> {
        let features = self.features(cycle)?;
        let result = self.matcher.matching(&features, self.width, self.height)?;
        debug!(
            "cycle {}: pattern {} cost {:.3} score {:.3}",
            cycle, result.pattern, result.cost, result.score
        );
        Ok(result)
    }

    /// Match every cycle in parallel
    pub fn analyze_all(&self) -> Result<CadenceTrack> {
        let cycles = (0..self.num_cycles() as i64)
            .into_par_iter()
            .map(|cycle| self.analyze(cycle))
            .collect::<Result<Vec<_>>>()?;
        Ok(CadenceTrack::new(cycles))
    }
}

/// Supplies the match result of a cycle
pub trait CycleSource: Send + Sync {
    /// Result for `cycle`, clamped into the track
    fn cycle(&self, cycle: i64) -> Result<MatchResult>;

    /// Number of cycles
    fn num_cycles(&self) -> usize;
}

impl<'c, T: Pixel, S: FrameSource<T>> CycleSource for CycleAnalyzer<'c, T, S> {
    fn cycle(&self, cycle: i64) -> Result<MatchResult> {
        let n = clamp_index(cycle, CycleAnalyzer::num_cycles(self));
        self.analyze(n as i64)
    }

    fn num_cycles(&self) -> usize {
        CycleAnalyzer::num_cycles(self)
    }
}

impl<C: CycleSource + ?Sized> CycleSource for Arc<C> {
    fn cycle(&self, cycle: i64) -> Result<MatchResult> {
        (**self).cycle(cycle)
    }

    fn num_cycles(&self) -> usize {
        (**self).num_cycles()
    }
}

/// Precomputed match results, one per cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CadenceTrack {
    cycles: Vec<MatchResult>,
}

impl CadenceTrack {
    pub fn new(cycles: Vec<MatchResult>) -> Self {
        CadenceTrack { cycles }
    }

    pub fn cycles(&self) -> &[MatchResult] {
        &self.cycles
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Readable per-cycle summary
    pub fn report(&self, catalog: &PulldownPatternCatalog) -> Vec<CycleReport> {
        self.cycles
            .iter()
            .enumerate()
            .map(|(cycle, r)| CycleReport {
                cycle,
                pattern: r.pattern,
                name: catalog.describe(r.pattern),
                progressive: catalog.is_progressive(r.pattern),
                cost: r.cost,
                score: r.score,
            })
            .collect()
    }

    /// Encode every cycle as an analysis raster
    pub fn to_rasters(&self) -> Result<Vec<AnalysisRaster>> {
        self.cycles.iter().map(encode_match).collect()
    }

    /// Decode a track from analysis rasters
    pub fn from_rasters(rasters: &[AnalysisRaster]) -> Result<Self> {
        let cycles = rasters.iter().map(decode_match).collect::<Result<Vec<_>>>()?;
        Ok(CadenceTrack::new(cycles))
    }
}

impl CycleSource for CadenceTrack {
    fn cycle(&self, cycle: i64) -> Result<MatchResult> {
        if self.cycles.is_empty() {
            return Err(Error::source("empty cadence track"));
        }
        Ok(self.cycles[clamp_index(cycle, self.cycles.len())])
    }

    fn num_cycles(&self) -> usize {
        self.cycles.len()
    }
}

/// One line of the `analyze` report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: usize,
    pub pattern: usize,
    pub name: String,
    pub progressive: bool,
    pub cost: f32,
    pub score: f32,
}

/// Pixels per raster row (4 bytes each)
pub const RASTER_WIDTH: usize = 16;
const RASTER_ROW_BYTES: usize = RASTER_WIDTH * 4;
const FIELD_RECORD_BYTES: usize = 6 * 4;
const MATCH_RECORD_BYTES: usize = 4 + 4;

/// A small 32-bit-per-pixel raster carrying a binary record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRaster {
    height: usize,
    data: Vec<u8>,
}

impl AnalysisRaster {
    /// Zeroed raster tall enough for `bytes`
    pub fn for_bytes(bytes: usize) -> Self {
        let height = nblocks(bytes, RASTER_ROW_BYTES);
        AnalysisRaster {
            height,
            data: vec![0; height * RASTER_ROW_BYTES],
        }
    }

    /// Wrap raw raster bytes
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.is_empty() || data.len() % RASTER_ROW_BYTES != 0 {
            return Err(Error::invalid_input(format!(
                "analysis raster of {} bytes is not whole {}-byte rows",
                data.len(),
                RASTER_ROW_BYTES
            )));
        }
        Ok(AnalysisRaster {
            height: data.len() / RASTER_ROW_BYTES,
            data,
        })
    }

    pub fn width(&self) -> usize {
        RASTER_WIDTH
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn record(&self, bytes: usize) -> Result<Cursor<&[u8]>> {
        if self.data.len() < bytes {
            return Err(Error::invalid_input(format!(
                "analysis raster holds {} bytes, record needs {}",
                self.data.len(),
                bytes
            )));
        }
        Ok(Cursor::new(&self.data[..bytes]))
    }
}

/// Pack the two field counts of a frame
pub fn encode_field_counts(counts: &[FieldCount; 2]) -> Result<AnalysisRaster> {
    let mut raster = AnalysisRaster::for_bytes(FIELD_RECORD_BYTES);
    let mut w = Cursor::new(&mut raster.data[..]);
    for c in counts {
        w.write_i32::<LittleEndian>(c.motion)?;
        w.write_i32::<LittleEndian>(c.comb)?;
        w.write_i32::<LittleEndian>(c.large_comb)?;
    }
    Ok(raster)
}

/// Unpack the two field counts of a frame
pub fn decode_field_counts(raster: &AnalysisRaster) -> Result<[FieldCount; 2]> {
    let mut r = raster.record(FIELD_RECORD_BYTES)?;
    let mut counts = [FieldCount::default(); 2];
    for c in counts.iter_mut() {
        c.motion = r.read_i32::<LittleEndian>()?;
        c.comb = r.read_i32::<LittleEndian>()?;
        c.large_comb = r.read_i32::<LittleEndian>()?;
    }
    Ok(counts)
}

/// Pack a cycle result as `{pattern: i32, cost: f32}`
pub fn encode_match(result: &MatchResult) -> Result<AnalysisRaster> {
    let pattern = i32::try_from(result.pattern)
        .map_err(|_| Error::invalid_input(format!("pattern index {} too large", result.pattern)))?;
    let mut raster = AnalysisRaster::for_bytes(MATCH_RECORD_BYTES);
    let mut w = Cursor::new(&mut raster.data[..]);
    w.write_i32::<LittleEndian>(pattern)?;
    w.write_f32::<LittleEndian>(result.cost)?;
    Ok(raster)
}

/// Unpack a cycle result; the score is not part of the record
pub fn decode_match(raster: &AnalysisRaster) -> Result<MatchResult> {
    let mut r = raster.record(MATCH_RECORD_BYTES)?;
    let pattern = r.read_i32::<LittleEndian>()?;
    let cost = r.read_f32::<LittleEndian>()?;
    let pattern = usize::try_from(pattern)
        .map_err(|_| Error::invalid_input(format!("negative pattern index {}", pattern)))?;
    Ok(MatchResult {
        pattern,
        cost,
        score: 0.0,
    })
}
