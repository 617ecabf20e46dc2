//! Cadence matching
//!
//! Two strategies pick the catalog entry that best explains one cycle's
//! features:
//!
//! - [`MatchStrategy::Scored`] ranks every entry, progressive ones included,
//!   by `sum(ratio at splits) - sum(ratio elsewhere)`.
//! - [`MatchStrategy::Cascade`] walks a ladder of fixed thresholds over comb,
//!   large comb, merge and split scores and lets progressive content exit
//!   early before any film entry is considered.
//!
//! Both report the same cost: how far the chosen split points fall short of a
//! confident ratio, weighted by how much neighbouring combing there was to
//! judge from. Each cycle is matched on its own.

use super::features::{CadenceFeatures, WINDOW};
use super::pattern::{PatternField, PulldownPatternCatalog};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MOVE_RATIO: f32 = 0.002;
const COMB_RATIO: f32 = 0.002;
const COMB_SCORE: f32 = 2.0;
const LARGE_COMB_SCORE: f32 = 4.0;
const MERGE_SCORE: f32 = 5.0;

/// How a cycle is matched against the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Full scoring of every catalog entry
    #[default]
    Scored,
    /// Fixed-threshold ladder with progressive early exit
    Cascade,
}

/// Matcher parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherParams {
    pub strategy: MatchStrategy,
    /// Split ratio considered fully confident
    pub cost_threshold: f32,
}

impl Default for MatcherParams {
    fn default() -> Self {
        MatcherParams {
            strategy: MatchStrategy::Scored,
            cost_threshold: 1.0,
        }
    }
}

/// Chosen pattern of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Global catalog index
    pub pattern: usize,
    /// Low-confidence penalty, 0 when every split is clear
    pub cost: f32,
    /// Score of the winning entry under the strategy used
    pub score: f32,
}

/// Picks the best catalog entry for a feature window
#[derive(Debug, Clone, Copy)]
pub struct CadenceMatcher<'a> {
    catalog: &'a PulldownPatternCatalog,
    params: MatcherParams,
}

impl<'a> CadenceMatcher<'a> {
    pub fn new(catalog: &'a PulldownPatternCatalog, params: MatcherParams) -> Self {
        CadenceMatcher { catalog, params }
    }

    pub fn params(&self) -> &MatcherParams {
        &self.params
    }

    /// Match one cycle
    pub fn matching(
        &self,
        features: &CadenceFeatures,
        width: usize,
        height: usize,
    ) -> Result<MatchResult> {
        let (pattern, score) = match self.params.strategy {
            MatchStrategy::Scored => self.scored(features)?,
            MatchStrategy::Cascade => self.cascade(features, width, height)?,
        };
        let window = self.catalog.window(pattern)?;
        let cost = split_cost(
            window,
            &features.ratio,
            &features.cost,
            self.params.cost_threshold,
        );
        debug!(
            "matched {} (score {:.3}, cost {:.3})",
            self.catalog.describe(pattern),
            score,
            cost
        );
        Ok(MatchResult {
            pattern,
            cost,
            score,
        })
    }

    fn scored(&self, features: &CadenceFeatures) -> Result<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for index in 0..self.catalog.len() {
            let window = self.catalog.window(index)?;
            let score = window
                .iter()
                .zip(features.ratio.iter())
                .map(|(field, &r)| if field.split { r } else { -r })
                .sum::<f32>();
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((index, score));
            }
        }
        Ok(best.unwrap_or((0, 0.0)))
    }

    fn cascade(
        &self,
        features: &CadenceFeatures,
        width: usize,
        height: usize,
    ) -> Result<(usize, f32)> {
        let pixels = (WINDOW * width * height).max(1) as f32;
        let comb_ratio = features.comb.iter().sum::<f32>() / pixels;
        let move_ratio = features.motion.iter().sum::<f32>() / pixels;
        let moving = move_ratio >= MOVE_RATIO;

        let mut film = Vec::with_capacity(self.catalog.len());
        let mut progressive = Vec::new();
        for index in 0..self.catalog.len() {
            let window = self.catalog.window(index)?;
            let scores = EntryScores {
                index,
                comb: split_score(window, &features.comb, None),
                comb_base: split_score(window, &features.comb, Some(&features.comb_base)),
                large_comb: split_score(window, &features.large_comb, None),
                large_comb_base: split_score(
                    window,
                    &features.large_comb,
                    Some(&features.large_comb_base),
                ),
                split: split_score(window, &features.split, None),
                merge: merge_score(window, &features.merge),
            };
            if self.catalog.is_progressive(index) {
                progressive.push(scores);
            } else {
                film.push(scores);
            }
        }

        let best_film_comb = argmax(&film, |s| s.comb);
        if let Some(p) = argmax(&progressive, |s| s.comb) {
            let beats_film = best_film_comb.map_or(true, |f| p.comb > f.comb);
            if moving && p.comb >= COMB_SCORE && beats_film {
                return Ok((p.index, p.comb));
            }
        }

        if moving {
            if let Some(best) = best_film_comb.filter(|s| s.comb >= COMB_SCORE) {
                return Ok((best.index, best.comb));
            }
            if let Some(best) = argmax(&film, |s| s.large_comb).filter(|s| s.large_comb >= LARGE_COMB_SCORE) {
                return Ok((best.index, best.large_comb));
            }
        }

        let merges = features.merge.iter().filter(|&&m| m > 1.0).count();
        if merges == 3 || merges == 4 {
            if let Some(best) = argmax(&film, |s| s.merge).filter(|s| s.merge >= MERGE_SCORE) {
                return Ok((best.index, best.merge));
            }
        }

        // fixed overlays (captions, logos) cancel out against the baseline
        let combined = |s: &EntryScores| {
            let comb = if comb_ratio > COMB_RATIO {
                s.comb_base
            } else if !moving {
                s.large_comb_base
            } else {
                s.comb_base + s.large_comb_base
            };
            s.split + comb
        };
        let best = argmax(&film, |s| combined(s)).or_else(|| argmax(&progressive, |s| combined(s)));
        Ok(best.map_or((0, 0.0), |s| (s.index, combined(s))))
    }
}

#[derive(Debug, Clone, Copy)]
struct EntryScores {
    index: usize,
    comb: f32,
    comb_base: f32,
    large_comb: f32,
    large_comb_base: f32,
    split: f32,
    merge: f32,
}

fn argmax<'s>(
    scores: &'s [EntryScores],
    key: impl Fn(&EntryScores) -> f32,
) -> Option<&'s EntryScores> {
    let mut best: Option<(&EntryScores, f32)> = None;
    for s in scores {
        let v = key(s);
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((s, v));
        }
    }
    best.map(|(s, _)| s)
}

fn contrast(on: f32, n_on: usize, off: f32, n_off: usize) -> f32 {
    let on = if n_on > 0 { on / n_on as f32 } else { 0.0 };
    let off = if n_off > 0 { off / n_off as f32 } else { 0.0 };
    if on == 0.0 && off == 0.0 {
        return 0.0;
    }
    on / (off + 0.1 * on)
}

/// Mean at split points over mean elsewhere, optionally baseline corrected
pub fn split_score(window: &[PatternField], values: &[f32; WINDOW], base: Option<&[f32; WINDOW]>) -> f32 {
    let (mut on, mut n_on, mut off, mut n_off) = (0.0, 0, 0.0, 0);
    for (i, field) in window.iter().enumerate().take(WINDOW) {
        let v = values[i] - base.map_or(0.0, |b| b[i]);
        if field.split {
            on += v;
            n_on += 1;
        } else {
            off += v;
            n_off += 1;
        }
    }
    contrast(on, n_on, off, n_off)
}

/// Mean at merge points over mean elsewhere
pub fn merge_score(window: &[PatternField], merge: &[f32; WINDOW]) -> f32 {
    let (mut on, mut n_on, mut off, mut n_off) = (0.0, 0, 0.0, 0);
    for (field, &v) in window.iter().zip(merge.iter()) {
        if field.merge {
            on += v;
            n_on += 1;
        } else {
            off += v;
            n_off += 1;
        }
    }
    contrast(on, n_on, off, n_off)
}

/// Penalty of the split points whose ratio falls below `threshold`
pub fn split_cost(
    window: &[PatternField],
    ratio: &[f32; WINDOW],
    cost: &[f32; WINDOW],
    threshold: f32,
) -> f32 {
    let mut nsplit = 0;
    let mut sum = 0.0;
    for (i, field) in window.iter().enumerate().take(WINDOW) {
        if !field.split {
            continue;
        }
        nsplit += 1;
        if ratio[i] < threshold {
            sum += (threshold - ratio[i]) * cost[i];
        }
    }
    if nsplit == 0 {
        0.0
    } else {
        sum / nsplit as f32
    }
}
