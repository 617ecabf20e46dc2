//! Cycle feature vectors
//!
//! One cadence cycle covers 10 fields. The matcher looks at those fields plus
//! two fields of context on each side, i.e. a 14-field window. Building it
//! needs 18 consecutive [`FieldCount`]s (two more on each side for the
//! neighbour terms), which are the field counts of frames `5c - 2 ..= 5c + 6`.

use super::flags::FieldCount;
use serde::{Deserialize, Serialize};

/// Fields in a feature window
pub const WINDOW: usize = 14;
/// Field counts consumed per window
pub const SAMPLES: usize = 18;
/// Offset of window position 0 inside the sample array
const LEAD: usize = 2;

/// Feature weighting parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    /// Weight of large combs in the magnitude series
    pub large_comb_weight: f32,
    /// Neighbour-sum allowance for the cost series, as a fraction of frame pixels
    pub neighbor_threshold: f32,
    /// Ratio denominator baseline, as a fraction of frame pixels
    pub baseline_ratio: f32,
}

impl Default for FeatureParams {
    fn default() -> Self {
        FeatureParams {
            large_comb_weight: 2.0,
            neighbor_threshold: 0.001,
            baseline_ratio: 0.001,
        }
    }
}

/// Feature series of one cycle window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CadenceFeatures {
    /// Small comb counts
    pub comb: [f32; WINDOW],
    /// Lower convex baseline of `comb`
    pub comb_base: [f32; WINDOW],
    /// Large comb counts
    pub large_comb: [f32; WINDOW],
    /// Lower convex baseline of `large_comb`
    pub large_comb_base: [f32; WINDOW],
    /// Motion counts
    pub motion: [f32; WINDOW],
    /// Motion seen from the split point: min of the motion on both sides
    pub split: [f32; WINDOW],
    /// Repeated-field indicator
    pub merge: [f32; WINDOW],
    /// `comb + weight * large_comb`
    pub magnitude: [f32; WINDOW],
    /// Magnitude relative to the neighbouring fields
    pub ratio: [f32; WINDOW],
    /// Confidence weight of a split in `[0, 1)`
    pub cost: [f32; WINDOW],
}

/// Builds [`CadenceFeatures`] from field counts
#[derive(Debug, Clone, Copy)]
pub struct CadenceFeatureBuilder {
    params: FeatureParams,
    pixels: f32,
}

impl CadenceFeatureBuilder {
    pub fn new(params: FeatureParams, width: usize, height: usize) -> Self {
        CadenceFeatureBuilder {
            params,
            pixels: (width * height) as f32,
        }
    }

    pub fn params(&self) -> &FeatureParams {
        &self.params
    }

    /// Build the feature window from 18 field counts
    pub fn build(&self, samples: &[FieldCount; SAMPLES]) -> CadenceFeatures {
        let mut f = CadenceFeatures::default();
        let w = self.params.large_comb_weight;
        let baseline = self.pixels * self.params.baseline_ratio;
        let allowance = self.pixels * self.params.neighbor_threshold;

        let magnitude =
            |s: usize| samples[s].comb as f32 + w * samples[s].large_comb as f32;

        for i in 0..WINDOW {
            let s = i + LEAD;
            let (prev, cur, next) = (samples[s - 1], samples[s], samples[s + 1]);

            f.comb[i] = cur.comb as f32;
            f.large_comb[i] = cur.large_comb as f32;
            f.motion[i] = cur.motion as f32;
            f.split[i] = prev.motion.min(cur.motion) as f32;

            f.merge[i] = if prev.motion > cur.motion && next.motion > cur.motion {
                let sum = (prev.motion + next.motion) as f32;
                (sum / (cur.motion as f32 * 2.0 + 0.1 * sum)).max(1.0) - 1.0
            } else {
                0.0
            };

            let neighbours = magnitude(s - 1) + magnitude(s + 1);
            f.magnitude[i] = magnitude(s);
            f.ratio[i] = f.magnitude[i] / (neighbours + baseline);

            let excess = (neighbours - allowance).max(0.0);
            f.cost[i] = if excess > 0.0 {
                excess / (excess + baseline)
            } else {
                0.0
            };
        }

        f.comb_base = calc_baseline(&f.comb);
        f.large_comb_base = calc_baseline(&f.large_comb);
        f
    }
}

/// Lower supporting line of a series
///
/// Walks the lower convex hull from the left and keeps the hull segment with
/// the flattest slope whose line lies on or below every sample. Falls back to
/// a flat line at the minimum when no segment qualifies.
pub fn calc_baseline(data: &[f32; WINDOW]) -> [f32; WINDOW] {
    let n = WINDOW;
    let mut best: Option<(f32, f32)> = None;

    let mut pos = 0;
    while pos + 1 < n {
        let mut slope = f32::MAX;
        let mut step = 1;
        for i in 1..n - pos {
            let a = (data[pos + i] - data[pos]) / i as f32;
            if a < slope {
                slope = a;
                step = i;
            }
        }

        let line = |i: usize| data[pos] + slope * (i as f32 - pos as f32);
        let supports = (0..n).all(|i| {
            let tol = 1e-4 * (1.0 + data[i].abs());
            data[i] + tol >= line(i)
        });
        if supports && best.map_or(true, |(s, _)| slope.abs() < s.abs()) {
            best = Some((slope, data[pos] - slope * pos as f32));
        }
        pos += step;
    }

    let mut out = [0.0; WINDOW];
    match best {
        Some((slope, intercept)) => {
            for (i, v) in out.iter_mut().enumerate() {
                *v = intercept + slope * i as f32;
            }
        }
        None => {
            let min = data.iter().copied().fold(f32::MAX, f32::min);
            out.fill(min);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(motion: i32, comb: i32, large: i32) -> FieldCount {
        FieldCount {
            motion,
            comb,
            large_comb: large,
        }
    }

    #[test]
    fn test_static_window_is_zero() {
        let builder = CadenceFeatureBuilder::new(FeatureParams::default(), 64, 64);
        let f = builder.build(&[FieldCount::default(); SAMPLES]);
        assert!(f.ratio.iter().all(|&r| r == 0.0));
        assert!(f.cost.iter().all(|&c| c == 0.0));
        assert!(f.merge.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_ratio_and_cost() {
        let builder = CadenceFeatureBuilder::new(FeatureParams::default(), 100, 100);
        let mut samples = [counts(0, 5, 0); SAMPLES];
        samples[5] = counts(0, 100, 20);
        let f = builder.build(&samples);

        // position 3 is sample 5
        assert_eq!(f.magnitude[3], 140.0);
        let expected = 140.0 / (5.0 + 5.0 + 10.0);
        assert!((f.ratio[3] - expected).abs() < 1e-6);
        // neighbours of position 2 include the spike
        let excess: f32 = 5.0 + 140.0 - 10.0;
        assert!((f.cost[2] - excess / (excess + 10.0)).abs() < 1e-6);
        // flat neighbours exactly at the allowance cost nothing
        assert_eq!(f.cost[10], 0.0);
    }

    #[test]
    fn test_split_and_merge() {
        let builder = CadenceFeatureBuilder::new(FeatureParams::default(), 64, 64);
        let mut samples = [counts(100, 0, 0); SAMPLES];
        samples[6] = counts(0, 0, 0);
        let f = builder.build(&samples);

        // sample 6 is position 4: a still field between moving ones
        assert_eq!(f.split[4], 0.0);
        assert_eq!(f.split[5], 0.0);
        assert_eq!(f.split[6], 100.0);
        let sum = 200.0f32;
        assert!((f.merge[4] - ((sum / (0.1 * sum)) - 1.0)).abs() < 1e-5);
        assert_eq!(f.merge[3], 0.0);
    }

    #[test]
    fn test_baseline_of_line() {
        let mut data = [0.0; WINDOW];
        for (i, v) in data.iter_mut().enumerate() {
            *v = 3.0 + i as f32;
        }
        let base = calc_baseline(&data);
        for i in 0..WINDOW {
            assert!((base[i] - data[i]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_baseline_below_spikes() {
        let mut data = [5.0; WINDOW];
        data[3] = 50.0;
        data[8] = 80.0;
        let base = calc_baseline(&data);
        for i in 0..WINDOW {
            assert!(base[i] <= data[i] + 1e-4);
            assert!((base[i] - 5.0).abs() < 1e-4);
        }
    }
}
