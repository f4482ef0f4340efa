//! Statistics Calculator Module
//! Descriptive statistics, box summaries, moving averages and seeded sampling.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use statrs::statistics::Statistics;

/// Whisker reach as a multiple of the interquartile range.
pub const WHISKER_IQR_FACTOR: f64 = 1.5;

/// Summary statistics for one group of values.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1). NaN with fewer than two values.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
}

impl Default for GroupStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            q1: f64::NAN,
            q3: f64::NAN,
        }
    }
}

/// Box-and-whisker geometry for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Lowest value within `q1 - 1.5 * IQR`.
    pub whisker_low: f64,
    /// Highest value within `q3 + 1.5 * IQR`.
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

/// A sampled point with its horizontal jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitteredPoint {
    pub value: f64,
    pub offset: f64,
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> GroupStats {
        let n = values.len();
        if n == 0 {
            return GroupStats::default();
        }

        let sorted = Self::sorted(values);
        let median = Self::percentile(&sorted, 50.0);
        let std = if n > 1 { values.iter().std_dev() } else { f64::NAN };

        GroupStats {
            count: n,
            mean: values.iter().mean(),
            median,
            std,
            min: sorted[0],
            max: sorted[n - 1],
            q1: Self::percentile(&sorted, 25.0),
            q3: Self::percentile(&sorted, 75.0),
        }
    }

    /// Quartiles, whiskers and outliers. `None` for an empty group.
    pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
        if values.is_empty() {
            return None;
        }

        let sorted = Self::sorted(values);
        let q1 = Self::percentile(&sorted, 25.0);
        let median = Self::percentile(&sorted, 50.0);
        let q3 = Self::percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let low_fence = q1 - WHISKER_IQR_FACTOR * iqr;
        let high_fence = q3 + WHISKER_IQR_FACTOR * iqr;

        let whisker_low = sorted
            .iter()
            .copied()
            .find(|&v| v >= low_fence)
            .unwrap_or(q1);
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= high_fence)
            .unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&v| v < whisker_low || v > whisker_high)
            .collect();

        Some(BoxSummary {
            q1,
            median,
            q3,
            whisker_low,
            whisker_high,
            outliers,
        })
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Trailing simple moving average.
    ///
    /// Index `i` is `Some` iff `i >= window - 1`, holding the mean of the
    /// `window` values ending at `i`. A zero window yields all `None`.
    pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
        if window == 0 || values.len() < window {
            return vec![None; values.len()];
        }

        let mut averages = vec![None; window - 1];
        averages.extend(
            values
                .windows(window)
                .map(|w| Some(w.iter().sum::<f64>() / window as f64)),
        );
        averages
    }

    /// Seeded generator shared by every sampling step of one chart.
    pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    /// Draw up to `max_points` values without replacement and give each a
    /// horizontal offset in `[-jitter, jitter]`.
    ///
    /// When the group has no more than `max_points` values all of them are
    /// kept, in their original order.
    pub fn sample_jittered<R: Rng>(
        values: &[f64],
        max_points: usize,
        jitter: f64,
        rng: &mut R,
    ) -> Vec<JitteredPoint> {
        let picked: Vec<f64> = if values.len() <= max_points {
            values.to_vec()
        } else {
            values.choose_multiple(rng, max_points).copied().collect()
        };

        picked
            .into_iter()
            .map(|value| JitteredPoint {
                value,
                offset: if jitter > 0.0 {
                    rng.gen_range(-jitter..=jitter)
                } else {
                    0.0
                },
            })
            .collect()
    }

    fn sorted(values: &[f64]) -> Vec<f64> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }
}
