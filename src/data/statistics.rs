//! Descriptive statistics over a history window.
//!
//! Everything is recomputed from the window contents on each accepted update.
//! The window is capped, so the O(n log n) median sort per update is bounded.
//! Non-finite samples are left out of every statistic.

use serde::{Deserialize, Serialize};

/// Raw samples needed before statistics are shown at all.
pub const MIN_RAW_SAMPLES: usize = 2;

/// Summary of the current window (or of its first differences).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    /// Number of finite values summarised
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Median (mean of the middle pair for even counts)
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Median absolute deviation, unscaled
    pub mad: f64,
    /// Minimum
    pub min: f64,
    /// Maximum
    pub max: f64,
}

impl StatSummary {
    /// Summarise `values`, ignoring NaN and infinities. `None` when no finite
    /// value is present.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let median = median_in_place(&mut finite);
        let mut deviations: Vec<f64> = finite.iter().map(|v| (v - median).abs()).collect();
        let mad = median_in_place(&mut deviations);

        Some(Self {
            count: finite.len(),
            mean,
            median,
            std_dev,
            mad,
            min,
            max,
        })
    }
}

/// Sorts `values` and returns their median. Caller guarantees non-empty.
fn median_in_place(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Consecutive differences `x[i+1] - x[i]`.
pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Which series the statistics describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatMode {
    /// The samples themselves.
    Level,
    /// First differences between consecutive samples.
    Delta,
}

/// Series handed to the histogram plus its summary.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStatistics {
    /// Values the statistics were computed over (raw or differenced).
    pub series: Vec<f64>,
    /// Summary of `series`.
    pub summary: StatSummary,
}

/// Computes statistics for one acquisition mode.
#[derive(Debug, Clone, Copy)]
pub struct StatisticsEngine {
    mode: StatMode,
}

impl StatisticsEngine {
    /// Engine for `mode`.
    pub fn new(mode: StatMode) -> Self {
        Self { mode }
    }

    /// Mode in use.
    pub fn mode(&self) -> StatMode {
        self.mode
    }

    /// Statistics for the raw window contents.
    ///
    /// Returns `None` with fewer than [`MIN_RAW_SAMPLES`] raw samples (delta
    /// mode needs two to form one difference) or when nothing is finite; the
    /// caller keeps showing its previous state in that case.
    pub fn summarize(&self, raw: &[f64]) -> Option<WindowStatistics> {
        if raw.len() < MIN_RAW_SAMPLES {
            return None;
        }
        let series = match self.mode {
            StatMode::Level => raw.to_vec(),
            StatMode::Delta => first_differences(raw),
        };
        let summary = StatSummary::compute(&series)?;
        Some(WindowStatistics { series, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn one_to_five() {
        let s = StatSummary::compute(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(close(s.mean, 3.0));
        assert!(close(s.median, 3.0));
        assert!(close(s.std_dev, 2.0_f64.sqrt()));
        assert!(close(s.mad, 1.0));
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.count, 5);
    }

    #[test]
    fn even_count_median_averages_middle_pair() {
        let s = StatSummary::compute(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!(close(s.median, 2.5));
        assert!(close(s.mad, 1.0));
    }

    #[test]
    fn delta_mode_uses_differences() {
        let engine = StatisticsEngine::new(StatMode::Delta);
        let stats = engine.summarize(&[10.0, 12.0, 9.0]).unwrap();
        assert_eq!(stats.series, vec![2.0, -3.0]);
        assert!(close(stats.summary.mean, -0.5));
        assert_eq!(stats.summary.min, -3.0);
        assert_eq!(stats.summary.max, 2.0);
    }

    #[test]
    fn fewer_than_two_samples_is_skipped() {
        assert!(StatisticsEngine::new(StatMode::Level).summarize(&[1.0]).is_none());
        assert!(StatisticsEngine::new(StatMode::Delta).summarize(&[1.0]).is_none());
        assert!(StatisticsEngine::new(StatMode::Delta).summarize(&[]).is_none());
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let s = StatSummary::compute(&[1.0, f64::NAN, 3.0, f64::INFINITY]).unwrap();
        assert_eq!(s.count, 2);
        assert!(close(s.mean, 2.0));
        assert_eq!(s.max, 3.0);
        assert!(StatSummary::compute(&[f64::NAN, f64::NAN]).is_none());
    }
}
