//! Parametric density overlays for histograms.
//!
//! A density is evaluated on a regular grid reaching one standard deviation
//! past the data range and multiplied by `sample_count * bin_width`, so the
//! curve reads in the same count units as the histogram it is drawn over.

use crate::data::statistics::StatSummary;
use crate::protocol::DistributionParams;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Points on the overlay grid.
pub const DEFAULT_RESOLUTION: usize = 200;

/// Density family used for the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Density {
    /// Skewed Cauchy with location, scale and skew in (-1, 1).
    SkewCauchy(DistributionParams),
    /// Normal with mean and standard deviation.
    Normal {
        /// Mean.
        mean: f64,
        /// Standard deviation.
        std_dev: f64,
    },
}

impl Density {
    /// Whether the parameters describe a proper density.
    pub fn is_valid(&self) -> bool {
        match *self {
            Density::SkewCauchy(p) => {
                p.location.is_finite()
                    && p.scale.is_finite()
                    && p.scale > 0.0
                    && p.skew.is_finite()
                    && p.skew.abs() < 1.0
            }
            Density::Normal { mean, std_dev } => {
                mean.is_finite() && std_dev.is_finite() && std_dev > 0.0
            }
        }
    }

    /// Probability density at `x`. Assumes [`is_valid`](Self::is_valid).
    pub fn pdf(&self, x: f64) -> f64 {
        match *self {
            Density::SkewCauchy(p) => {
                let z = (x - p.location) / p.scale;
                let stretch = p.skew * sign(z) + 1.0;
                1.0 / (PI * p.scale * ((z * z) / (stretch * stretch) + 1.0))
            }
            Density::Normal { mean, std_dev } => {
                let z = (x - mean) / std_dev;
                (-0.5 * z * z).exp() / (std_dev * (2.0 * PI).sqrt())
            }
        }
    }
}

fn sign(z: f64) -> f64 {
    if z > 0.0 {
        1.0
    } else if z < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Overlay curve in histogram count units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayCurve {
    /// Density family and parameters the curve was drawn from.
    pub density: Density,
    /// Grid abscissae.
    pub x: Vec<f64>,
    /// Scaled density values.
    pub y: Vec<f64>,
}

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Evaluate `density` over `[min - std, max + std]` and rescale to counts.
///
/// Returns `None` for invalid parameters, a non-positive bin width, or a
/// degenerate evaluation range; the caller simply omits the overlay.
pub fn evaluate_overlay(
    density: Density,
    summary: &StatSummary,
    bin_width: f64,
    resolution: usize,
) -> Option<OverlayCurve> {
    if !density.is_valid() || !(bin_width.is_finite() && bin_width > 0.0) || resolution < 2 {
        return None;
    }
    let start = summary.min - summary.std_dev;
    let end = summary.max + summary.std_dev;
    if !(start.is_finite() && end.is_finite() && end > start) {
        return None;
    }

    let scale = summary.count as f64 * bin_width;
    let x = linspace(start, end, resolution);
    let y = x.iter().map(|&xi| density.pdf(xi) * scale).collect();
    Some(OverlayCurve { density, x, y })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(min: f64, max: f64, std_dev: f64, count: usize) -> StatSummary {
        StatSummary {
            count,
            mean: (min + max) / 2.0,
            median: (min + max) / 2.0,
            std_dev,
            mad: std_dev,
            min,
            max,
        }
    }

    fn cauchy(location: f64, scale: f64, skew: f64) -> Density {
        Density::SkewCauchy(DistributionParams {
            location,
            scale,
            skew,
        })
    }

    #[test]
    fn symmetric_cauchy_peak() {
        let d = cauchy(0.0, 2.0, 0.0);
        assert!((d.pdf(0.0) - 1.0 / (2.0 * PI)).abs() < 1e-12);
        assert!((d.pdf(2.0) - d.pdf(-2.0)).abs() < 1e-12);
    }

    #[test]
    fn positive_skew_fattens_right_tail() {
        let d = cauchy(0.0, 1.0, 0.5);
        assert!(d.pdf(3.0) > d.pdf(-3.0));
    }

    #[test]
    fn normal_peak() {
        let d = Density::Normal {
            mean: 1.0,
            std_dev: 1.0,
        };
        assert!((d.pdf(1.0) - 1.0 / (2.0 * PI).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn range_extends_one_std_past_data() {
        let curve = evaluate_overlay(
            cauchy(-40.0, 0.5, 0.1),
            &summary(-42.0, -38.0, 1.0, 100),
            0.1,
            DEFAULT_RESOLUTION,
        )
        .unwrap();
        assert_eq!(curve.x.len(), 200);
        assert_eq!(curve.x.first(), Some(&-43.0));
        assert_eq!(curve.x.last(), Some(&-37.0));
        assert_eq!(curve.y.len(), 200);
    }

    #[test]
    fn curve_is_scaled_to_counts() {
        let d = Density::Normal {
            mean: 0.0,
            std_dev: 1.0,
        };
        let curve = evaluate_overlay(d, &summary(-1.0, 1.0, 1.0, 50), 0.2, 3).unwrap();
        assert_eq!(curve.x, vec![-2.0, 0.0, 2.0]);
        assert!((curve.y[1] - d.pdf(0.0) * 50.0 * 0.2).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs_yield_no_curve() {
        let s = summary(-1.0, 1.0, 1.0, 10);
        assert!(evaluate_overlay(cauchy(0.0, 0.0, 0.0), &s, 0.1, 200).is_none());
        assert!(evaluate_overlay(cauchy(0.0, 1.0, 1.0), &s, 0.1, 200).is_none());
        assert!(evaluate_overlay(cauchy(0.0, 1.0, 0.0), &s, 0.0, 200).is_none());
        let flat = summary(3.0, 3.0, 0.0, 10);
        assert!(evaluate_overlay(cauchy(0.0, 1.0, 0.0), &flat, 0.1, 200).is_none());
    }

    #[test]
    fn linspace_endpoints() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
        assert!(linspace(2.0, 3.0, 0).is_empty());
    }
}
