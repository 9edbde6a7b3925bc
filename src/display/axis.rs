//! Adaptive axis scaling.
//!
//! Live data is noisy and unbounded, and rescaling on every frame makes the
//! display jitter. Three policies are available:
//!
//! - [`AxisPolicy::HardMargin`]: bounds are `[min - margin, max + margin]`,
//!   recomputed from scratch every update.
//! - [`AxisPolicy::HysteresisExpand`]: bounds only move once data comes within
//!   `margin` of an edge, and then jump past the data by the margin plus a
//!   share of the current span.
//! - [`AxisPolicy::HysteresisEma`]: same trigger, but the bounds glide towards
//!   the fresh `[min - margin, max + margin]` target with an EMA.
//!
//! Non-finite values never take part in a target. A batch with nothing finite
//! leaves the bounds untouched.

use crate::protocol::FrequencyMetadata;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Half width added on each side when a range collapses to a point.
const DEGENERATE_HALF_SPAN: f64 = 0.5;

/// Displayed axis limits; `low < high` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    /// Lower limit
    pub low: f64,
    /// Upper limit
    pub high: f64,
}

impl AxisBounds {
    /// Strict constructor: both finite and `low < high`.
    pub fn new(low: f64, high: f64) -> Option<Self> {
        (low.is_finite() && high.is_finite() && low < high).then_some(Self { low, high })
    }

    /// Like [`new`](Self::new) but widens a collapsed or inverted pair.
    pub fn widened(low: f64, high: f64) -> Option<Self> {
        if !(low.is_finite() && high.is_finite()) {
            return None;
        }
        if low < high {
            Some(Self { low, high })
        } else {
            Some(Self {
                low: low.min(high) - DEGENERATE_HALF_SPAN,
                high: low.max(high) + DEGENERATE_HALF_SPAN,
            })
        }
    }

    /// `high - low`.
    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    /// Whether `value` lies inside the bounds.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Min and max of the finite values, or `None` if there are none.
pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}

/// Scaling policy and its constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AxisPolicy {
    /// Fresh bounds every update.
    HardMargin {
        /// Padding on each side.
        margin: f64,
    },
    /// Hysteresis trigger with a hard, expanded recomputation.
    HysteresisExpand {
        /// Trigger distance and padding.
        margin: f64,
        /// Share of the current span added on rescale (`1.1` adds 5% per side).
        expand_factor: f64,
        /// Half span of the first bounds around the first batch.
        initial_half_span: f64,
    },
    /// Hysteresis trigger with EMA smoothing towards the target.
    HysteresisEma {
        /// Trigger distance and padding.
        margin: f64,
        /// EMA weight of the new target, in (0, 1].
        alpha: f64,
    },
}

/// Result of feeding one batch to the scaler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisUpdate {
    /// Bounds kept.
    Unchanged,
    /// Bounds moved.
    Rescaled(AxisBounds),
    /// Every value was NaN or infinite; bounds kept and redraw skipped.
    SkippedNonFinite,
}

/// Maintains the bounds of one display axis.
#[derive(Debug, Clone)]
pub struct AxisScaler {
    policy: AxisPolicy,
    bounds: Option<AxisBounds>,
    rescales: u64,
}

impl AxisScaler {
    /// Scaler with no bounds yet; the first finite batch sets them.
    pub fn new(policy: AxisPolicy) -> Self {
        Self {
            policy,
            bounds: None,
            rescales: 0,
        }
    }

    /// Scaler starting from known bounds.
    pub fn with_bounds(policy: AxisPolicy, bounds: AxisBounds) -> Self {
        Self {
            policy,
            bounds: Some(bounds),
            rescales: 0,
        }
    }

    /// Current bounds.
    pub fn bounds(&self) -> Option<AxisBounds> {
        self.bounds
    }

    /// Policy in use.
    pub fn policy(&self) -> AxisPolicy {
        self.policy
    }

    /// Number of rescales so far.
    pub fn rescales(&self) -> u64 {
        self.rescales
    }

    /// Feed the values of one update.
    pub fn observe(&mut self, values: &[f64]) -> AxisUpdate {
        if values.is_empty() {
            return AxisUpdate::Unchanged;
        }
        let Some((data_min, data_max)) = finite_range(values) else {
            warn!(
                values = values.len(),
                "All values non-finite; skipping axis rescale and redraw"
            );
            return AxisUpdate::SkippedNonFinite;
        };

        let next = match (self.policy, self.bounds) {
            (AxisPolicy::HardMargin { margin }, _) => {
                AxisBounds::widened(data_min - margin, data_max + margin)
            }
            (
                AxisPolicy::HysteresisExpand {
                    initial_half_span, ..
                },
                None,
            ) => AxisBounds::widened(data_min - initial_half_span, data_max + initial_half_span),
            (AxisPolicy::HysteresisEma { margin, .. }, None) => {
                AxisBounds::widened(data_min - margin, data_max + margin)
            }
            (
                AxisPolicy::HysteresisExpand {
                    margin,
                    expand_factor,
                    ..
                },
                Some(current),
            ) => expand_on_approach(current, data_min, data_max, margin, expand_factor),
            (AxisPolicy::HysteresisEma { margin, alpha }, Some(current)) => {
                ema_on_approach(current, data_min, data_max, margin, alpha)
            }
        };

        match next {
            Some(bounds) if Some(bounds) != self.bounds => {
                self.bounds = Some(bounds);
                self.rescales += 1;
                debug!(low = bounds.low, high = bounds.high, "Axis rescaled");
                AxisUpdate::Rescaled(bounds)
            }
            _ => AxisUpdate::Unchanged,
        }
    }
}

/// Whether data has come within `margin` of either edge.
fn approaches(current: AxisBounds, data_min: f64, data_max: f64, margin: f64) -> bool {
    data_min < current.low + margin || data_max > current.high - margin
}

fn expand_on_approach(
    current: AxisBounds,
    data_min: f64,
    data_max: f64,
    margin: f64,
    expand_factor: f64,
) -> Option<AxisBounds> {
    let mut low = current.low;
    let mut high = current.high;
    let mut resized = false;

    if data_min < low + margin {
        let span = high - low;
        low = data_min - margin - span * (expand_factor - 1.0) / 2.0;
        resized = true;
    }
    // The span is re-read after the low edge moved.
    if data_max > high - margin {
        let span = high - low;
        high = data_max + margin + span * (expand_factor - 1.0) / 2.0;
        resized = true;
    }

    if resized {
        AxisBounds::widened(low, high)
    } else {
        None
    }
}

fn ema_on_approach(
    current: AxisBounds,
    data_min: f64,
    data_max: f64,
    margin: f64,
    alpha: f64,
) -> Option<AxisBounds> {
    if !approaches(current, data_min, data_max, margin) {
        return None;
    }
    let target = AxisBounds::widened(data_min - margin, data_max + margin)?;
    AxisBounds::widened(
        current.low * (1.0 - alpha) + target.low * alpha,
        current.high * (1.0 - alpha) + target.high * alpha,
    )
}

/// Visible time range for a trend window: `[max(h, t) - h, max(h, t)]`.
pub fn time_axis_bounds(latest_elapsed: f64, horizon_secs: f64) -> Option<AxisBounds> {
    let right = latest_elapsed.max(horizon_secs);
    AxisBounds::new(right - horizon_secs, right)
}

/// Frequency in Hz of each bin of an FFT-shifted PSD frame.
pub fn frequency_axis(metadata: FrequencyMetadata, bins: usize) -> Vec<f64> {
    if bins == 0 {
        return Vec::new();
    }
    let start = metadata.center_frequency_hz - metadata.bandwidth_hz / 2.0;
    let step = metadata.bandwidth_hz / bins as f64;
    (0..bins).map(|i| start + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn bounds(low: f64, high: f64) -> AxisBounds {
        AxisBounds::new(low, high).unwrap()
    }

    #[test]
    fn strict_bounds_reject_collapsed_pairs() {
        assert!(AxisBounds::new(1.0, 1.0).is_none());
        assert!(AxisBounds::new(f64::NAN, 1.0).is_none());
        assert_eq!(AxisBounds::widened(2.0, 2.0), Some(bounds(1.5, 2.5)));
    }

    #[test]
    fn hard_margin_recomputes_every_update() {
        let mut scaler = AxisScaler::new(AxisPolicy::HardMargin { margin: 5.0 });
        assert_eq!(
            scaler.observe(&[-80.0, -60.0]),
            AxisUpdate::Rescaled(bounds(-85.0, -55.0))
        );
        assert_eq!(
            scaler.observe(&[-70.0, -65.0]),
            AxisUpdate::Rescaled(bounds(-75.0, -60.0))
        );
        assert_eq!(scaler.observe(&[-70.0, -65.0]), AxisUpdate::Unchanged);
    }

    #[test]
    fn hysteresis_ignores_interior_points() {
        for policy in [
            AxisPolicy::HysteresisExpand {
                margin: 1.0,
                expand_factor: 1.1,
                initial_half_span: 0.3,
            },
            AxisPolicy::HysteresisEma {
                margin: 1.0,
                alpha: 0.1,
            },
        ] {
            let mut scaler = AxisScaler::with_bounds(policy, bounds(0.0, 10.0));
            assert_eq!(scaler.observe(&[5.0]), AxisUpdate::Unchanged);
            assert!(matches!(scaler.observe(&[9.5]), AxisUpdate::Rescaled(_)));
        }
    }

    #[test]
    fn expand_formula() {
        let mut scaler = AxisScaler::with_bounds(
            AxisPolicy::HysteresisExpand {
                margin: 1.0,
                expand_factor: 1.1,
                initial_half_span: 0.3,
            },
            bounds(0.0, 10.0),
        );
        match scaler.observe(&[9.5]) {
            AxisUpdate::Rescaled(b) => {
                assert_eq!(b.low, 0.0);
                assert!((b.high - (9.5 + 1.0 + 10.0 * 0.05)).abs() < 1e-12);
            }
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[test]
    fn expand_starts_around_first_value() {
        let mut scaler = AxisScaler::new(AxisPolicy::HysteresisExpand {
            margin: 1.0,
            expand_factor: 1.1,
            initial_half_span: 0.3,
        });
        match scaler.observe(&[-40.0]) {
            AxisUpdate::Rescaled(b) => {
                assert!((b.low + 40.3).abs() < 1e-12);
                assert!((b.high + 39.7).abs() < 1e-12);
            }
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[test]
    fn ema_converges_to_constant_target() {
        let mut scaler = AxisScaler::with_bounds(
            AxisPolicy::HysteresisEma {
                margin: 5.0,
                alpha: 0.1,
            },
            bounds(-50.0, -40.0),
        );
        let frame = [-90.0, -70.0, -20.0];
        let target = bounds(-95.0, -15.0);
        let mut converged_at = None;
        for i in 0..300 {
            scaler.observe(&frame);
            let b = scaler.bounds().unwrap();
            if (b.low - target.low).abs() < 1e-3 && (b.high - target.high).abs() < 1e-3 {
                converged_at = Some(i);
                break;
            }
        }
        assert!(converged_at.is_some(), "bounds did not converge");
    }

    #[test]
    fn nan_is_excluded_from_targets() {
        let mut scaler = AxisScaler::new(AxisPolicy::HardMargin { margin: 5.0 });
        assert_eq!(
            scaler.observe(&[-60.0, f64::NAN, -50.0]),
            AxisUpdate::Rescaled(bounds(-65.0, -45.0))
        );
    }

    #[test]
    fn all_nan_batch_keeps_bounds() {
        let mut scaler = AxisScaler::with_bounds(
            AxisPolicy::HysteresisEma {
                margin: 5.0,
                alpha: 0.1,
            },
            bounds(-100.0, 0.0),
        );
        assert_eq!(
            scaler.observe(&[f64::NAN, f64::INFINITY]),
            AxisUpdate::SkippedNonFinite
        );
        assert_eq!(scaler.bounds(), Some(bounds(-100.0, 0.0)));
        assert_eq!(scaler.rescales(), 0);
    }

    #[test]
    #[traced_test]
    fn all_nan_batch_is_reported() {
        let mut scaler = AxisScaler::new(AxisPolicy::HardMargin { margin: 5.0 });
        scaler.observe(&[f64::NAN]);
        assert!(logs_contain("All values non-finite"));
        assert!(scaler.bounds().is_none());
    }

    #[test]
    fn time_axis_slides_after_horizon() {
        assert_eq!(time_axis_bounds(3.0, 10.0), Some(bounds(0.0, 10.0)));
        assert_eq!(time_axis_bounds(25.0, 10.0), Some(bounds(15.0, 25.0)));
    }

    #[test]
    fn frequency_axis_is_centered() {
        let meta = FrequencyMetadata {
            center_frequency_hz: 100.0,
            bandwidth_hz: 40.0,
        };
        assert_eq!(frequency_axis(meta, 4), vec![80.0, 90.0, 100.0, 110.0]);
    }
}
