//! Bounded in-memory history.
//!
//! Two shapes of window are used by the acquisition modes:
//! - [`HistoryWindow`]: count-capped FIFO, oldest sample evicted first.
//! - [`TimeSeriesWindow`]: `(elapsed_seconds, value)` pairs evicted once they
//!   fall more than a horizon behind the newest timestamp.
//!
//! Neither keeps running aggregates; statistics are recomputed from
//! [`HistoryWindow::contents`] on every accepted update.

use std::collections::VecDeque;

/// Fixed-capacity FIFO of samples.
#[derive(Debug, Clone)]
pub struct HistoryWindow<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> HistoryWindow<T> {
    /// Creates an empty window. A capacity of 0 is bumped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest one when over capacity.
    /// Returns the evicted sample, if any.
    pub fn push(&mut self, sample: T) -> Option<T> {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        }
    }

    /// Current contents in arrival order.
    pub fn contents(&self) -> Vec<T> {
        self.samples.iter().cloned().collect()
    }

    /// Iterates oldest to newest without copying.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.samples.iter()
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Time-capped window of `(elapsed_seconds, value)` pairs.
#[derive(Debug, Clone)]
pub struct TimeSeriesWindow {
    points: VecDeque<(f64, f64)>,
    horizon_secs: f64,
}

impl TimeSeriesWindow {
    /// Creates an empty window keeping `horizon_secs` of history.
    pub fn new(horizon_secs: f64) -> Self {
        Self {
            points: VecDeque::new(),
            horizon_secs,
        }
    }

    /// Appends a point and evicts everything older than
    /// `elapsed_secs - horizon`.
    ///
    /// Timestamps must be non-decreasing; an out-of-order or non-finite
    /// timestamp is refused and `false` is returned.
    pub fn push(&mut self, elapsed_secs: f64, value: f64) -> bool {
        if !elapsed_secs.is_finite() {
            return false;
        }
        if let Some(&(last, _)) = self.points.back() {
            if elapsed_secs < last {
                return false;
            }
        }
        self.points.push_back((elapsed_secs, value));

        let cutoff = elapsed_secs - self.horizon_secs;
        while self
            .points
            .front()
            .map(|(t, _)| *t < cutoff)
            .unwrap_or(false)
        {
            self.points.pop_front();
        }
        true
    }

    /// Current `(elapsed, value)` pairs, oldest first.
    pub fn contents(&self) -> Vec<(f64, f64)> {
        self.points.iter().copied().collect()
    }

    /// Values only, oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    /// Timestamps only, oldest first.
    pub fn timestamps(&self) -> Vec<f64> {
        self.points.iter().map(|(t, _)| *t).collect()
    }

    /// Newest timestamp.
    pub fn latest_elapsed(&self) -> Option<f64> {
        self.points.back().map(|(t, _)| *t)
    }

    /// Horizon in seconds.
    pub fn horizon_secs(&self) -> f64 {
        self.horizon_secs
    }

    /// Number of points held.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
