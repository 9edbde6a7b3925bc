//! Data handling: bounded history, statistics, histograms and overlays.
pub mod histogram;
pub mod history;
pub mod overlay;
pub mod statistics;

pub use histogram::Histogram;
pub use history::{HistoryWindow, TimeSeriesWindow};
pub use overlay::{evaluate_overlay, Density, OverlayCurve};
pub use statistics::{first_differences, StatMode, StatSummary, StatisticsEngine, WindowStatistics};
