//! Per-mode processing of accepted records.
//!
//! Every pipeline follows the same path: history store, statistics,
//! optional histogram and overlay, then the axis scaler. The modes differ in
//! the window kind, the statistics mode, the overlay density and the axis
//! policy.

use super::AcquisitionMode;
use crate::config::MonitorConfig;
use crate::data::{
    evaluate_overlay, Density, Histogram, HistoryWindow, OverlayCurve, StatMode, StatSummary,
    StatisticsEngine, TimeSeriesWindow,
};
use crate::display::{
    frequency_axis, time_axis_bounds, AxisBounds, AxisPolicy, AxisScaler, AxisUpdate, XAxisKind,
};
use crate::protocol::{read_distribution_params, FrequencyMetadata, Payload, SnapshotRecord};
use std::path::PathBuf;
use tracing::debug;

/// Display content produced by one accepted record.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub x_kind: XAxisKind,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub summary: Option<StatSummary>,
    pub histogram: Option<Histogram>,
    pub overlay: Option<OverlayCurve>,
    pub value_bounds: Option<AxisBounds>,
    pub x_bounds: Option<AxisBounds>,
    pub sample_count: usize,
}

/// What is left in the pipeline at shutdown.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalState {
    pub window_len: usize,
    pub differences: Option<usize>,
    pub summary: Option<StatSummary>,
}

/// Where the histogram overlay comes from.
#[derive(Debug, Clone)]
enum OverlaySource {
    /// Skew-Cauchy fit published by the producer, re-read every update.
    SkewCauchyFile(PathBuf),
    /// Normal density with the window's own mean and standard deviation.
    NormalFit,
}

impl OverlaySource {
    fn density(&self, summary: &StatSummary) -> Option<Density> {
        match self {
            OverlaySource::SkewCauchyFile(path) => {
                read_distribution_params(path).map(Density::SkewCauchy)
            }
            OverlaySource::NormalFit => Some(Density::Normal {
                mean: summary.mean,
                std_dev: summary.std_dev,
            }),
        }
    }
}

/// Last statistics shown; kept while an update cannot produce new ones.
#[derive(Debug, Clone, Default)]
struct Shown {
    summary: Option<StatSummary>,
    histogram: Option<Histogram>,
    overlay: Option<OverlayCurve>,
}

/// Count-capped window of scalars rendered as a histogram.
#[derive(Debug)]
struct HistogramPipeline {
    window: HistoryWindow<f64>,
    engine: StatisticsEngine,
    bins: usize,
    resolution: usize,
    overlay: OverlaySource,
    scaler: AxisScaler,
    shown: Shown,
}

impl HistogramPipeline {
    fn accept(&mut self, value: f64) -> Option<PipelineOutput> {
        self.window.push(value);
        let raw = self.window.contents();

        if let Some(stats) = self.engine.summarize(&raw) {
            if self.scaler.observe(&stats.series) == AxisUpdate::SkippedNonFinite {
                return None;
            }
            let histogram = Histogram::from_samples(&stats.series, self.bins);
            let overlay = histogram.as_ref().and_then(|h| {
                let density = self.overlay.density(&stats.summary)?;
                evaluate_overlay(density, &stats.summary, h.bin_width(), self.resolution)
            });
            self.shown = Shown {
                summary: Some(stats.summary),
                histogram,
                overlay,
            };
        } else {
            debug!(samples = raw.len(), "Too few samples for statistics");
        }

        Some(PipelineOutput {
            x_kind: XAxisKind::SampleIndex,
            x: (0..raw.len()).map(|i| i as f64).collect(),
            sample_count: raw.len(),
            y: raw,
            summary: self.shown.summary,
            histogram: self.shown.histogram.clone(),
            overlay: self.shown.overlay.clone(),
            value_bounds: self.scaler.bounds(),
            x_bounds: None,
        })
    }

    fn final_state(&self) -> FinalState {
        let raw = self.window.contents();
        let stats = self.engine.summarize(&raw);
        let differences = match self.engine.mode() {
            StatMode::Delta => Some(raw.len().saturating_sub(1)),
            StatMode::Level => None,
        };
        FinalState {
            window_len: raw.len(),
            differences,
            summary: stats.map(|s| s.summary),
        }
    }
}

/// Time-capped power trend.
#[derive(Debug)]
struct TrendPipeline {
    window: TimeSeriesWindow,
    engine: StatisticsEngine,
    scaler: AxisScaler,
    summary: Option<StatSummary>,
}

impl TrendPipeline {
    fn accept(&mut self, elapsed_secs: f64, value: f64) -> Option<PipelineOutput> {
        if !self.window.push(elapsed_secs, value) {
            debug!(elapsed_secs, value, "Trend sample refused");
            return None;
        }
        let values = self.window.values();
        if self.scaler.observe(&values) == AxisUpdate::SkippedNonFinite {
            return None;
        }
        if let Some(stats) = self.engine.summarize(&values) {
            self.summary = Some(stats.summary);
        }

        Some(PipelineOutput {
            x_kind: XAxisKind::ElapsedSeconds,
            x: self.window.timestamps(),
            sample_count: values.len(),
            y: values,
            summary: self.summary,
            histogram: None,
            overlay: None,
            value_bounds: self.scaler.bounds(),
            x_bounds: time_axis_bounds(elapsed_secs, self.window.horizon_secs()),
        })
    }

    fn final_state(&self) -> FinalState {
        let values = self.window.values();
        FinalState {
            window_len: values.len(),
            differences: None,
            summary: self.engine.summarize(&values).map(|s| s.summary),
        }
    }
}

/// Latest PSD frame.
#[derive(Debug)]
struct SpectrumPipeline {
    latest: HistoryWindow<Vec<f64>>,
    engine: StatisticsEngine,
    scaler: AxisScaler,
}

impl SpectrumPipeline {
    fn accept(&mut self, frame: &[f64], metadata: FrequencyMetadata) -> Option<PipelineOutput> {
        if self.scaler.observe(frame) == AxisUpdate::SkippedNonFinite {
            return None;
        }
        self.latest.push(frame.to_vec());
        let summary = self.engine.summarize(frame).map(|s| s.summary);

        Some(PipelineOutput {
            x_kind: XAxisKind::FrequencyHz,
            x: frequency_axis(metadata, frame.len()),
            y: frame.to_vec(),
            summary,
            histogram: None,
            overlay: None,
            value_bounds: self.scaler.bounds(),
            x_bounds: None,
            sample_count: frame.len(),
        })
    }

    fn final_state(&self) -> FinalState {
        let frame = self.latest.latest().map(Vec::as_slice).unwrap_or(&[]);
        FinalState {
            window_len: frame.len(),
            differences: None,
            summary: self.engine.summarize(frame).map(|s| s.summary),
        }
    }
}

/// Mode-specific chain behind a session.
#[derive(Debug)]
pub struct Pipeline {
    kind: PipelineKind,
}

#[derive(Debug)]
enum PipelineKind {
    Histogram(HistogramPipeline),
    Trend(TrendPipeline),
    Spectrum(SpectrumPipeline),
}

impl Pipeline {
    /// Wire the chain for `mode` from configuration.
    pub fn for_mode(mode: AcquisitionMode, config: &MonitorConfig) -> Self {
        let axis = &config.axis;
        let kind = match mode {
            AcquisitionMode::Power | AcquisitionMode::Delta => {
                let overlay = if mode == AcquisitionMode::Power {
                    OverlaySource::SkewCauchyFile(config.acquisition.distribution_path.clone())
                } else {
                    OverlaySource::NormalFit
                };
                PipelineKind::Histogram(HistogramPipeline {
                    window: HistoryWindow::new(config.history.capacity),
                    engine: StatisticsEngine::new(mode.stat_mode()),
                    bins: config.histogram.bins,
                    resolution: config.histogram.overlay_resolution,
                    overlay,
                    scaler: AxisScaler::new(AxisPolicy::HardMargin {
                        margin: axis.histogram_margin,
                    }),
                    shown: Shown::default(),
                })
            }
            AcquisitionMode::Trend => PipelineKind::Trend(TrendPipeline {
                window: TimeSeriesWindow::new(config.history.time_horizon_secs),
                engine: StatisticsEngine::new(StatMode::Level),
                scaler: AxisScaler::new(AxisPolicy::HysteresisExpand {
                    margin: axis.trend_margin,
                    expand_factor: axis.trend_expand_factor,
                    initial_half_span: axis.trend_initial_half_span,
                }),
                summary: None,
            }),
            AcquisitionMode::Spectrum | AcquisitionMode::SpectrumUntagged => {
                let policy = if mode == AcquisitionMode::Spectrum {
                    AxisPolicy::HysteresisEma {
                        margin: axis.spectrum_margin,
                        alpha: axis.spectrum_alpha,
                    }
                } else {
                    AxisPolicy::HardMargin {
                        margin: axis.spectrum_margin,
                    }
                };
                PipelineKind::Spectrum(SpectrumPipeline {
                    latest: HistoryWindow::new(1),
                    engine: StatisticsEngine::new(StatMode::Level),
                    scaler: AxisScaler::new(policy),
                })
            }
        };
        Self { kind }
    }

    /// Feed one accepted record. `None` means nothing should be redrawn.
    pub fn accept(&mut self, record: &SnapshotRecord, elapsed_secs: f64) -> Option<PipelineOutput> {
        match (&mut self.kind, &record.payload) {
            (PipelineKind::Histogram(p), Payload::Scalar(value)) => p.accept(*value),
            (PipelineKind::Trend(p), Payload::Scalar(value)) => p.accept(elapsed_secs, *value),
            (PipelineKind::Spectrum(p), Payload::Vector(frame)) => p.accept(frame, record.metadata),
            (_, payload) => {
                debug!(len = payload.len(), "Payload shape does not fit this mode");
                None
            }
        }
    }

    /// Summary of whatever the windows hold now.
    pub fn final_state(&self) -> FinalState {
        match &self.kind {
            PipelineKind::Histogram(p) => p.final_state(),
            PipelineKind::Trend(p) => p.final_state(),
            PipelineKind::Spectrum(p) => p.final_state(),
        }
    }
}
