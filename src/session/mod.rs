//! Monitoring sessions.
//!
//! A [`MonitorSession`] owns everything one live display needs: the
//! change-gated poller, the mode's pipeline and the axis state. Nothing is
//! global, so several sessions (say a power histogram and a PSD trace) can
//! run side by side.
//!
//! # Lifecycle
//!
//! ```text
//! WaitingForFirstSample --first record--> Active --+
//!                                           ^      | every poll tick
//!                                           +------+
//! ```
//!
//! The only way out is the [`ShutdownSignal`](crate::acquisition::ShutdownSignal),
//! checked at the top of every iteration and raced against every sleep. On
//! cancellation the session builds a [`FinalReport`] from the current windows
//! and hands it to the sink, which keeps its last frame. The one other exit
//! is a fatal [`MonitorError::Source`](crate::error::MonitorError::Source),
//! when the snapshot path keeps failing structurally past the configured
//! tolerance.

mod pipeline;

use crate::acquisition::{ChangeGate, ChangeGatedPoller, PollEvent, ShutdownSignal};
use crate::config::MonitorConfig;
use crate::data::StatMode;
use crate::display::{DisplayFrame, FinalReport, PresentationSink};
use crate::error::AppResult;
use crate::protocol::{FrequencyMetadata, SnapshotFile, SnapshotFormat, SnapshotRecord, SnapshotSource};
use pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// The five ways of wiring the pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionMode {
    /// Histogram of scalar power with a skew-Cauchy overlay.
    Power,
    /// Histogram of successive power differences with a normal overlay.
    Delta,
    /// Power against elapsed time over a sliding horizon.
    Trend,
    /// Size-tagged PSD trace with smoothed bounds.
    Spectrum,
    /// Untagged PSD trace with hard-margin bounds.
    SpectrumUntagged,
}

impl AcquisitionMode {
    /// Snapshot protocol variant read in this mode.
    pub fn snapshot_format(self) -> SnapshotFormat {
        match self {
            AcquisitionMode::Power | AcquisitionMode::Delta => SnapshotFormat::ScalarPower,
            AcquisitionMode::Trend => SnapshotFormat::ScalarPowerLenient,
            AcquisitionMode::Spectrum => SnapshotFormat::TaggedSpectrum,
            AcquisitionMode::SpectrumUntagged => SnapshotFormat::UntaggedSpectrum,
        }
    }

    /// Forwarding rule for decoded records.
    pub fn change_gate(self) -> ChangeGate {
        match self {
            AcquisitionMode::Power | AcquisitionMode::Delta | AcquisitionMode::Trend => {
                ChangeGate::DistinctScalar
            }
            AcquisitionMode::Spectrum | AcquisitionMode::SpectrumUntagged => {
                ChangeGate::EveryFrame {
                    stable_length: true,
                }
            }
        }
    }

    /// Series the statistics describe.
    pub fn stat_mode(self) -> StatMode {
        match self {
            AcquisitionMode::Delta => StatMode::Delta,
            _ => StatMode::Level,
        }
    }

    /// Kebab-case name, as used on the command line and in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            AcquisitionMode::Power => "power",
            AcquisitionMode::Delta => "delta",
            AcquisitionMode::Trend => "trend",
            AcquisitionMode::Spectrum => "spectrum",
            AcquisitionMode::SpectrumUntagged => "spectrum-untagged",
        }
    }
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Polling at the coarse startup interval.
    WaitingForFirstSample,
    /// At least one record accepted.
    Active,
}

/// One live display: poller, pipeline and counters.
pub struct MonitorSession<S: SnapshotSource> {
    mode: AcquisitionMode,
    poller: ChangeGatedPoller<S>,
    pipeline: Pipeline,
    poll_interval: Duration,
    startup_poll_interval: Duration,
    phase: SessionPhase,
    accepted: u64,
}

impl MonitorSession<SnapshotFile> {
    /// Validate `config` and open a session on its snapshot path.
    pub fn from_config(config: &MonitorConfig) -> AppResult<Self> {
        config.validate()?;
        let mode = config.acquisition.mode;
        let source = SnapshotFile::new(
            config.acquisition.snapshot_path.clone(),
            mode.snapshot_format(),
        );
        Ok(Self::with_source(config, source))
    }
}

impl<S: SnapshotSource> MonitorSession<S> {
    /// Session over an arbitrary source, wired for `config.acquisition.mode`.
    pub fn with_source(config: &MonitorConfig, source: S) -> Self {
        let mode = config.acquisition.mode;
        let poller = ChangeGatedPoller::new(source, mode.change_gate())
            .with_failure_limit(config.acquisition.max_consecutive_source_failures);
        Self {
            mode,
            poller,
            pipeline: Pipeline::for_mode(mode, config),
            poll_interval: config.acquisition.poll_interval(),
            startup_poll_interval: config.acquisition.startup_poll_interval(),
            phase: SessionPhase::WaitingForFirstSample,
            accepted: 0,
        }
    }

    /// Mode the session was wired for.
    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Records the pipeline turned into frames so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Poll until cancelled, then deliver and return the final report.
    pub async fn run<K>(&mut self, sink: &mut K, mut shutdown: ShutdownSignal) -> AppResult<FinalReport>
    where
        K: PresentationSink + ?Sized,
    {
        let started = Instant::now();
        info!(
            mode = %self.mode,
            source = %self.poller.describe_source(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "Monitor session started"
        );

        if let Some(first) = self
            .poller
            .wait_for_first(&mut shutdown, self.startup_poll_interval)
            .await?
        {
            self.phase = SessionPhase::Active;
            // Trend time starts at the first record, not at session start.
            let origin = Instant::now();
            log_metadata(first.metadata);
            self.accept(&first, origin, sink)?;

            loop {
                if shutdown.is_cancelled() {
                    break;
                }
                match self.poller.poll_once() {
                    PollEvent::New {
                        record,
                        metadata_change,
                    } => {
                        report_metadata(metadata_change, sink)?;
                        self.accept(&record, origin, sink)?;
                    }
                    PollEvent::Unchanged { metadata_change } => {
                        report_metadata(metadata_change, sink)?
                    }
                    PollEvent::Failed { error, consecutive } => {
                        self.poller.escalate(error, consecutive)?
                    }
                    PollEvent::Pending | PollEvent::Rejected { .. } => {}
                }
                if shutdown.sleep_or_cancel(self.poll_interval).await {
                    break;
                }
            }
        }

        let report = self.final_report(started.elapsed().as_secs_f64());
        info!(
            mode = %self.mode,
            samples = report.samples_collected,
            window = report.window_len,
            mean = report.summary.map(|s| s.mean),
            std_dev = report.summary.map(|s| s.std_dev),
            "Monitor session stopped"
        );
        deliver(sink.finish(&report))?;
        Ok(report)
    }

    fn accept<K>(&mut self, record: &SnapshotRecord, origin: Instant, sink: &mut K) -> AppResult<()>
    where
        K: PresentationSink + ?Sized,
    {
        let elapsed = origin.elapsed().as_secs_f64();
        let Some(output) = self.pipeline.accept(record, elapsed) else {
            return Ok(());
        };
        self.accepted += 1;
        let frame = DisplayFrame {
            mode: self.mode,
            sequence: self.accepted,
            x_kind: output.x_kind,
            x: output.x,
            y: output.y,
            summary: output.summary,
            histogram: output.histogram,
            overlay: output.overlay,
            value_bounds: output.value_bounds,
            x_bounds: output.x_bounds,
            metadata: self.poller.metadata(),
            sample_count: output.sample_count,
        };
        deliver(sink.present(&frame))
    }

    fn final_report(&self, elapsed_secs: f64) -> FinalReport {
        let state = self.pipeline.final_state();
        FinalReport {
            mode: self.mode,
            samples_collected: self.accepted,
            window_len: state.window_len,
            differences: state.differences,
            summary: state.summary,
            metadata: self.poller.metadata(),
            counters: self.poller.counters(),
            elapsed_secs,
        }
    }
}

fn log_metadata(meta: FrequencyMetadata) {
    info!(
        center_frequency_hz = meta.center_frequency_hz,
        bandwidth_hz = meta.bandwidth_hz,
        "Tuning metadata changed"
    );
}

/// Passes a retune to the sink whether or not the payload was forwarded.
fn report_metadata<K>(change: Option<FrequencyMetadata>, sink: &mut K) -> AppResult<()>
where
    K: PresentationSink + ?Sized,
{
    match change {
        Some(meta) => {
            log_metadata(meta);
            deliver(sink.metadata_changed(meta))
        }
        None => Ok(()),
    }
}

/// Recoverable sink failures are logged and the session carries on.
fn deliver(result: AppResult<()>) -> AppResult<()> {
    match result {
        Err(err) if err.can_recover() => {
            warn!(error = %err, "Presentation sink rejected an update");
            Ok(())
        }
        other => other,
    }
}
