//! Presentation sinks.
//!
//! The session hands every accepted update to a [`PresentationSink`] as a
//! [`DisplayFrame`], every retune as a [`FrequencyMetadata`] and, on
//! shutdown, a single [`FinalReport`]. Rendering is
//! the sink's business: a UI thread behind a [`ChannelSink`], an external
//! plotting process reading [`JsonLinesSink`] output, or the console.

use crate::acquisition::PollCounters;
use crate::data::{Histogram, OverlayCurve, StatSummary};
use crate::display::axis::AxisBounds;
use crate::error::{AppResult, MonitorError};
use crate::protocol::FrequencyMetadata;
use crate::session::AcquisitionMode;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use tracing::trace;

/// Frames buffered by [`ChannelSink`] before new ones are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Meaning of the `x` values of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XAxisKind {
    /// Position in the count-capped window.
    SampleIndex,
    /// Seconds since the first accepted record.
    ElapsedSeconds,
    /// Bin frequency in Hz.
    FrequencyHz,
}

/// Everything needed to redraw after one accepted update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayFrame {
    /// Mode that produced the frame.
    pub mode: AcquisitionMode,
    /// Frames produced so far, this one included.
    pub sequence: u64,
    /// Meaning of `x`.
    pub x_kind: XAxisKind,
    /// Abscissae, same length as `y`.
    pub x: Vec<f64>,
    /// Window contents or the latest spectrum frame.
    pub y: Vec<f64>,
    /// Statistics of the window (or of its differences in delta mode).
    pub summary: Option<StatSummary>,
    /// Histogram of the summarised series.
    pub histogram: Option<Histogram>,
    /// Density overlay in histogram count units.
    pub overlay: Option<OverlayCurve>,
    /// Bounds of the value axis (the histogram's x axis in power and delta modes).
    pub value_bounds: Option<AxisBounds>,
    /// Bounds of the `x` axis, for modes that scroll it.
    pub x_bounds: Option<AxisBounds>,
    /// Latest tuning metadata.
    pub metadata: Option<FrequencyMetadata>,
    /// Samples currently held in the window.
    pub sample_count: usize,
}

/// Terminal summary produced when a session is cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    /// Mode that ran.
    pub mode: AcquisitionMode,
    /// Records turned into frames over the whole session.
    pub samples_collected: u64,
    /// Samples in the window at shutdown.
    pub window_len: usize,
    /// Differences summarised at shutdown (delta mode only).
    pub differences: Option<usize>,
    /// Final statistics, when computable.
    pub summary: Option<StatSummary>,
    /// Latest tuning metadata.
    pub metadata: Option<FrequencyMetadata>,
    /// Poller totals.
    pub counters: PollCounters,
    /// Session duration in seconds.
    pub elapsed_secs: f64,
}

/// Consumer of display updates.
pub trait PresentationSink: Send {
    /// Handle one frame.
    fn present(&mut self, frame: &DisplayFrame) -> AppResult<()>;

    /// Tuning changed after the first record, even if no frame follows.
    fn metadata_changed(&mut self, _metadata: FrequencyMetadata) -> AppResult<()> {
        Ok(())
    }

    /// Handle the terminal report; called once, after the last frame.
    fn finish(&mut self, report: &FinalReport) -> AppResult<()>;
}

/// Message carried by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkMessage {
    /// A display update.
    Frame(DisplayFrame),
    /// New tuning.
    Metadata(FrequencyMetadata),
    /// The terminal report.
    Report(FinalReport),
}

/// Hands frames to another thread over a bounded channel.
///
/// Frames are offered with `try_send` and dropped while the receiver lags;
/// retunes and the final report wait for room.
pub struct ChannelSink {
    tx: SyncSender<SinkMessage>,
    dropped: u64,
}

impl ChannelSink {
    /// Sink plus the receiving end for the UI thread.
    pub fn new(capacity: usize) -> (Self, Receiver<SinkMessage>) {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        (Self { tx, dropped: 0 }, rx)
    }

    /// Frames dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl PresentationSink for ChannelSink {
    fn present(&mut self, frame: &DisplayFrame) -> AppResult<()> {
        match self.tx.try_send(SinkMessage::Frame(frame.clone())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                trace!(sequence = frame.sequence, "Display channel full, frame dropped");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(MonitorError::Sink("display receiver disconnected".to_string()))
            }
        }
    }

    fn metadata_changed(&mut self, metadata: FrequencyMetadata) -> AppResult<()> {
        self.tx
            .send(SinkMessage::Metadata(metadata))
            .map_err(|_| MonitorError::Sink("display receiver disconnected".to_string()))
    }

    fn finish(&mut self, report: &FinalReport) -> AppResult<()> {
        self.tx
            .send(SinkMessage::Report(report.clone()))
            .map_err(|_| MonitorError::Sink("display receiver disconnected".to_string()))
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonLine<'a> {
    Frame(&'a DisplayFrame),
    Metadata(FrequencyMetadata),
    Report(&'a FinalReport),
}

/// Writes one JSON object per frame, retune or report, newline separated.
///
/// Non-finite numbers are written as `null`.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &JsonLine<'_>) -> AppResult<()> {
        serde_json::to_writer(&mut self.writer, line)
            .map_err(|e| MonitorError::Sink(format!("failed to encode frame: {e}")))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> PresentationSink for JsonLinesSink<W> {
    fn present(&mut self, frame: &DisplayFrame) -> AppResult<()> {
        self.write_line(&JsonLine::Frame(frame))
    }

    fn metadata_changed(&mut self, metadata: FrequencyMetadata) -> AppResult<()> {
        self.write_line(&JsonLine::Metadata(metadata))
    }

    fn finish(&mut self, report: &FinalReport) -> AppResult<()> {
        self.write_line(&JsonLine::Report(report))
    }
}

/// Prints a one-line status every `every` frames and the final report.
pub struct ConsoleSink {
    every: u64,
}

impl ConsoleSink {
    /// Print every `every`-th frame (at least every frame when 0 or 1).
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl PresentationSink for ConsoleSink {
    fn present(&mut self, frame: &DisplayFrame) -> AppResult<()> {
        if frame.sequence % self.every != 0 {
            return Ok(());
        }
        match (&frame.summary, frame.metadata) {
            (Some(s), Some(meta)) => println!(
                "📈 #{:<6} n={:<4} mean={:>9.3} std={:>7.3} min={:>9.3} max={:>9.3}  cf={:.0} Hz bw={:.0} Hz",
                frame.sequence,
                frame.sample_count,
                s.mean,
                s.std_dev,
                s.min,
                s.max,
                meta.center_frequency_hz,
                meta.bandwidth_hz
            ),
            (Some(s), None) => println!(
                "📈 #{:<6} n={:<4} mean={:>9.3} std={:>7.3} min={:>9.3} max={:>9.3}",
                frame.sequence, frame.sample_count, s.mean, s.std_dev, s.min, s.max
            ),
            (None, _) => println!(
                "📈 #{:<6} n={:<4} (collecting)",
                frame.sequence, frame.sample_count
            ),
        }
        Ok(())
    }

    fn metadata_changed(&mut self, metadata: FrequencyMetadata) -> AppResult<()> {
        println!(
            "📡 Retuned: cf={:.0} Hz bw={:.0} Hz",
            metadata.center_frequency_hz, metadata.bandwidth_hz
        );
        Ok(())
    }

    fn finish(&mut self, report: &FinalReport) -> AppResult<()> {
        println!();
        println!("📊 Final report ({:?})", report.mode);
        println!("  Samples collected: {}", report.samples_collected);
        println!("  Samples in window: {}", report.window_len);
        if let Some(diffs) = report.differences {
            println!("  Differences:       {}", diffs);
        }
        match &report.summary {
            Some(s) => {
                println!("  Mean:   {:.4}", s.mean);
                println!("  Median: {:.4}", s.median);
                println!("  Std:    {:.4}", s.std_dev);
                println!("  MAD:    {:.4}", s.mad);
                println!("  Min:    {:.4}", s.min);
                println!("  Max:    {:.4}", s.max);
            }
            None => println!("  Not enough data for statistics"),
        }
        println!(
            "  Reads: {}  forwarded: {}  rejected: {}  failures: {}",
            report.counters.reads,
            report.counters.forwarded,
            report.counters.rejected,
            report.counters.failures
        );
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Frames in arrival order.
    pub frames: Vec<DisplayFrame>,
    /// Retunes in arrival order.
    pub retunes: Vec<FrequencyMetadata>,
    /// The terminal report, once delivered.
    pub report: Option<FinalReport>,
}

impl RecordingSink {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent frame.
    pub fn last_frame(&self) -> Option<&DisplayFrame> {
        self.frames.last()
    }
}

impl PresentationSink for RecordingSink {
    fn present(&mut self, frame: &DisplayFrame) -> AppResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn metadata_changed(&mut self, metadata: FrequencyMetadata) -> AppResult<()> {
        self.retunes.push(metadata);
        Ok(())
    }

    fn finish(&mut self, report: &FinalReport) -> AppResult<()> {
        self.report = Some(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sequence: u64) -> DisplayFrame {
        DisplayFrame {
            mode: AcquisitionMode::Power,
            sequence,
            x_kind: XAxisKind::SampleIndex,
            x: vec![0.0, 1.0],
            y: vec![-40.0, f64::NAN],
            summary: None,
            histogram: None,
            overlay: None,
            value_bounds: AxisBounds::new(-41.0, -39.0),
            x_bounds: None,
            metadata: None,
            sample_count: 2,
        }
    }

    fn report() -> FinalReport {
        FinalReport {
            mode: AcquisitionMode::Power,
            samples_collected: 2,
            window_len: 2,
            differences: None,
            summary: None,
            metadata: None,
            counters: PollCounters::default(),
            elapsed_secs: 1.5,
        }
    }

    #[test]
    fn channel_sink_drops_when_full() {
        let (mut sink, rx) = ChannelSink::new(1);
        sink.present(&frame(1)).unwrap();
        sink.present(&frame(2)).unwrap();
        assert_eq!(sink.dropped(), 1);
        match rx.try_recv().unwrap() {
            SinkMessage::Frame(f) => assert_eq!(f.sequence, 1),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn channel_sink_reports_disconnect() {
        let (mut sink, rx) = ChannelSink::new(4);
        drop(rx);
        let err = sink.present(&frame(1)).unwrap_err();
        assert!(matches!(err, MonitorError::Sink(_)));
        assert!(err.can_recover());
    }

    #[test]
    fn json_lines_are_tagged_and_newline_separated() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.present(&frame(1)).unwrap();
        sink.finish(&report()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "frame");
        assert_eq!(first["mode"], "power");
        assert!(first["y"][1].is_null());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "report");
        assert_eq!(second["samples_collected"], 2);
    }

    #[test]
    fn retunes_are_written_between_frames() {
        let retune = FrequencyMetadata {
            center_frequency_hz: 61e6,
            bandwidth_hz: 30e6,
        };
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.present(&frame(1)).unwrap();
        sink.metadata_changed(retune).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[1]["kind"], "metadata");
        assert_eq!(lines[1]["center_frequency_hz"], 61e6);

        let (mut sink, rx) = ChannelSink::new(1);
        sink.metadata_changed(retune).unwrap();
        assert_eq!(rx.try_recv().unwrap(), SinkMessage::Metadata(retune));
    }

    #[test]
    fn recording_sink_keeps_everything() {
        let mut sink = RecordingSink::new();
        sink.present(&frame(1)).unwrap();
        sink.present(&frame(2)).unwrap();
        sink.finish(&report()).unwrap();
        assert_eq!(sink.frames.len(), 2);
        assert_eq!(sink.last_frame().map(|f| f.sequence), Some(2));
        assert!(sink.report.is_some());
    }
}
