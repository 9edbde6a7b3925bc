//! Change-gated polling of a snapshot source.
//!
//! The poller runs much faster than the producer rewrites its file, so most
//! reads return the record it already forwarded. Scalar modes only forward a
//! value that differs from the last forwarded one; spectrum modes forward
//! every decoded frame. Tuning metadata is tracked on its own and a change is
//! reported even when the payload itself is gated out.

use super::shutdown::ShutdownSignal;
use crate::error::{AppResult, MonitorError};
use crate::protocol::{FrequencyMetadata, Payload, ReadOutcome, SnapshotRecord, SnapshotSource};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Forwarding rule applied to decoded payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeGate {
    /// Forward a scalar only when it differs from the last forwarded scalar.
    DistinctScalar,
    /// Forward every frame. With `stable_length`, frames whose length differs
    /// from the first forwarded frame are dropped.
    EveryFrame {
        /// Lock the frame length to the first forwarded frame.
        stable_length: bool,
    },
}

/// What a single poll tick produced.
#[derive(Debug)]
pub enum PollEvent {
    /// Nothing decodable this tick.
    Pending,
    /// Size-tagged frame rejected for a shape mismatch.
    Rejected {
        /// Declared size.
        declared: i64,
        /// Decoded count.
        decoded: usize,
    },
    /// A record was read but gated out as a repeat (or wrong length).
    Unchanged {
        /// New tuning metadata, if it changed.
        metadata_change: Option<FrequencyMetadata>,
    },
    /// A genuinely new record.
    New {
        /// The record to forward.
        record: SnapshotRecord,
        /// New tuning metadata, if it changed.
        metadata_change: Option<FrequencyMetadata>,
    },
    /// Structural failure reading the source.
    Failed {
        /// Underlying OS error.
        error: io::Error,
        /// Failures in a row, including this one.
        consecutive: u32,
    },
}

/// Running totals, useful for the terminal report and for tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCounters {
    /// Read attempts.
    pub reads: u64,
    /// Ticks with nothing decodable.
    pub pending: u64,
    /// Shape mismatches.
    pub rejected: u64,
    /// Records gated out.
    pub unchanged: u64,
    /// Records forwarded.
    pub forwarded: u64,
    /// Structural failures.
    pub failures: u64,
}

/// Drives a [`SnapshotSource`] and forwards only new records.
pub struct ChangeGatedPoller<S: SnapshotSource> {
    source: S,
    gate: ChangeGate,
    last_payload: Option<Payload>,
    metadata: Option<FrequencyMetadata>,
    frame_len: Option<usize>,
    consecutive_failures: u32,
    failure_limit: u32,
    counters: PollCounters,
}

impl<S: SnapshotSource> ChangeGatedPoller<S> {
    /// Creates a poller with no forwarded history.
    pub fn new(source: S, gate: ChangeGate) -> Self {
        Self {
            source,
            gate,
            last_payload: None,
            metadata: None,
            frame_len: None,
            consecutive_failures: 0,
            failure_limit: 0,
            counters: PollCounters::default(),
        }
    }

    /// Treat `limit` consecutive structural failures as fatal (0 = never).
    pub fn with_failure_limit(mut self, limit: u32) -> Self {
        self.failure_limit = limit;
        self
    }

    /// Turn a structural failure into a fatal error once the limit is reached.
    pub fn escalate(&self, error: io::Error, consecutive: u32) -> AppResult<()> {
        if self.failure_limit == 0 || consecutive < self.failure_limit {
            return Ok(());
        }
        Err(MonitorError::Source {
            path: PathBuf::from(self.source.describe()),
            failures: consecutive,
            source: error,
        })
    }

    /// Gate in use.
    pub fn gate(&self) -> ChangeGate {
        self.gate
    }

    /// Latest metadata seen on any decoded record.
    pub fn metadata(&self) -> Option<FrequencyMetadata> {
        self.metadata
    }

    /// Running totals.
    pub fn counters(&self) -> PollCounters {
        self.counters
    }

    /// Description of the underlying source.
    pub fn describe_source(&self) -> String {
        self.source.describe()
    }

    /// One read-decode-gate step.
    pub fn poll_once(&mut self) -> PollEvent {
        self.counters.reads += 1;
        let record = match self.source.read() {
            ReadOutcome::Ready(record) => record,
            ReadOutcome::NotReady => {
                self.consecutive_failures = 0;
                self.counters.pending += 1;
                return PollEvent::Pending;
            }
            ReadOutcome::Rejected { declared, decoded } => {
                self.consecutive_failures = 0;
                self.counters.rejected += 1;
                warn!(
                    source = %self.source.describe(),
                    declared,
                    decoded,
                    "Snapshot rejected: declared size does not match payload"
                );
                return PollEvent::Rejected { declared, decoded };
            }
            ReadOutcome::Failed(error) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.counters.failures += 1;
                warn!(
                    source = %self.source.describe(),
                    error = %error,
                    consecutive = self.consecutive_failures,
                    "Snapshot source read failed"
                );
                return PollEvent::Failed {
                    error,
                    consecutive: self.consecutive_failures,
                };
            }
        };
        self.consecutive_failures = 0;

        if record.payload.is_empty() {
            self.counters.pending += 1;
            return PollEvent::Pending;
        }

        let metadata_change = self.track_metadata(record.metadata);

        if !self.admits(&record.payload) {
            self.counters.unchanged += 1;
            return PollEvent::Unchanged { metadata_change };
        }

        if self.frame_len.is_none() {
            self.frame_len = Some(record.payload.len());
        }
        self.last_payload = Some(record.payload.clone());
        self.counters.forwarded += 1;
        PollEvent::New {
            record,
            metadata_change,
        }
    }

    /// Poll at `interval` until the first record arrives.
    ///
    /// Returns `Ok(None)` when cancelled first. Structural failures are
    /// tolerated up to the failure limit, like in the steady-state loop.
    pub async fn wait_for_first(
        &mut self,
        shutdown: &mut ShutdownSignal,
        interval: Duration,
    ) -> AppResult<Option<SnapshotRecord>> {
        info!(source = %self.source.describe(), "Waiting for data...");
        loop {
            if shutdown.is_cancelled() {
                return Ok(None);
            }
            match self.poll_once() {
                PollEvent::New { record, .. } => return Ok(Some(record)),
                PollEvent::Failed { error, consecutive } => self.escalate(error, consecutive)?,
                _ => {}
            }
            if shutdown.sleep_or_cancel(interval).await {
                return Ok(None);
            }
        }
    }

    fn track_metadata(&mut self, metadata: FrequencyMetadata) -> Option<FrequencyMetadata> {
        if self.metadata == Some(metadata) {
            return None;
        }
        self.metadata = Some(metadata);
        Some(metadata)
    }

    fn admits(&self, payload: &Payload) -> bool {
        match self.gate {
            ChangeGate::DistinctScalar => match (&self.last_payload, payload) {
                (Some(Payload::Scalar(last)), Payload::Scalar(new)) => new != last,
                _ => true,
            },
            ChangeGate::EveryFrame { stable_length } => {
                match self.frame_len {
                    Some(expected) if stable_length && payload.len() != expected => {
                        debug!(
                            expected,
                            actual = payload.len(),
                            "Dropping frame with a different bin count"
                        );
                        false
                    }
                    _ => true,
                }
            }
        }
    }
}
