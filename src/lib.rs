//! # spectrum-monitor
//!
//! Live statistics for the snapshot files written by a spectrum/power
//! measurement tool. The producer rewrites a small text file in place many
//! times a second; this crate polls it, tolerates torn reads, keeps a bounded
//! window of recent values, and turns that window into statistics, histograms,
//! density overlays and flicker-free axis bounds for a display.
//!
//! ## Crate Structure
//!
//! - **`protocol`**: Decoders for the snapshot and distribution parameter
//!   files, and the `SnapshotSource` abstraction with its typed read outcome.
//! - **`acquisition`**: The change-gated poller and the cooperative shutdown
//!   signal.
//! - **`data`**: Bounded history windows, the statistics engine, histogram
//!   binning and density overlays.
//! - **`display`**: Adaptive axis scaling and the presentation sinks.
//! - **`session`**: `MonitorSession`, which wires one acquisition mode
//!   end to end and runs the polling loop.
//! - **`config`**: Layered `figment` configuration (TOML file plus
//!   `SPECTRUM_MONITOR_*` environment variables).
//! - **`logging`**: `tracing-subscriber` initialisation.
//! - **`error`**: The crate-wide `MonitorError`.
//!
//! ## Example
//!
//! ```no_run
//! use spectrum_monitor::acquisition::shutdown_channel;
//! use spectrum_monitor::config::MonitorConfig;
//! use spectrum_monitor::display::RecordingSink;
//! use spectrum_monitor::session::MonitorSession;
//!
//! # async fn demo() -> Result<(), spectrum_monitor::error::MonitorError> {
//! let config = MonitorConfig::load()?;
//! let (handle, signal) = shutdown_channel();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     handle.cancel();
//! });
//!
//! let mut sink = RecordingSink::new();
//! let report = MonitorSession::from_config(&config)?.run(&mut sink, signal).await?;
//! println!("{} samples", report.samples_collected);
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod config;
pub mod data;
pub mod display;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod session;
