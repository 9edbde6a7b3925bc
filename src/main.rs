//! CLI entry point for spectrum-monitor
//!
//! Watches the snapshot file written by the measurement tool and streams
//! statistics, axis bounds and overlays for one acquisition mode.
//!
//! # Usage
//!
//! Power histogram with the console summary:
//! ```bash
//! spectrum-monitor power --snapshot build/avg_power_output.txt
//! ```
//!
//! PSD trace as JSON lines for an external plotter:
//! ```bash
//! spectrum-monitor spectrum --snapshot build/psd_output.txt --json | plotter
//! ```
//!
//! Press Ctrl+C to stop; the final report is printed before exit.

use anyhow::{Context, Result};
use clap::Parser;
use spectrum_monitor::acquisition::shutdown_channel;
use spectrum_monitor::config::{MonitorConfig, DEFAULT_CONFIG_PATH};
use spectrum_monitor::display::{ConsoleSink, JsonLinesSink, PresentationSink};
use spectrum_monitor::logging;
use spectrum_monitor::session::{AcquisitionMode, MonitorSession};
use std::path::PathBuf;
use tracing::{error, info};

/// Frames between console status lines.
const CONSOLE_EVERY: u64 = 10;

#[derive(Parser)]
#[command(name = "spectrum-monitor")]
#[command(about = "Live statistics for power and PSD snapshot files", long_about = None)]
struct Cli {
    /// Acquisition mode
    #[arg(value_enum)]
    mode: AcquisitionMode,

    /// Configuration file (TOML)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Snapshot file to poll, overriding the configuration
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Distribution parameter file, overriding the configuration
    #[arg(long)]
    distribution: Option<PathBuf>,

    /// Write frames and the final report to stdout as JSON lines
    #[arg(long)]
    json: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MonitorConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.acquisition.mode = cli.mode;
    if let Some(path) = cli.snapshot {
        config.acquisition.snapshot_path = path;
    }
    if let Some(path) = cli.distribution {
        config.acquisition.distribution_path = path;
    }
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    logging::init_from_config(&config)?;

    if !cli.json {
        println!("🚀 spectrum-monitor - {} mode", config.acquisition.mode);
        println!("📄 Snapshot: {}", config.acquisition.snapshot_path.display());
        if config.acquisition.mode == AcquisitionMode::Power {
            println!(
                "📐 Distribution: {}",
                config.acquisition.distribution_path.display()
            );
        }
        println!("   Press Ctrl+C to stop");
        println!();
    }

    let mut sink: Box<dyn PresentationSink> = if cli.json {
        Box::new(JsonLinesSink::new(std::io::stdout()))
    } else {
        Box::new(ConsoleSink::new(CONSOLE_EVERY))
    };

    let (handle, signal) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
        }
        handle.cancel();
    });

    let mut session = MonitorSession::from_config(&config)?;
    let report = session.run(sink.as_mut(), signal).await?;

    if !cli.json {
        println!("\n👋 Stopped after {:.1} s", report.elapsed_secs);
    }
    Ok(())
}
