//! Configuration System using Figment
//!
//! This module provides strongly-typed configuration loading for the monitor.
//! Configuration is loaded from:
//! 1. `config/monitor.toml` (base configuration, optional)
//! 2. Environment variables (prefixed with `SPECTRUM_MONITOR_`, nested keys split on `__`)
//!
//! Every field has a default, so running without a file gives the same
//! behaviour as the original plotting tools: 250-sample histories, a 10 ms
//! poll tick and a 10 s trend window.
//!
//! # Example
//! ```no_run
//! use spectrum_monitor::config::MonitorConfig;
//!
//! let config = MonitorConfig::load()?;
//! println!("Polling {}", config.acquisition.snapshot_path.display());
//! # Ok::<(), spectrum_monitor::error::MonitorError>(())
//! ```

use crate::error::{AppResult, MonitorError};
use crate::logging::OutputFormat;
use crate::session::AcquisitionMode;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the layered configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SPECTRUM_MONITOR_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Snapshot polling settings
    pub acquisition: AcquisitionConfig,
    /// History window sizing
    pub history: HistoryConfig,
    /// Histogram and overlay settings
    pub histogram: HistogramConfig,
    /// Axis scaling constants
    pub axis: AxisConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    pub log_format: OutputFormat,
    /// Log span open/close events
    pub log_span_events: bool,
}

/// Where and how often to poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Acquisition mode wired by the session
    pub mode: AcquisitionMode,
    /// Primary snapshot file rewritten by the producer
    pub snapshot_path: PathBuf,
    /// Distribution parameter file (power mode overlay)
    pub distribution_path: PathBuf,
    /// Poll tick once data is flowing, in milliseconds
    pub poll_interval_ms: u64,
    /// Poll tick while waiting for the first record, in milliseconds
    pub startup_poll_interval_ms: u64,
    /// Consecutive structural read failures tolerated (0 = unlimited)
    pub max_consecutive_source_failures: u32,
}

/// Capacity of the bounded windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Sample capacity of count-capped windows
    pub capacity: usize,
    /// Horizon of the time-capped trend window, in seconds
    pub time_horizon_secs: f64,
}

/// Histogram binning and overlay resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Number of equal-width bins
    pub bins: usize,
    /// Number of points on the overlay curve
    pub overlay_resolution: usize,
}

/// Axis scaler constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    /// Hard margin around histogram data (power/delta modes)
    pub histogram_margin: f64,
    /// Margin around spectrum traces, in dB
    pub spectrum_margin: f64,
    /// EMA factor for spectrum bounds
    pub spectrum_alpha: f64,
    /// Hysteresis margin for the power trend, in dB
    pub trend_margin: f64,
    /// Expansion factor applied to the trend span on rescale
    pub trend_expand_factor: f64,
    /// Half span of the initial trend bounds around the first sample
    pub trend_initial_half_span: f64,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "spectrum-monitor".to_string(),
            log_level: "info".to_string(),
            log_format: OutputFormat::Compact,
            log_span_events: false,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            mode: AcquisitionMode::Power,
            snapshot_path: PathBuf::from("build/avg_power_output.txt"),
            distribution_path: PathBuf::from("build/cauchy_dist.txt"),
            poll_interval_ms: 10,
            startup_poll_interval_ms: 100,
            max_consecutive_source_failures: 0,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 250,
            time_horizon_secs: 10.0,
        }
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bins: 50,
            overlay_resolution: 200,
        }
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            histogram_margin: 0.0,
            spectrum_margin: 5.0,
            spectrum_alpha: 0.1,
            trend_margin: 1.0,
            trend_expand_factor: 1.1,
            trend_initial_half_span: 0.3,
        }
    }
}

impl AcquisitionConfig {
    /// Poll tick as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Startup poll tick as a `Duration`.
    pub fn startup_poll_interval(&self) -> Duration {
        Duration::from_millis(self.startup_poll_interval_ms)
    }
}

impl MonitorConfig {
    /// Load configuration from `config/monitor.toml` and environment variables
    ///
    /// Environment variables can override configuration with prefix `SPECTRUM_MONITOR_`.
    /// Example: `SPECTRUM_MONITOR_APPLICATION__LOG_LEVEL=debug`
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Self::figment(path.as_ref()).extract()?;
        Ok(config)
    }

    /// The layered provider stack, exposed for callers that merge CLI overrides.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(MonitorConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> AppResult<String> {
        toml::to_string_pretty(self).map_err(|e| MonitorError::Configuration(e.to_string()))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |msg: String| Err(MonitorError::Configuration(msg));

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return invalid(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.acquisition.poll_interval_ms == 0 || self.acquisition.startup_poll_interval_ms == 0
        {
            return invalid("poll intervals must be at least 1 ms".to_string());
        }

        if self.history.capacity == 0 {
            return invalid("history.capacity must be greater than 0".to_string());
        }
        let horizon = self.history.time_horizon_secs;
        if !(horizon.is_finite() && horizon > 0.0) {
            return invalid(format!(
                "history.time_horizon_secs must be positive and finite, got {horizon}"
            ));
        }

        if self.histogram.bins == 0 {
            return invalid("histogram.bins must be greater than 0".to_string());
        }
        if self.histogram.overlay_resolution < 2 {
            return invalid(format!(
                "histogram.overlay_resolution must be at least 2, got {}",
                self.histogram.overlay_resolution
            ));
        }

        let axis = &self.axis;
        if !(axis.histogram_margin.is_finite() && axis.histogram_margin >= 0.0) {
            return invalid(format!(
                "axis.histogram_margin must be non-negative, got {}",
                axis.histogram_margin
            ));
        }
        for (name, value) in [
            ("axis.spectrum_margin", axis.spectrum_margin),
            ("axis.trend_margin", axis.trend_margin),
            ("axis.trend_initial_half_span", axis.trend_initial_half_span),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{name} must be positive and finite, got {value}"));
            }
        }
        if !(axis.spectrum_alpha > 0.0 && axis.spectrum_alpha <= 1.0) {
            return invalid(format!(
                "axis.spectrum_alpha must be in (0, 1], got {}",
                axis.spectrum_alpha
            ));
        }
        if !(axis.trend_expand_factor.is_finite() && axis.trend_expand_factor >= 1.0) {
            return invalid(format!(
                "axis.trend_expand_factor must be >= 1, got {}",
                axis.trend_expand_factor
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_plotting_tools() {
        let config = MonitorConfig::default();
        assert_eq!(config.history.capacity, 250);
        assert_eq!(config.histogram.bins, 50);
        assert_eq!(config.histogram.overlay_resolution, 200);
        assert_eq!(config.acquisition.poll_interval(), Duration::from_millis(10));
        assert_eq!(
            config.acquisition.startup_poll_interval(),
            Duration::from_millis(100)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = MonitorConfig::default();
        config.application.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = MonitorConfig::default();
        config.history.capacity = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("history.capacity"));
    }

    #[test]
    fn test_alpha_out_of_range_rejected() {
        let mut config = MonitorConfig::default();
        config.axis.spectrum_alpha = 1.5;
        assert!(config.validate().is_err());
        config.axis.spectrum_alpha = 0.0;
        assert!(config.validate().is_err());
        config.axis.spectrum_alpha = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nan_horizon_rejected() {
        let mut config = MonitorConfig::default();
        config.history.time_horizon_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        std::fs::write(
            &path,
            r#"
                [acquisition]
                mode = "spectrum"
                snapshot_path = "build/psd_output.txt"

                [history]
                capacity = 32
            "#,
        )
        .unwrap();

        let config = MonitorConfig::load_from(&path).unwrap();
        assert_eq!(config.acquisition.mode, AcquisitionMode::Spectrum);
        assert_eq!(
            config.acquisition.snapshot_path,
            PathBuf::from("build/psd_output.txt")
        );
        assert_eq!(config.history.capacity, 32);
        assert_eq!(config.histogram.bins, 50);
    }

    #[test]
    fn log_format_is_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        std::fs::write(
            &path,
            "[application]\nlog_format = \"json\"\nlog_span_events = true\n",
        )
        .unwrap();

        let config = MonitorConfig::load_from(&path).unwrap();
        assert_eq!(config.application.log_format, OutputFormat::Json);
        assert!(config.application.log_span_events);

        std::fs::write(&path, "[application]\nlog_format = \"fancy\"\n").unwrap();
        assert!(MonitorConfig::load_from(&path).is_err());
    }

    #[test]
    fn effective_config_renders_as_toml() {
        let rendered = MonitorConfig::default().to_toml_string().unwrap();
        assert!(rendered.contains("[acquisition]"));
        assert!(rendered.contains("poll_interval_ms = 10"));
    }
}
