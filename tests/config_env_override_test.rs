//! Environment overrides. Kept in its own test binary because it mutates
//! the process environment.

use spectrum_monitor::config::MonitorConfig;
use spectrum_monitor::session::AcquisitionMode;

#[test]
fn test_environment_overrides_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("monitor.toml");
    std::fs::write(&path, "[history]\ncapacity = 32\n").expect("write config");

    std::env::set_var("SPECTRUM_MONITOR_HISTORY__CAPACITY", "64");
    std::env::set_var("SPECTRUM_MONITOR_ACQUISITION__MODE", "spectrum-untagged");
    let config = MonitorConfig::load_from(&path);
    std::env::remove_var("SPECTRUM_MONITOR_HISTORY__CAPACITY");
    std::env::remove_var("SPECTRUM_MONITOR_ACQUISITION__MODE");

    let config = config.expect("config loads");
    assert_eq!(config.history.capacity, 64);
    assert_eq!(config.acquisition.mode, AcquisitionMode::SpectrumUntagged);
}
