//! Distribution parameter file.
//!
//! Three trimmed float lines written by the anomaly detector: location,
//! scale and skew of a skewed Cauchy fit. No cross-validation happens here;
//! the overlay evaluator guards against a degenerate scale itself.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::trace;

/// Parameters of the fitted density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionParams {
    /// Location (center) of the distribution.
    pub location: f64,
    /// Scale of the distribution.
    pub scale: f64,
    /// Skew in (-1, 1) for a valid skewed Cauchy.
    pub skew: f64,
}

/// Parse the parameter blob. `None` means "no overlay available".
pub fn parse_distribution_params(text: &str) -> Option<DistributionParams> {
    let mut lines = text.lines();
    let mut next = || lines.next().and_then(|line| line.trim().parse::<f64>().ok());
    let location = next()?;
    let scale = next()?;
    let skew = next()?;
    Some(DistributionParams {
        location,
        scale,
        skew,
    })
}

/// Read and parse the parameter file. Any I/O failure means "no overlay".
pub fn read_distribution_params(path: &Path) -> Option<DistributionParams> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_distribution_params(&text),
        Err(err) => {
            trace!(path = %path.display(), error = %err, "distribution parameters unavailable");
            None
        }
    }
}
