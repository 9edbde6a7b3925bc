//! Snapshot file decoding.
//!
//! The producer rewrites a short text file in place. The layout is:
//!
//! ```text
//! line 1: center frequency (Hz)
//! line 2: bandwidth (Hz)
//! line 3: declared element count       (size-tagged formats only)
//! line 4..N: payload                    (scalar, or comma separated list)
//! ```
//!
//! Decoding is a pure function of the file contents. Anything short of a
//! complete, well formed record comes back as [`DecodeError::NotReady`]; the
//! only other failure is a size-tagged vector whose token count disagrees with
//! its declared size.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between vector payload tokens.
pub const PAYLOAD_DELIMITER: char = ',';

/// Which flavour of the snapshot protocol a file is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotFormat {
    /// Scalar power; line 3 must be an integer (its value is ignored).
    ScalarPower,
    /// Scalar power; line 3 is skipped without validation.
    ScalarPowerLenient,
    /// Vector payload with a declared size that must match exactly.
    TaggedSpectrum,
    /// Vector payload without a size line; the count is never checked.
    UntaggedSpectrum,
}

impl SnapshotFormat {
    /// Minimum number of lines before a record can be decoded.
    pub fn min_lines(self) -> usize {
        match self {
            SnapshotFormat::UntaggedSpectrum => 3,
            _ => 4,
        }
    }

    /// Index of the first payload line.
    fn payload_line(self) -> usize {
        match self {
            SnapshotFormat::UntaggedSpectrum => 2,
            _ => 3,
        }
    }

    /// Whether the payload is a vector of values.
    pub fn is_vector(self) -> bool {
        matches!(
            self,
            SnapshotFormat::TaggedSpectrum | SnapshotFormat::UntaggedSpectrum
        )
    }
}

/// Tuning metadata carried on the first two lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyMetadata {
    /// Center frequency in Hz.
    pub center_frequency_hz: f64,
    /// Bandwidth in Hz.
    pub bandwidth_hz: f64,
}

/// Decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// A single power reading.
    Scalar(f64),
    /// An ordered PSD trace.
    Vector(Vec<f64>),
}

impl Payload {
    /// Number of values in the payload.
    pub fn len(&self) -> usize {
        match self {
            Payload::Scalar(_) => 1,
            Payload::Vector(values) => values.len(),
        }
    }

    /// True for an empty vector payload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The scalar value, if this is a scalar payload.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Payload::Scalar(value) => Some(*value),
            Payload::Vector(_) => None,
        }
    }

    /// The values as a slice (a scalar is a one-element slice).
    pub fn values(&self) -> &[f64] {
        match self {
            Payload::Scalar(value) => std::slice::from_ref(value),
            Payload::Vector(values) => values,
        }
    }
}

/// One complete snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Center frequency and bandwidth.
    pub metadata: FrequencyMetadata,
    /// Declared element count, when the format carries one.
    pub declared_size: Option<i64>,
    /// Decoded values.
    pub payload: Payload,
}

/// Why a blob did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The file is incomplete or mid-rewrite; try again next tick.
    #[error("snapshot not ready: {0}")]
    NotReady(&'static str),

    /// Size-tagged payload whose decoded count differs from the declared size.
    #[error("declared size {declared} but decoded {decoded} values")]
    ShapeMismatch {
        /// Size on line 3.
        declared: i64,
        /// Values actually decoded.
        decoded: usize,
    },
}

/// Decode raw file bytes.
///
/// Bytes that are not valid UTF-8 are what a torn multi-byte write looks
/// like, so they are reported as not ready.
pub fn decode_snapshot_bytes(
    format: SnapshotFormat,
    bytes: &[u8],
) -> Result<SnapshotRecord, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::NotReady("invalid utf-8"))?;
    decode_snapshot(format, text)
}

/// Decode one snapshot blob.
pub fn decode_snapshot(format: SnapshotFormat, text: &str) -> Result<SnapshotRecord, DecodeError> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < format.min_lines() {
        return Err(DecodeError::NotReady("too few lines"));
    }

    let center_frequency_hz =
        parse_finite(lines[0]).ok_or(DecodeError::NotReady("center frequency"))?;
    let bandwidth_hz = parse_finite(lines[1]).ok_or(DecodeError::NotReady("bandwidth"))?;
    let metadata = FrequencyMetadata {
        center_frequency_hz,
        bandwidth_hz,
    };

    let declared_size = match format {
        SnapshotFormat::ScalarPower | SnapshotFormat::TaggedSpectrum => Some(
            lines[2]
                .trim()
                .parse::<i64>()
                .map_err(|_| DecodeError::NotReady("declared size"))?,
        ),
        SnapshotFormat::ScalarPowerLenient | SnapshotFormat::UntaggedSpectrum => None,
    };

    let payload_lines = &lines[format.payload_line()..];
    let payload = if format.is_vector() {
        let values = parse_vector(payload_lines);
        if let Some(declared) = declared_size {
            if i64::try_from(values.len()).ok() != Some(declared) {
                return Err(DecodeError::ShapeMismatch {
                    declared,
                    decoded: values.len(),
                });
            }
        }
        Payload::Vector(values)
    } else {
        let raw = strip_trailing_delimiter(payload_lines[0].trim());
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| DecodeError::NotReady("scalar payload"))?;
        Payload::Scalar(value)
    };

    Ok(SnapshotRecord {
        metadata,
        declared_size,
        payload,
    })
}

fn parse_finite(line: &str) -> Option<f64> {
    line.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn strip_trailing_delimiter(s: &str) -> &str {
    s.strip_suffix(PAYLOAD_DELIMITER).unwrap_or(s)
}

/// Joins the payload lines, drops one trailing delimiter and parses every
/// token that is a float. Empty and non-numeric tokens are skipped.
fn parse_vector(lines: &[&str]) -> Vec<f64> {
    let joined = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    strip_trailing_delimiter(&joined)
        .split(PAYLOAD_DELIMITER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_scalar_power() {
        let record =
            decode_snapshot(SnapshotFormat::ScalarPower, "59000000\n30000000\n1\n-42.5,\n").unwrap();
        assert_eq!(record.metadata.center_frequency_hz, 59e6);
        assert_eq!(record.metadata.bandwidth_hz, 30e6);
        assert_eq!(record.declared_size, Some(1));
        assert_eq!(record.payload, Payload::Scalar(-42.5));
    }

    #[test]
    fn scalar_size_line_must_be_integer() {
        let err = decode_snapshot(SnapshotFormat::ScalarPower, "1e6\n2e6\nabc\n-40\n").unwrap_err();
        assert_eq!(err, DecodeError::NotReady("declared size"));

        let record =
            decode_snapshot(SnapshotFormat::ScalarPowerLenient, "1e6\n2e6\nabc\n-40\n").unwrap();
        assert_eq!(record.declared_size, None);
        assert_eq!(record.payload.as_scalar(), Some(-40.0));
    }

    #[test]
    fn scalar_garbage_invalidates_record() {
        let err = decode_snapshot(SnapshotFormat::ScalarPower, "1e6\n2e6\n1\n-4x0\n").unwrap_err();
        assert_eq!(err, DecodeError::NotReady("scalar payload"));
    }

    #[test]
    fn non_finite_metadata_is_not_ready() {
        let err = decode_snapshot(SnapshotFormat::ScalarPower, "nan\n2e6\n1\n-40\n").unwrap_err();
        assert_eq!(err, DecodeError::NotReady("center frequency"));
        let err = decode_snapshot(SnapshotFormat::ScalarPower, "1e6\ninf\n1\n-40\n").unwrap_err();
        assert_eq!(err, DecodeError::NotReady("bandwidth"));
    }

    #[test]
    fn tagged_spectrum_requires_exact_count() {
        let ok = decode_snapshot(SnapshotFormat::TaggedSpectrum, "1e6\n2e6\n3\n-1,-2,-3,\n").unwrap();
        assert_eq!(ok.payload, Payload::Vector(vec![-1.0, -2.0, -3.0]));

        let short = decode_snapshot(SnapshotFormat::TaggedSpectrum, "1e6\n2e6\n4\n-1,-2,-3,\n");
        assert_eq!(
            short.unwrap_err(),
            DecodeError::ShapeMismatch {
                declared: 4,
                decoded: 3
            }
        );
    }

    #[test]
    fn tagged_spectrum_counts_only_parsed_tokens() {
        let err = decode_snapshot(SnapshotFormat::TaggedSpectrum, "1e6\n2e6\n3\n-1,oops,-3,\n")
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::ShapeMismatch {
                declared: 3,
                decoded: 2
            }
        );
    }

    #[test]
    fn untagged_spectrum_drops_bad_tokens() {
        let record =
            decode_snapshot(SnapshotFormat::UntaggedSpectrum, "1e6\n2e6\n-1, ,abc,-3.5,\n").unwrap();
        assert_eq!(record.declared_size, None);
        assert_eq!(record.payload, Payload::Vector(vec![-1.0, -3.5]));
    }

    #[test]
    fn vector_payload_spans_lines() {
        let record =
            decode_snapshot(SnapshotFormat::UntaggedSpectrum, "1e6\n2e6\n-1,-2,\n-3,-4,\n").unwrap();
        assert_eq!(record.payload.values(), &[-1.0, -2.0, -3.0, -4.0]);
    }

    #[test]
    fn invalid_utf8_is_not_ready() {
        let err = decode_snapshot_bytes(SnapshotFormat::ScalarPower, &[0x31, 0x0a, 0xff, 0xfe])
            .unwrap_err();
        assert_eq!(err, DecodeError::NotReady("invalid utf-8"));
    }

    #[test]
    fn min_lines_per_format() {
        assert_eq!(SnapshotFormat::ScalarPower.min_lines(), 4);
        assert_eq!(SnapshotFormat::TaggedSpectrum.min_lines(), 4);
        assert_eq!(SnapshotFormat::UntaggedSpectrum.min_lines(), 3);
    }
}
