//! Reading the snapshot file from disk.
//!
//! The producer rewrites the file out-of-band, so any read can be torn. The
//! reader turns every outcome into a [`ReadOutcome`]: transient conditions
//! become `NotReady`, a size mismatch becomes `Rejected`, and only OS errors
//! that look structural (permission denied, path is a directory, ...) are
//! surfaced as `Failed` so the caller can tell them apart.

use super::snapshot::{decode_snapshot_bytes, DecodeError, SnapshotFormat, SnapshotRecord};
use std::io;
use std::path::{Path, PathBuf};

/// Result of one read attempt.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete record.
    Ready(SnapshotRecord),
    /// Nothing usable this tick.
    NotReady,
    /// Size-tagged record with a token count that disagrees with its header.
    Rejected {
        /// Declared size on line 3.
        declared: i64,
        /// Number of values decoded.
        decoded: usize,
    },
    /// Structural failure at the path level.
    Failed(io::Error),
}

impl ReadOutcome {
    /// Classify an I/O error as transient or structural.
    pub fn from_io_error(err: io::Error) -> Self {
        if is_transient(&err) {
            ReadOutcome::NotReady
        } else {
            ReadOutcome::Failed(err)
        }
    }

    /// Wrap a decode result.
    pub fn from_decoded(decoded: Result<SnapshotRecord, DecodeError>) -> Self {
        match decoded {
            Ok(record) => ReadOutcome::Ready(record),
            Err(DecodeError::NotReady(_)) => ReadOutcome::NotReady,
            Err(DecodeError::ShapeMismatch { declared, decoded }) => {
                ReadOutcome::Rejected { declared, decoded }
            }
        }
    }
}

/// File missing or truncated mid-write, or an interrupted syscall.
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::InvalidData
    )
}

/// Something that can be asked for the latest snapshot.
///
/// The file-backed implementation is [`SnapshotFile`]; tests substitute
/// scripted sources.
pub trait SnapshotSource: Send {
    /// Attempt one read.
    fn read(&mut self) -> ReadOutcome;

    /// Human readable origin, used in diagnostics.
    fn describe(&self) -> String;
}

/// A snapshot file on disk in a given protocol format.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
    format: SnapshotFormat,
}

impl SnapshotFile {
    /// Creates a reader for `path`.
    pub fn new(path: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Protocol format.
    pub fn format(&self) -> SnapshotFormat {
        self.format
    }
}

impl SnapshotSource for SnapshotFile {
    fn read(&mut self) -> ReadOutcome {
        match std::fs::read(&self.path) {
            Ok(bytes) => ReadOutcome::from_decoded(decode_snapshot_bytes(self.format, &bytes)),
            Err(err) => ReadOutcome::from_io_error(err),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = SnapshotFile::new(dir.path().join("psd_output.txt"), SnapshotFormat::TaggedSpectrum);
        assert!(matches!(file.read(), ReadOutcome::NotReady));
    }

    #[test]
    fn directory_is_a_structural_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = SnapshotFile::new(dir.path(), SnapshotFormat::ScalarPower);
        assert!(matches!(file.read(), ReadOutcome::Failed(_)));
    }

    #[test]
    fn truncated_file_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avg_power_output.txt");
        std::fs::write(&path, "59000000\n30000000\n").unwrap();
        let mut file = SnapshotFile::new(&path, SnapshotFormat::ScalarPower);
        assert!(matches!(file.read(), ReadOutcome::NotReady));
    }

    #[test]
    fn complete_file_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avg_power_output.txt");
        std::fs::write(&path, "59000000\n30000000\n1\n-38.25,\n").unwrap();
        let mut file = SnapshotFile::new(&path, SnapshotFormat::ScalarPower);
        match file.read() {
            ReadOutcome::Ready(record) => assert_eq!(record.payload.as_scalar(), Some(-38.25)),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("psd_output.txt");
        std::fs::write(&path, "1e6\n2e6\n5\n-1,-2,\n").unwrap();
        let mut file = SnapshotFile::new(&path, SnapshotFormat::TaggedSpectrum);
        assert!(matches!(
            file.read(),
            ReadOutcome::Rejected {
                declared: 5,
                decoded: 2
            }
        ));
    }

    #[test]
    fn error_kinds_are_classified() {
        let transient = io::Error::from(io::ErrorKind::UnexpectedEof);
        assert!(matches!(ReadOutcome::from_io_error(transient), ReadOutcome::NotReady));
        let structural = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(ReadOutcome::from_io_error(structural), ReadOutcome::Failed(_)));
    }
}
