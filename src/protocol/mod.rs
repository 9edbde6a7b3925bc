//! Text protocol spoken by the measurement producer.
//!
//! - [`snapshot`]: the primary snapshot file (power scalar or PSD vector).
//! - [`distribution`]: the secondary file with fitted distribution parameters.
//! - [`source`]: reading either from disk with torn-read tolerance.

pub mod distribution;
pub mod snapshot;
pub mod source;

pub use distribution::{parse_distribution_params, read_distribution_params, DistributionParams};
pub use snapshot::{
    decode_snapshot, decode_snapshot_bytes, DecodeError, FrequencyMetadata, Payload,
    SnapshotFormat, SnapshotRecord,
};
pub use source::{ReadOutcome, SnapshotFile, SnapshotSource};
