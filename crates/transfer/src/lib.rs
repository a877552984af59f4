//! Multipart transfer primitives: part splitting, per-part progress
//! aggregation and the queued-file data model.

mod parts;
mod progress;
mod types;

pub use parts::{part_count, split};
pub use progress::{PartProgressList, is_reportable, part_percentage};
pub use types::{FileStatus, PartProgress, PartRange, QueuedFile};

/// Default part size: 5 MiB.
///
/// Smallest part size accepted by S3-compatible multipart APIs for every
/// part except the last.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("{total_bytes} bytes at chunk size {chunk_size} exceed the part limit")]
    TooManyParts { total_bytes: u64, chunk_size: u64 },

    #[error("part {part} out of range (file has {total} parts)")]
    PartOutOfRange { part: u32, total: u32 },
}
