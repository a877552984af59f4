//! Chunked multipart upload of queued files to object storage.
//!
//! This crate implements the **upload logic** only. Remote calls go
//! through the [`StorageApi`] trait; [`HttpStorageApi`] is the reqwest
//! implementation and tests use in-memory mocks.
//!
//! # Pipeline (per file)
//!
//! 1. **Destination**: request a pre-signed upload URL
//! 2. **Parts**: PUT every part concurrently
//! 3. **Finalize**: close the multipart upload, start processing
//! 4. **Status**: confirm the processing task
//!
//! [`UploadOrchestrator`] runs files through this pipeline one at a time.

pub mod api;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export primary types for convenience.
pub use api::{ApiFuture, PartProgressFn, PartUpload, StorageApi};
pub use error::{ApiError, UploadError};
pub use http::{ApiConfig, HttpStorageApi};
pub use orchestrator::{BatchHandle, UploadOrchestrator};
pub use registry::SessionRegistry;
pub use session::{SessionState, UploadSession};
pub use types::{
    BatchProgress, BatchReport, FileOutcome, OrchestratorConfig, UploadEvent, UploadReceipt,
};
