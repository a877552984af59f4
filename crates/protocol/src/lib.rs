//! Wire types and endpoint constants of the media upload API.

pub mod constants;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{
    DEFAULT_API_BASE, DEFAULT_PIPELINE, FORM_CONTENT_TYPE, PROCESS_PATH, STAGING_PATH,
    STATUS_PATH, endpoint,
};
pub use types::{
    FinalizeRequest, ProcessingTask, StatusReport, StatusRequest, UploadDestination,
};
