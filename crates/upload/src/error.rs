//! Upload error types.

/// Failure of a single remote call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API key")]
    InvalidKey,

    #[error("request canceled")]
    Canceled,
}

/// Errors produced by upload sessions and the orchestrator.
///
/// Each remote stage has its own variant so callers can tell where a
/// session stopped.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to obtain upload destination: {0}")]
    Destination(#[source] ApiError),

    #[error("part {part} upload failed: {source}")]
    PartUpload {
        part: u32,
        #[source]
        source: ApiError,
    },

    #[error("finalize failed: {0}")]
    Finalize(#[source] ApiError),

    #[error("status check failed: {0}")]
    StatusPoll(#[source] ApiError),

    #[error("{0} uploading canceled.")]
    Canceled(String),

    #[error("no upload session at index {0}")]
    NotFound(usize),

    #[error("upload session already started")]
    AlreadyStarted,

    #[error("transfer error: {0}")]
    Transfer(#[from] mediadrop_transfer::TransferError),
}

impl UploadError {
    /// Whether this error is the result of a user abort.
    pub fn is_canceled(&self) -> bool {
        matches!(self, UploadError::Canceled(_))
    }
}
