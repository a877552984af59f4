//! Remote storage API trait.
//!
//! `StorageApi` is implemented by [`HttpStorageApi`](crate::HttpStorageApi)
//! for real endpoints. Keeping the calls behind a trait keeps session logic
//! decoupled from transport and testable with mocks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use mediadrop_protocol::{ProcessingTask, StatusReport, UploadDestination};
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// Boxed future returned by [`StorageApi`] calls.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Receives `(bytes_sent, part_len)` while a part is being sent.
pub type PartProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// One part PUT.
#[derive(Debug, Clone)]
pub struct PartUpload {
    /// 1-based part number.
    pub number: u32,
    /// Pre-signed destination URL.
    pub url: String,
    pub body: Bytes,
}

/// The four remote calls a multipart upload makes.
pub trait StorageApi: Send + Sync {
    /// Obtains a pre-signed upload destination.
    fn request_destination(&self) -> ApiFuture<'_, UploadDestination>;

    /// Sends one part.
    ///
    /// Implementations report progress through `on_progress` and must
    /// return [`ApiError::Canceled`] promptly once `cancel` fires.
    fn upload_part(
        &self,
        part: PartUpload,
        on_progress: PartProgressFn,
        cancel: CancellationToken,
    ) -> ApiFuture<'_, ()>;

    /// Closes the multipart upload and starts the processing pipeline.
    fn finalize(&self, key: String) -> ApiFuture<'_, ProcessingTask>;

    /// Checks the processing task. Any successful response is final.
    fn poll_status(&self, task_id: String) -> ApiFuture<'_, StatusReport>;
}
