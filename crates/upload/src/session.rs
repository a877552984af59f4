//! Per-file upload session.
//!
//! A session drives one file through
//! `Idle → AwaitingDestination → UploadingParts → Finalizing → PollingStatus`
//! and ends in `Succeeded`, `Failed` or `Canceled`. All parts are sent
//! concurrently; the first failing part fails the session and drops the
//! remaining requests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use futures_util::future::try_join_all;
use mediadrop_transfer::{
    PartProgress, PartProgressList, PartRange, QueuedFile, is_reportable, part_percentage, split,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{PartProgressFn, PartUpload, StorageApi};
use crate::error::{ApiError, UploadError};
use crate::types::UploadReceipt;

/// Lifecycle stage of an [`UploadSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingDestination,
    UploadingParts,
    Finalizing,
    PollingStatus,
    Succeeded,
    Failed,
    Canceled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Succeeded | SessionState::Failed | SessionState::Canceled
        )
    }
}

type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&UploadError) + Send + Sync>;
type SuccessCallback = Arc<dyn Fn(&UploadReceipt) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    progress: Option<ProgressCallback>,
    error: Option<ErrorCallback>,
    success: Option<SuccessCallback>,
}

/// Uploads one file. Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct UploadSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    file_id: String,
    file_name: String,
    bytes: Bytes,
    chunk_size: u64,
    api: Arc<dyn StorageApi>,
    state: Mutex<SessionState>,
    cancel: CancellationToken,
    callbacks: Mutex<Callbacks>,
    parts: Mutex<Option<PartProgressList>>,
}

impl UploadSession {
    /// Creates an idle session for `file`.
    pub fn new(file: &QueuedFile, api: Arc<dyn StorageApi>, chunk_size: u64) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                file_id: file.id.clone(),
                file_name: file.name.clone(),
                bytes: file.original_bytes.clone(),
                chunk_size,
                api,
                state: Mutex::new(SessionState::Idle),
                cancel: CancellationToken::new(),
                callbacks: Mutex::new(Callbacks::default()),
                parts: Mutex::new(None),
            }),
        }
    }

    /// Sets the progress callback, replacing any previous one.
    ///
    /// Receives the aggregate part progress, only when it is even and
    /// below 100.
    pub fn on_progress(self, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        lock(&self.inner.callbacks).progress = Some(Arc::new(callback));
        self
    }

    /// Sets the error callback, replacing any previous one.
    ///
    /// Fires once when the session ends in `Failed` or `Canceled`.
    pub fn on_error(self, callback: impl Fn(&UploadError) + Send + Sync + 'static) -> Self {
        lock(&self.inner.callbacks).error = Some(Arc::new(callback));
        self
    }

    /// Sets the success callback, replacing any previous one.
    pub fn on_success(self, callback: impl Fn(&UploadReceipt) + Send + Sync + 'static) -> Self {
        lock(&self.inner.callbacks).success = Some(Arc::new(callback));
        self
    }

    /// Spawns the upload on the current tokio runtime.
    ///
    /// The returned handle resolves to the terminal state. Only an idle
    /// session can be started.
    pub fn start(&self) -> Result<JoinHandle<SessionState>, UploadError> {
        {
            let mut state = lock(&self.inner.state);
            if *state != SessionState::Idle {
                return Err(UploadError::AlreadyStarted);
            }
            *state = SessionState::AwaitingDestination;
        }
        debug!(file = %self.inner.file_name, "upload session started");

        let inner = Arc::clone(&self.inner);
        Ok(tokio::spawn(async move { inner.run().await }))
    }

    /// Requests cancellation. No-op once the session has finished.
    ///
    /// Cancellation is cooperative: parts stop at their next check and the
    /// session never finalizes once it has been requested before every
    /// part resolved.
    pub fn abort(&self) {
        if self.state().is_terminal() {
            return;
        }
        debug!(file = %self.inner.file_name, "abort requested");
        self.inner.cancel.cancel();
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.inner.state)
    }

    pub fn file_id(&self) -> &str {
        &self.inner.file_id
    }

    pub fn file_name(&self) -> &str {
        &self.inner.file_name
    }

    /// Snapshot of per-part progress (empty before parts are computed).
    pub fn part_progress(&self) -> Vec<PartProgress> {
        lock(&self.inner.parts)
            .as_ref()
            .map(|list| list.entries().to_vec())
            .unwrap_or_default()
    }
}

impl SessionInner {
    async fn run(self: Arc<Self>) -> SessionState {
        match self.drive().await {
            Ok(receipt) => self.succeed(receipt),
            Err(err) => self.fail(err),
        }
    }

    async fn drive(self: &Arc<Self>) -> Result<UploadReceipt, UploadError> {
        let parts = split(self.bytes.len() as u64, self.chunk_size)?;
        *lock(&self.parts) =
            Some(PartProgressList::new(&self.file_name, parts.len() as u32));

        let destination = self
            .api
            .request_destination()
            .await
            .map_err(UploadError::Destination)?;

        self.transition(SessionState::UploadingParts);
        debug!(file = %self.file_name, parts = parts.len(), key = %destination.key, "uploading parts");
        let uploads = parts.iter().map(|part| self.upload_part(&destination.url, *part));
        try_join_all(uploads).await?;

        // Abort requested after the last part resolved.
        if self.cancel.is_cancelled() {
            return Err(self.canceled());
        }

        self.transition(SessionState::Finalizing);
        let task = self
            .api
            .finalize(destination.key.clone())
            .await
            .map_err(UploadError::Finalize)?;

        self.transition(SessionState::PollingStatus);
        let status = self
            .api
            .poll_status(task.task_id.clone())
            .await
            .map_err(UploadError::StatusPoll)?;

        Ok(UploadReceipt {
            file_id: self.file_id.clone(),
            file_name: self.file_name.clone(),
            key: task.key,
            task_id: task.task_id,
            status,
        })
    }

    async fn upload_part(self: &Arc<Self>, url: &str, part: PartRange) -> Result<(), UploadError> {
        let cancel = self.cancel.child_token();
        if cancel.is_cancelled() {
            return Err(self.canceled());
        }

        let number = part.number;
        let inner = Arc::clone(self);
        let on_progress: PartProgressFn = Arc::new(move |loaded, total| {
            inner.record_part(number, part_percentage(loaded, total));
        });
        let request = PartUpload {
            number,
            url: url.to_string(),
            body: part.slice(&self.bytes),
        };

        let result = self
            .api
            .upload_part(request, on_progress, cancel.clone())
            .await;

        if cancel.is_cancelled() {
            return Err(self.canceled());
        }
        match result {
            Ok(()) => {
                self.record_part(number, 100);
                Ok(())
            }
            Err(ApiError::Canceled) => Err(self.canceled()),
            Err(source) => Err(UploadError::PartUpload {
                part: number,
                source,
            }),
        }
    }

    fn record_part(&self, number: u32, percentage: u8) {
        let aggregate = {
            let mut parts = lock(&self.parts);
            let Some(list) = parts.as_mut() else {
                return;
            };
            match list.update(number, percentage) {
                Ok(aggregate) => aggregate,
                Err(e) => {
                    warn!(file = %self.file_name, error = %e, "ignoring progress for unknown part");
                    return;
                }
            }
        };

        if !is_reportable(aggregate) {
            return;
        }
        let callback = lock(&self.callbacks).progress.clone();
        if let Some(callback) = callback {
            callback(aggregate);
        }
    }

    fn succeed(&self, receipt: UploadReceipt) -> SessionState {
        self.transition(SessionState::Succeeded);
        info!(file = %self.file_name, key = %receipt.key, "upload succeeded");

        let callback = lock(&self.callbacks).success.clone();
        if let Some(callback) = callback {
            callback(&receipt);
        }
        SessionState::Succeeded
    }

    fn fail(&self, err: UploadError) -> SessionState {
        let state = if err.is_canceled() {
            info!(file = %self.file_name, "upload canceled");
            SessionState::Canceled
        } else {
            warn!(file = %self.file_name, error = %err, "upload failed");
            SessionState::Failed
        };
        self.transition(state);

        let callback = lock(&self.callbacks).error.clone();
        if let Some(callback) = callback {
            callback(&err);
        }
        state
    }

    fn transition(&self, to: SessionState) {
        let mut state = lock(&self.state);
        let from = *state;
        debug!(file = %self.file_name, from = ?from, to = ?to, "session transition");
        *state = to;
    }

    fn canceled(&self) -> UploadError {
        UploadError::Canceled(self.file_name.clone())
    }
}

/// Locks `mutex`, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
