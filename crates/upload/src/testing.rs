//! In-memory `StorageApi` for session and orchestrator tests.

use std::collections::HashSet;
use std::sync::Mutex;

use bytes::Bytes;
use mediadrop_protocol::{ProcessingTask, StatusReport, UploadDestination};
use mediadrop_transfer::QueuedFile;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiFuture, PartProgressFn, PartUpload, StorageApi};
use crate::error::ApiError;

/// A remote call seen by [`MockApi`].
///
/// `seq` is the destination number, one per session, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Destination(usize),
    Part { seq: usize, number: u32, len: usize },
    Finalize(String),
    Status(String),
}

#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<Call>>,
    next_seq: Mutex<usize>,
    fail_destination: HashSet<usize>,
    fail_part: HashSet<(usize, u32)>,
    fail_finalize: HashSet<usize>,
    fail_status: HashSet<usize>,
    hang_parts: HashSet<usize>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_destination(mut self, seq: usize) -> Self {
        self.fail_destination.insert(seq);
        self
    }

    pub fn fail_part(mut self, seq: usize, part: u32) -> Self {
        self.fail_part.insert((seq, part));
        self
    }

    pub fn fail_finalize(mut self, seq: usize) -> Self {
        self.fail_finalize.insert(seq);
        self
    }

    pub fn fail_status(mut self, seq: usize) -> Self {
        self.fail_status.insert(seq);
        self
    }

    /// Parts of session `seq` report half progress, then wait for cancellation.
    pub fn hang_parts(mut self, seq: usize) -> Self {
        self.hang_parts.insert(seq);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn part_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Part { .. }))
    }

    pub fn part_calls_for(&self, seq: usize) -> usize {
        self.count(|c| matches!(c, Call::Part { seq: s, .. } if *s == seq))
    }

    pub fn finalize_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Finalize(_)))
    }

    pub fn status_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Status(_)))
    }

    fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| f(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn seq_of(key_or_url: &str) -> usize {
    key_or_url
        .rsplit("obj-")
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(usize::MAX)
}

fn server_error() -> ApiError {
    ApiError::Status {
        status: 500,
        body: "boom".into(),
    }
}

impl StorageApi for MockApi {
    fn request_destination(&self) -> ApiFuture<'_, UploadDestination> {
        Box::pin(async move {
            let seq = {
                let mut next = self.next_seq.lock().unwrap();
                let seq = *next;
                *next += 1;
                seq
            };
            self.record(Call::Destination(seq));
            if self.fail_destination.contains(&seq) {
                return Err(server_error());
            }
            Ok(UploadDestination {
                key: format!("obj-{seq}"),
                url: format!("https://storage.test/obj-{seq}"),
            })
        })
    }

    fn upload_part(
        &self,
        part: PartUpload,
        on_progress: PartProgressFn,
        cancel: CancellationToken,
    ) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let seq = seq_of(&part.url);
            self.record(Call::Part {
                seq,
                number: part.number,
                len: part.body.len(),
            });
            let total = part.body.len() as u64;

            if self.hang_parts.contains(&seq) {
                on_progress(total / 2, total);
                cancel.cancelled().await;
                return Err(ApiError::Canceled);
            }

            for quarter in 1..=4u64 {
                if cancel.is_cancelled() {
                    return Err(ApiError::Canceled);
                }
                on_progress(total * quarter / 4, total);
                tokio::task::yield_now().await;
            }

            if self.fail_part.contains(&(seq, part.number)) {
                return Err(server_error());
            }
            Ok(())
        })
    }

    fn finalize(&self, key: String) -> ApiFuture<'_, ProcessingTask> {
        Box::pin(async move {
            self.record(Call::Finalize(key.clone()));
            if self.fail_finalize.contains(&seq_of(&key)) {
                return Err(server_error());
            }
            Ok(ProcessingTask {
                task_id: format!("task-{key}"),
                key,
            })
        })
    }

    fn poll_status(&self, task_id: String) -> ApiFuture<'_, StatusReport> {
        Box::pin(async move {
            self.record(Call::Status(task_id.clone()));
            if self.fail_status.contains(&seq_of(&task_id)) {
                return Err(server_error());
            }
            Ok(StatusReport {
                body: r#"{"status":"done"}"#.into(),
            })
        })
    }
}

/// A queued file of `size` zero bytes, with an id derived from its name.
pub fn queued(name: &str, size: usize) -> QueuedFile {
    QueuedFile::new(format!("id-{name}"), name, Bytes::from(vec![0u8; size]))
}
