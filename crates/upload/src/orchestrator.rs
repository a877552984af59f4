//! Batch orchestrator.
//!
//! Runs queued files through upload sessions one at a time, in file order.
//! A failed or canceled file never stops the batch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mediadrop_notify::NotificationSink;
use mediadrop_transfer::{FileStatus, QueuedFile};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::api::StorageApi;
use crate::error::UploadError;
use crate::registry::SessionRegistry;
use crate::session::{SessionState, UploadSession};
use crate::types::{
    BatchProgress, BatchReport, FileOutcome, OrchestratorConfig, UploadEvent,
};

/// Uploads a batch of files sequentially.
pub struct UploadOrchestrator {
    api: Arc<dyn StorageApi>,
    config: OrchestratorConfig,
    notifier: Arc<dyn NotificationSink>,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    batch: BatchHandle,
}

impl UploadOrchestrator {
    pub fn new(
        api: Arc<dyn StorageApi>,
        config: OrchestratorConfig,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            api,
            config,
            notifier,
            events_tx,
            events_rx: Some(events_rx),
            batch: BatchHandle::default(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Events are only emitted after the receiver has been taken.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a handle for cancelling and inspecting the running batch.
    pub fn handle(&self) -> BatchHandle {
        self.batch.clone()
    }

    /// Uploads every pending file and returns once all are final.
    ///
    /// Replaces any previous batch. Files already `Completed` are skipped.
    pub async fn run_batch(&self, files: Vec<QueuedFile>) -> BatchReport {
        let total = files.len();
        self.batch.reset(files);
        info!(files = total, chunk_size = self.config.chunk_size, "upload batch started");

        let mut cursor = 0;
        while let Some(index) = self.batch.next_pending(cursor) {
            cursor = index + 1;
            self.upload_file(index).await;
        }

        let report = self.batch.report();
        self.emit(UploadEvent::BatchFinished {
            completed: report.completed_process_count,
            total,
        });
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            canceled = report.canceled(),
            "upload batch finished"
        );
        report
    }

    async fn upload_file(&self, index: usize) {
        let Some(file) = self.batch.file(index) else {
            return;
        };
        let session = self.session_for(&file);

        let Some(session_index) = self.batch.begin(index, session.clone()) else {
            return;
        };
        self.emit(UploadEvent::Started {
            index: session_index,
            file_id: file.id.clone(),
            name: file.name.clone(),
        });

        let state = match session.start() {
            Ok(handle) => handle.await.unwrap_or_else(|e| {
                error!(file = %file.name, error = %e, "upload task failed");
                self.batch
                    .record_error(&file.id, format!("upload task failed: {e}"));
                SessionState::Failed
            }),
            Err(e) => {
                warn!(file = %file.name, error = %e, "session could not start");
                self.batch.record_error(&file.id, e.to_string());
                SessionState::Failed
            }
        };

        let Some(outcome) = self.batch.finish(&file.id, state) else {
            return;
        };
        let event = match outcome.status {
            FileStatus::Completed => UploadEvent::Succeeded {
                file_id: outcome.file_id,
                name: outcome.name,
                key: outcome.key.unwrap_or_default(),
            },
            FileStatus::Canceled => UploadEvent::Canceled {
                file_id: outcome.file_id,
                name: outcome.name,
            },
            _ => UploadEvent::Failed {
                file_id: outcome.file_id,
                name: outcome.name,
                error: outcome.error.unwrap_or_default(),
            },
        };
        self.emit(event);
    }

    fn session_for(&self, file: &QueuedFile) -> UploadSession {
        let progress_batch = self.batch.clone();
        let progress_id = file.id.clone();
        let progress_events = self.progress_sender();

        let success_batch = self.batch.clone();
        let success_id = file.id.clone();
        let success_notifier = Arc::clone(&self.notifier);

        let error_batch = self.batch.clone();
        let error_id = file.id.clone();
        let error_notifier = Arc::clone(&self.notifier);

        UploadSession::new(file, Arc::clone(&self.api), self.config.chunk_size)
            .on_progress(move |percent| {
                progress_batch.record_progress(&progress_id, percent);
                if let Some(tx) = &progress_events {
                    let _ = tx.try_send(UploadEvent::Progress {
                        file_id: progress_id.clone(),
                        percent,
                    });
                }
            })
            .on_success(move |receipt| {
                success_batch.record_key(&success_id, receipt.key.clone());
                success_notifier.info(receipt.message());
            })
            .on_error(move |err: &UploadError| {
                let message = err.to_string();
                error_batch.record_error(&error_id, message.clone());
                if err.is_canceled() {
                    error_notifier.info(message);
                } else {
                    error_notifier.error(message);
                }
            })
    }

    fn progress_sender(&self) -> Option<mpsc::Sender<UploadEvent>> {
        self.events_rx
            .is_none()
            .then(|| self.events_tx.clone())
    }

    /// Sends without waiting, so a slow or idle receiver never stalls the
    /// batch. Events that do not fit are dropped.
    fn emit(&self, event: UploadEvent) {
        if self.events_rx.is_some() {
            return;
        }
        if let Err(mpsc::error::TrySendError::Full(event)) = self.events_tx.try_send(event) {
            warn!(event = ?event, "event channel full, dropping event");
        }
    }
}

struct Slot {
    file: QueuedFile,
    session: Option<usize>,
    key: Option<String>,
    error: Option<String>,
}

#[derive(Default)]
struct BatchState {
    slots: Vec<Slot>,
    registry: SessionRegistry,
    completed: usize,
    current: Option<usize>,
}

impl BatchState {
    fn slot_mut(&mut self, file_id: &str) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.file.id == file_id)
    }
}

/// Shared view of the running batch.
///
/// Cloneable; every clone refers to the same batch.
#[derive(Clone, Default)]
pub struct BatchHandle {
    state: Arc<Mutex<BatchState>>,
}

impl BatchHandle {
    fn lock(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancels the session registered at `session_index`.
    pub fn cancel(&self, session_index: usize) -> Result<(), UploadError> {
        self.lock().registry.cancel(session_index)
    }

    /// Cancels the upload of the file at `file_index`, if it has started.
    pub fn cancel_file(&self, file_index: usize) -> Result<(), UploadError> {
        let state = self.lock();
        let session = state
            .slots
            .get(file_index)
            .and_then(|slot| slot.session)
            .ok_or(UploadError::NotFound(file_index))?;
        state.registry.cancel(session)
    }

    /// Cancels whichever file is uploading. Returns false when idle.
    pub fn cancel_current(&self) -> bool {
        let state = self.lock();
        let Some(session) = state
            .current
            .and_then(|i| state.slots.get(i))
            .and_then(|slot| slot.session)
        else {
            return false;
        };
        state.registry.cancel(session).is_ok()
    }

    /// Snapshot of the batch's files with their live status and progress.
    pub fn files(&self) -> Vec<QueuedFile> {
        self.lock().slots.iter().map(|s| s.file.clone()).collect()
    }

    /// Number of sessions that reached a terminal state in this batch.
    pub fn completed_process_count(&self) -> usize {
        self.lock().completed
    }

    pub fn progress(&self) -> BatchProgress {
        let state = self.lock();
        let total = state.slots.len();
        let percent = if total == 0 {
            0
        } else {
            let sum: usize = state
                .slots
                .iter()
                .map(|s| s.file.progress_percent as usize)
                .sum();
            (sum / total) as u8
        };
        BatchProgress {
            completed: state.completed,
            total,
            percent,
        }
    }

    /// Aborts any running upload and clears the batch.
    pub fn close(&self) {
        let mut state = self.lock();
        state.registry.clear();
        state.slots.clear();
        state.completed = 0;
        state.current = None;
    }

    fn reset(&self, files: Vec<QueuedFile>) {
        let mut state = self.lock();
        state.registry.clear();
        state.slots = files
            .into_iter()
            .map(|file| Slot {
                file,
                session: None,
                key: None,
                error: None,
            })
            .collect();
        state.completed = 0;
        state.current = None;
    }

    fn next_pending(&self, from: usize) -> Option<usize> {
        self.lock()
            .slots
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, s)| s.file.status != FileStatus::Completed)
            .map(|(i, _)| i)
    }

    fn file(&self, index: usize) -> Option<QueuedFile> {
        self.lock().slots.get(index).map(|s| s.file.clone())
    }

    fn begin(&self, index: usize, session: UploadSession) -> Option<usize> {
        let mut state = self.lock();
        if index >= state.slots.len() {
            return None;
        }
        let session_index = state.registry.register(session);
        let slot = &mut state.slots[index];
        slot.session = Some(session_index);
        slot.key = None;
        slot.error = None;
        slot.file.status = FileStatus::Processing;
        slot.file.progress_percent = 0;
        state.current = Some(index);
        Some(session_index)
    }

    fn record_progress(&self, file_id: &str, percent: u8) {
        if let Some(slot) = self.lock().slot_mut(file_id) {
            slot.file.progress_percent = percent;
        }
    }

    fn record_key(&self, file_id: &str, key: String) {
        if let Some(slot) = self.lock().slot_mut(file_id) {
            slot.key = Some(key);
        }
    }

    fn record_error(&self, file_id: &str, error: String) {
        if let Some(slot) = self.lock().slot_mut(file_id) {
            slot.error = Some(error);
        }
    }

    fn finish(&self, file_id: &str, session_state: SessionState) -> Option<FileOutcome> {
        let mut state = self.lock();
        let total = state.slots.len();
        state.current = None;
        let slot = state.slot_mut(file_id)?;

        slot.file.status = match session_state {
            SessionState::Succeeded => {
                slot.file.progress_percent = 100;
                FileStatus::Completed
            }
            SessionState::Canceled => FileStatus::Canceled,
            _ => FileStatus::Failed,
        };
        let outcome = outcome_of(slot);
        state.completed = (state.completed + 1).min(total);
        Some(outcome)
    }

    fn report(&self) -> BatchReport {
        let state = self.lock();
        BatchReport {
            outcomes: state.slots.iter().map(outcome_of).collect(),
            completed_process_count: state.completed,
        }
    }
}

fn outcome_of(slot: &Slot) -> FileOutcome {
    FileOutcome {
        file_id: slot.file.id.clone(),
        name: slot.file.name.clone(),
        status: slot.file.status,
        progress_percent: slot.file.progress_percent,
        key: slot.key.clone(),
        error: slot.error.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MockApi, queued};
    use mediadrop_notify::{Severity, ToastQueue};

    fn orchestrator(api: Arc<MockApi>) -> (UploadOrchestrator, Arc<Mutex<ToastQueue>>) {
        let toasts = Arc::new(Mutex::new(ToastQueue::new()));
        let orch = UploadOrchestrator::new(
            api,
            OrchestratorConfig { chunk_size: 4 },
            toasts.clone(),
        );
        (orch, toasts)
    }

    fn drain(rx: &mut mpsc::Receiver<UploadEvent>) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn toasts_of(toasts: &Mutex<ToastQueue>) -> Vec<(Severity, String)> {
        toasts
            .lock()
            .unwrap()
            .iter()
            .map(|t| (t.severity, t.message.clone()))
            .collect()
    }

    #[tokio::test]
    async fn uploads_files_in_order() {
        let api = Arc::new(MockApi::new());
        let (mut orch, toasts) = orchestrator(api.clone());
        let mut rx = orch.take_events().unwrap();

        let report = orch
            .run_batch(vec![
                queued("a.jpg", 8),
                queued("b.jpg", 3),
                queued("c.jpg", 10),
            ])
            .await;

        assert_eq!(report.completed_process_count, 3);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(
            report.outcomes.iter().map(|o| o.key.clone()).collect::<Vec<_>>(),
            vec![
                Some("obj-0".to_string()),
                Some("obj-1".to_string()),
                Some("obj-2".to_string())
            ]
        );
        assert!(report.outcomes.iter().all(|o| o.progress_percent == 100));
        assert_eq!(api.part_calls_for(0), 2);
        assert_eq!(api.part_calls_for(1), 1);
        assert_eq!(api.part_calls_for(2), 3);

        // Each file finishes before the next destination is requested.
        let calls = api.calls();
        let pos = |c: Call| calls.iter().position(|x| *x == c).unwrap();
        assert!(pos(Call::Status("task-obj-0".into())) < pos(Call::Destination(1)));
        assert!(pos(Call::Status("task-obj-1".into())) < pos(Call::Destination(2)));

        let events = drain(&mut rx);
        let started: Vec<(usize, String)> = events
            .iter()
            .filter_map(|e| match e {
                UploadEvent::Started { index, name, .. } => Some((*index, name.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            started,
            vec![
                (0, "a.jpg".to_string()),
                (1, "b.jpg".to_string()),
                (2, "c.jpg".to_string())
            ]
        );
        assert_eq!(
            events.last(),
            Some(&UploadEvent::BatchFinished {
                completed: 3,
                total: 3
            })
        );

        assert_eq!(
            toasts_of(&toasts),
            vec![
                (Severity::Info, "a.jpg successfully uploaded.".to_string()),
                (Severity::Info, "b.jpg successfully uploaded.".to_string()),
                (Severity::Info, "c.jpg successfully uploaded.".to_string()),
            ]
        );
        assert_eq!(
            orch.handle().progress(),
            BatchProgress {
                completed: 3,
                total: 3,
                percent: 100
            }
        );
    }

    #[tokio::test]
    async fn failed_file_does_not_stop_batch() {
        let api = Arc::new(MockApi::new().fail_part(0, 2));
        let (orch, toasts) = orchestrator(api.clone());

        let report = orch
            .run_batch(vec![queued("a.jpg", 8), queued("b.jpg", 3)])
            .await;

        assert_eq!(report.outcomes[0].status, FileStatus::Failed);
        assert!(report.outcomes[0].error.as_deref().unwrap().contains("part 2"));
        assert_eq!(report.outcomes[1].status, FileStatus::Completed);
        assert_eq!(report.completed_process_count, 2);
        assert!(!api.calls().contains(&Call::Finalize("obj-0".into())));

        let toasts = toasts_of(&toasts);
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts[0].0, Severity::Error);
        assert_eq!(
            toasts[1],
            (Severity::Info, "b.jpg successfully uploaded.".to_string())
        );
    }

    #[tokio::test]
    async fn canceled_file_advances_to_next() {
        let api = Arc::new(MockApi::new().hang_parts(1));
        let (mut orch, toasts) = orchestrator(api.clone());
        let mut rx = orch.take_events().unwrap();
        let handle = orch.handle();
        let orch = Arc::new(orch);

        let files = vec![queued("a.jpg", 8), queued("b.jpg", 8), queued("c.jpg", 10)];
        let task = tokio::spawn({
            let orch = Arc::clone(&orch);
            async move { orch.run_batch(files).await }
        });

        while api.part_calls_for(1) < 2 {
            tokio::task::yield_now().await;
        }
        handle.cancel(1).unwrap();
        let report = task.await.unwrap();

        let statuses: Vec<FileStatus> = report.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                FileStatus::Completed,
                FileStatus::Canceled,
                FileStatus::Completed
            ]
        );
        assert_eq!(report.completed_process_count, 3);
        assert!(!api.calls().contains(&Call::Finalize("obj-1".into())));
        assert!(!api.calls().contains(&Call::Status("task-obj-1".into())));
        assert!(
            toasts_of(&toasts).contains(&(Severity::Info, "b.jpg uploading canceled.".to_string()))
        );
        assert!(drain(&mut rx).contains(&UploadEvent::Canceled {
            file_id: "id-b.jpg".into(),
            name: "b.jpg".into()
        }));
    }

    #[tokio::test]
    async fn cancel_current_targets_running_file() {
        let api = Arc::new(MockApi::new().hang_parts(0));
        let (orch, _toasts) = orchestrator(api.clone());
        let handle = orch.handle();
        assert!(!handle.cancel_current());

        let orch = Arc::new(orch);
        let task = tokio::spawn({
            let orch = Arc::clone(&orch);
            async move { orch.run_batch(vec![queued("a.jpg", 8)]).await }
        });
        while api.part_calls_for(0) < 2 {
            tokio::task::yield_now().await;
        }
        assert!(handle.cancel_current());

        let report = task.await.unwrap();
        assert_eq!(report.canceled(), 1);
        // Last reported value is kept.
        assert_eq!(report.outcomes[0].progress_percent, 50);
    }

    #[tokio::test]
    async fn completed_files_are_skipped() {
        let api = Arc::new(MockApi::new());
        let (orch, _toasts) = orchestrator(api.clone());
        let mut done = queued("a.jpg", 8);
        done.status = FileStatus::Completed;
        done.progress_percent = 100;

        let report = orch.run_batch(vec![done, queued("b.jpg", 3)]).await;

        assert_eq!(api.calls().iter().filter(|c| matches!(c, Call::Destination(_))).count(), 1);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.completed_process_count, 1);
        assert_eq!(report.outcomes[1].key.as_deref(), Some("obj-0"));
    }

    #[tokio::test]
    async fn empty_file_completes() {
        let api = Arc::new(MockApi::new());
        let (orch, _toasts) = orchestrator(api.clone());

        let report = orch.run_batch(vec![queued("empty.png", 0)]).await;

        assert_eq!(report.succeeded(), 1);
        assert_eq!(api.part_calls(), 1);
    }

    #[tokio::test]
    async fn unread_events_never_stall_batch() {
        let api = Arc::new(MockApi::new());
        let (mut orch, _toasts) = orchestrator(api);
        let mut rx = orch.take_events().unwrap();
        let files: Vec<QueuedFile> = (0..300).map(|i| queued(&format!("{i}.jpg"), 1)).collect();

        let report = tokio::time::timeout(std::time::Duration::from_secs(5), orch.run_batch(files))
            .await
            .expect("batch stalled on a full event channel");

        assert_eq!(report.completed_process_count, 300);
        assert_eq!(report.succeeded(), 300);
        // The channel kept the oldest events and dropped the overflow.
        let events = drain(&mut rx);
        assert_eq!(events.len(), 256);
        assert!(matches!(&events[0], UploadEvent::Started { index: 0, .. }));
    }

    #[tokio::test]
    async fn events_are_silent_until_taken() {
        let api = Arc::new(MockApi::new());
        let (mut orch, _toasts) = orchestrator(api);

        orch.run_batch(vec![queued("a.jpg", 8)]).await;

        let mut rx = orch.take_events().unwrap();
        assert!(rx.try_recv().is_err());
        assert!(orch.take_events().is_none());
    }

    #[test]
    fn cancel_unknown_session() {
        let handle = BatchHandle::default();
        assert!(matches!(handle.cancel(5), Err(UploadError::NotFound(5))));
        assert!(matches!(handle.cancel_file(0), Err(UploadError::NotFound(0))));
        assert_eq!(handle.progress().percent, 0);
    }

    #[tokio::test]
    async fn close_clears_batch() {
        let api = Arc::new(MockApi::new());
        let (orch, _toasts) = orchestrator(api);
        let handle = orch.handle();

        orch.run_batch(vec![queued("a.jpg", 8), queued("b.jpg", 3)])
            .await;
        assert_eq!(handle.files().len(), 2);
        assert_eq!(handle.completed_process_count(), 2);

        handle.close();
        assert!(handle.files().is_empty());
        assert_eq!(handle.completed_process_count(), 0);
        assert!(matches!(handle.cancel(0), Err(UploadError::NotFound(0))));
    }

    #[tokio::test]
    async fn poisoned_batch_state_still_usable() {
        let api = Arc::new(MockApi::new());
        let (orch, _toasts) = orchestrator(api);
        let handle = orch.handle();

        let state = Arc::clone(&handle.state);
        let _ = std::thread::spawn(move || {
            let _guard = state.lock().unwrap();
            panic!("holder panicked");
        })
        .join();
        assert!(handle.state.is_poisoned());

        let report = orch.run_batch(vec![queued("a.jpg", 8)]).await;
        assert_eq!(report.succeeded(), 1);
        assert_eq!(handle.progress().percent, 100);
        handle.close();
        assert!(handle.files().is_empty());
    }
}
