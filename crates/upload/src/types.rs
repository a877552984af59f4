//! Data types for sessions and batches.

use mediadrop_protocol::StatusReport;
use mediadrop_transfer::{DEFAULT_CHUNK_SIZE, FileStatus};

/// Settings shared by every session of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Part size in bytes.
    pub chunk_size: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Delivered to a session's success callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub file_id: String,
    pub file_name: String,
    /// Storage object key.
    pub key: String,
    pub task_id: String,
    pub status: StatusReport,
}

impl UploadReceipt {
    /// User-facing success message.
    pub fn message(&self) -> String {
        format!("{} successfully uploaded.", self.file_name)
    }
}

/// Event emitted by the orchestrator while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// A session was registered and started for a file.
    Started {
        /// Registry index, used for cancellation.
        index: usize,
        file_id: String,
        name: String,
    },
    /// Aggregate part progress of the running file (even, below 100).
    Progress { file_id: String, percent: u8 },
    Succeeded {
        file_id: String,
        name: String,
        key: String,
    },
    Failed {
        file_id: String,
        name: String,
        error: String,
    },
    Canceled { file_id: String, name: String },
    /// Every file reached a final state.
    BatchFinished { completed: usize, total: usize },
}

/// Final state of one file in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub file_id: String,
    pub name: String,
    pub status: FileStatus,
    pub progress_percent: u8,
    /// Storage key, on success.
    pub key: Option<String>,
    /// Error message, on failure or cancellation.
    pub error: Option<String>,
}

/// Result of [`UploadOrchestrator::run_batch`](crate::UploadOrchestrator::run_batch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// One entry per file, in batch order.
    pub outcomes: Vec<FileOutcome>,
    pub completed_process_count: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(FileStatus::Completed)
    }

    pub fn failed(&self) -> usize {
        self.count(FileStatus::Failed)
    }

    pub fn canceled(&self) -> usize {
        self.count(FileStatus::Canceled)
    }

    fn count(&self, status: FileStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// UI-facing summary of a running batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Files that reached a final state.
    pub completed: usize,
    pub total: usize,
    /// Floor of the mean per-file progress.
    pub percent: u8,
}

impl BatchProgress {
    /// Header line for a progress panel.
    pub fn summary(&self) -> String {
        format!("{} out of {} uploads complete", self.completed, self.total)
    }
}
