use crate::Severity;

/// Default toast display duration in milliseconds.
const DEFAULT_DURATION_MS: u64 = 4000;

/// Error toast display duration in milliseconds (longer for visibility).
const ERROR_DURATION_MS: u64 = 6000;

/// A queued toast notification.
#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub duration_ms: u64,
}

/// In-memory toast queue with monotonic ID assignment.
///
/// Timer-based dismissal belongs to whatever renders the toasts.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl ToastQueue {
    /// Create an empty toast queue.
    pub fn new() -> Self {
        Self {
            toasts: Vec::new(),
            next_id: 0,
        }
    }

    /// Push a toast with the duration for its severity.
    /// Returns the assigned toast ID.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) -> u64 {
        let duration_ms = match severity {
            Severity::Info => DEFAULT_DURATION_MS,
            Severity::Error => ERROR_DURATION_MS,
        };
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push(Toast {
            id,
            severity,
            message: message.into(),
            duration_ms,
        });
        id
    }

    /// Push an info toast (4s).
    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.push(Severity::Info, message)
    }

    /// Push an error toast (6s).
    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(Severity::Error, message)
    }

    /// Iterate over toasts oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    /// Removes and returns every queued toast, oldest first.
    pub fn drain(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new()
    }
}
