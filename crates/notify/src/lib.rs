//! User-facing notifications.
//!
//! Upload and intake code reports outcomes through [`NotificationSink`];
//! the front end decides how to show them. [`ToastQueue`] is the
//! in-memory implementation used by the uploader binary.

mod toast;

use std::sync::{Arc, Mutex, PoisonError};

pub use toast::{Toast, ToastQueue};

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Receives user-facing messages.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, severity: Severity, message: String);

    fn info(&self, message: String) {
        self.notify(Severity::Info, message);
    }

    fn error(&self, message: String) {
        self.notify(Severity::Error, message);
    }
}

/// A toast queue shared between the producer and the front end.
pub type SharedToasts = Arc<Mutex<ToastQueue>>;

impl NotificationSink for Mutex<ToastQueue> {
    fn notify(&self, severity: Severity, message: String) {
        tracing::debug!(?severity, %message, "notification queued");
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(severity, message);
    }
}
