//! Index-addressed store of upload sessions.

use crate::error::UploadError;
use crate::session::UploadSession;

/// Keeps every session started during a batch, addressable by the index
/// returned from [`register`](Self::register).
#[derive(Default, Clone)]
pub struct SessionRegistry {
    sessions: Vec<UploadSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session and returns its index.
    pub fn register(&mut self, session: UploadSession) -> usize {
        self.sessions.push(session);
        self.sessions.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&UploadSession> {
        self.sessions.get(index)
    }

    /// Aborts the session at `index`.
    pub fn cancel(&self, index: usize) -> Result<(), UploadError> {
        let session = self.get(index).ok_or(UploadError::NotFound(index))?;
        session.abort();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions that reached a terminal state.
    pub fn completed_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.state().is_terminal())
            .count()
    }

    /// Aborts every unfinished session and forgets all of them.
    pub fn clear(&mut self) {
        for session in &self.sessions {
            session.abort();
        }
        self.sessions.clear();
    }
}
