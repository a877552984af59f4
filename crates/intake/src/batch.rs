//! Batch intake of picked files.

use std::time::Instant;

use bytes::Bytes;
use mediadrop_notify::NotificationSink;
use mediadrop_transfer::QueuedFile;
use tracing::{debug, info, warn};

use crate::IntakeError;
use crate::filter::check_accepted;
use crate::thumbnail::Thumbnailer;

/// A file as picked by the user.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Emitted before each picked file is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeProgress {
    /// Files left, including the one about to be processed.
    pub remaining: usize,
    pub total: usize,
}

impl IntakeProgress {
    /// Human-readable status line.
    pub fn message(&self) -> String {
        format!("Processing left {} out of {}", self.remaining, self.total)
    }
}

/// A picked file that did not make it into the batch.
#[derive(Debug)]
pub struct Rejection {
    pub name: String,
    pub error: IntakeError,
}

/// Outcome of [`process_batch`].
#[derive(Debug)]
pub struct IntakeReport {
    /// Previously queued files followed by the newly accepted ones.
    pub files: Vec<QueuedFile>,
    pub rejected: Vec<Rejection>,
}

/// Processes picked files in order and appends the accepted ones to
/// `existing`.
///
/// Files of an unsupported type, or whose thumbnail cannot be generated,
/// are left out. Each one produces an error notification; the rest of the
/// batch is unaffected.
pub fn process_batch(
    sources: Vec<SourceFile>,
    existing: Vec<QueuedFile>,
    thumbnailer: &dyn Thumbnailer,
    notifier: &dyn NotificationSink,
    mut on_progress: impl FnMut(IntakeProgress),
) -> IntakeReport {
    let started = Instant::now();
    let total = sources.len();
    let mut files = existing;
    let mut rejected = Vec::new();

    for (index, source) in sources.into_iter().enumerate() {
        on_progress(IntakeProgress {
            remaining: total - index,
            total,
        });

        match accept(source, thumbnailer) {
            Ok(file) => {
                debug!(file = %file.name, id = %file.id, bytes = file.byte_size, "file queued");
                files.push(file);
            }
            Err(rejection) => {
                warn!(file = %rejection.name, error = %rejection.error, "file dropped from batch");
                notifier.error(rejection.error.to_string());
                rejected.push(rejection);
            }
        }
    }

    info!(
        accepted = files.len(),
        rejected = rejected.len(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "intake finished"
    );

    IntakeReport { files, rejected }
}

fn accept(source: SourceFile, thumbnailer: &dyn Thumbnailer) -> Result<QueuedFile, Rejection> {
    let SourceFile { name, bytes } = source;

    if let Err(error) = check_accepted(&name) {
        return Err(Rejection { name, error });
    }

    match thumbnailer.thumbnail(&bytes) {
        Ok(thumb) => {
            let id = uuid::Uuid::new_v4().to_string();
            Ok(QueuedFile::new(id, name, bytes).with_thumbnail(thumb))
        }
        Err(source) => Err(Rejection {
            error: IntakeError::Thumbnail {
                name: name.clone(),
                source,
            },
            name,
        }),
    }
}

/// Removes a queued file by position before the upload starts.
pub fn remove(files: &mut Vec<QueuedFile>, index: usize) -> Option<QueuedFile> {
    (index < files.len()).then(|| files.remove(index))
}
