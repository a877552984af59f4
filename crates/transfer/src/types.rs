use bytes::Bytes;

/// One byte range of a multipart upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// 1-based part number.
    pub number: u32,
    /// First byte offset (inclusive).
    pub start: u64,
    /// End byte offset (exclusive).
    pub end: u64,
}

impl PartRange {
    /// Length of the range in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether this is a zero-length part.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns this part's bytes from the whole file without copying.
    pub fn slice(&self, file: &Bytes) -> Bytes {
        let len = file.len();
        let start = usize::try_from(self.start).unwrap_or(len).min(len);
        let end = usize::try_from(self.end).unwrap_or(len).min(len);
        file.slice(start..end)
    }
}

/// Completion of a single part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartProgress {
    pub file_name: String,
    /// 1-based, unique within the file.
    pub part_number: u32,
    pub total_parts: u32,
    /// This part's own completion, 0-100.
    pub percentage: u8,
}

/// Upload state of a queued file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileStatus {
    /// Accepted, not started yet.
    #[default]
    Queued,
    /// Its upload session is running.
    Processing,
    Completed,
    Failed,
    Canceled,
}

impl FileStatus {
    /// Whether the file's upload has reached a final outcome.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FileStatus::Completed | FileStatus::Failed | FileStatus::Canceled
        )
    }
}

/// A file accepted for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedFile {
    /// Unique id assigned at intake.
    pub id: String,
    pub name: String,
    /// Text after the last `.` of `name` (empty if there is none).
    pub extension: String,
    pub byte_size: u64,
    /// Downscaled preview; empty if it could not be generated.
    pub thumbnail: Bytes,
    /// Source bytes, read-only for the lifetime of the upload.
    pub original_bytes: Bytes,
    /// 0-100, only moves forward while processing.
    pub progress_percent: u8,
    pub status: FileStatus,
}

impl QueuedFile {
    /// Creates a queued file with no thumbnail.
    pub fn new(id: impl Into<String>, name: impl Into<String>, bytes: Bytes) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            extension: extension_of(&name),
            byte_size: bytes.len() as u64,
            name,
            thumbnail: Bytes::new(),
            original_bytes: bytes,
            progress_percent: 0,
            status: FileStatus::Queued,
        }
    }

    /// Attaches a generated thumbnail.
    pub fn with_thumbnail(mut self, thumbnail: impl Into<Bytes>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }

    pub fn is_processing(&self) -> bool {
        self.status == FileStatus::Processing
    }

    pub fn is_completed(&self) -> bool {
        self.status == FileStatus::Completed
    }

    pub fn is_canceled(&self) -> bool {
        self.status == FileStatus::Canceled
    }

    pub fn is_failed(&self) -> bool {
        self.status == FileStatus::Failed
    }
}

fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_string(),
        None => String::new(),
    }
}
