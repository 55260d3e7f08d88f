use crate::error::TransferError;
use std::fmt;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Opaque identifier of one queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A file offered for upload, as handed over by a picker or a drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub size_bytes: u64,
    pub media_type: String,
    pub path: Option<PathBuf>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, size_bytes: u64, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            media_type: media_type.into(),
            path: None,
        }
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_media_type(&self.media_type)
    }
}

/// The document formats the uploader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Pptx,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [Self::Pdf, Self::Docx, Self::Pptx];

    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            MIME_PDF => Some(Self::Pdf),
            MIME_DOCX => Some(Self::Docx),
            MIME_PPTX => Some(Self::Pptx),
            _ => None,
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Self::Pdf => MIME_PDF,
            Self::Docx => MIME_DOCX,
            Self::Pptx => MIME_PPTX,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Pptx => "PPT",
        }
    }
}

/// Derived from progress, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    InProgress,
    Complete,
}

impl EntryStatus {
    pub fn from_progress(progress: u8) -> Self {
        match progress {
            0 => Self::Pending,
            p if p >= 100 => Self::Complete,
            _ => Self::InProgress,
        }
    }
}

/// Bookkeeping for one queued file.
#[derive(Debug)]
pub struct UploadEntry {
    pub id: EntryId,
    pub source: FileHandle,
    pub progress: u8,
    /// Token of the transfer currently driving this entry.
    pub(crate) transfer: Option<CancellationToken>,
}

impl UploadEntry {
    pub fn new(source: FileHandle) -> Self {
        Self {
            id: EntryId::new(),
            source,
            progress: 0,
            transfer: None,
        }
    }

    pub fn status(&self) -> EntryStatus {
        EntryStatus::from_progress(self.progress)
    }

    pub fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            id: self.id,
            name: self.source.name.clone(),
            size_bytes: self.source.size_bytes,
            kind: self.source.kind(),
            progress: self.progress,
            status: self.status(),
            launched: self.transfer.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub id: EntryId,
    pub name: String,
    pub size_bytes: u64,
    pub kind: Option<DocumentKind>,
    pub progress: u8,
    pub status: EntryStatus,
    /// Part of the batch currently being uploaded. Files admitted after the
    /// upload started are not.
    pub launched: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AdmissionResult {
    pub accepted: Vec<EntryId>,
    pub rejected: Vec<FileHandle>,
}

impl AdmissionResult {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub id: EntryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    pub id: EntryId,
    pub name: String,
    pub error: TransferError,
}

/// Result of one `start_batch_upload` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Nothing was queued, so nothing was launched.
    EmptyBatch,
    Completed {
        succeeded: Vec<UploadedDocument>,
        failed: Vec<FailedUpload>,
    },
}

impl BatchOutcome {
    pub fn succeeded_count(&self) -> usize {
        match self {
            Self::EmptyBatch => 0,
            Self::Completed { succeeded, .. } => succeeded.len(),
        }
    }

    pub fn failed_count(&self) -> usize {
        match self {
            Self::EmptyBatch => 0,
            Self::Completed { failed, .. } => failed.len(),
        }
    }

    pub fn is_fully_successful(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Per-file result of a settled transfer task.
#[derive(Debug, Clone)]
pub enum UploadStatus {
    Success,
    Error(TransferError),
    Cancelled,
}

/// Change notifications published by the coordinator, in mutation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Admitted { id: EntryId, name: String },
    Progress { id: EntryId, progress: u8 },
    Removed { id: EntryId },
    Cleared,
    BatchStarted { files: usize },
    BatchSettled { succeeded: usize, failed: usize },
}
