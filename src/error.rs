//! Error types for the uploader.
//!
//! Per-file transfer failures are kept apart from coordinator errors: a
//! `TransferError` only ever ends up inside a `BatchOutcome`, while an
//! `UploadError` is what the coordinator API itself can return.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the upload coordinator and its collaborators.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The declared media type is not PDF, DOCX or PPTX.
    #[error("{name}: unsupported media type '{media_type}'")]
    InvalidMediaType { name: String, media_type: String },

    /// A batch upload was requested with nothing queued.
    #[error("no documents queued for upload")]
    EmptyBatchSubmission,

    /// A batch upload is already running over the current entries.
    #[error("an upload is already in progress")]
    ConcurrentSubmissionConflict,

    /// A single file failed to transfer.
    #[error("failed to upload {name}: {source}")]
    Transfer {
        name: String,
        #[source]
        source: TransferError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failure of one file's transfer task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The transfer stopped before finishing. After a removal or clear the
    /// coordinator drops it silently; otherwise it counts as a failure.
    #[error("transfer cancelled")]
    Cancelled,

    #[error("transfer interrupted: {0}")]
    Interrupted(String),

    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// The task panicked or was aborted before it could report back.
    #[error("transfer task aborted: {0}")]
    Aborted(String),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, UploadError>;
