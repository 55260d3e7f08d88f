//! Document uploader for the document-search dashboard.
//!
//! The [`upload::UploadCoordinator`] owns the queue of documents waiting to be
//! uploaded. It runs one transfer task per document and reports a single
//! summary through a [`notify::Notifier`]. The [`app`] module puts an egui
//! panel on top of it.

pub mod app;
pub mod config;
pub mod error;
pub mod notify;
pub mod upload;
pub mod utils;

pub use config::UploaderConfig;
pub use error::{ConfigError, TransferError, UploadError};
pub use notify::{Notification, NotificationKind, Notifier, ToastQueue, TracingNotifier};
pub use upload::{
    AdmissionResult, BatchOutcome, EntryId, FileHandle, SimulatedTransport, Transport,
    UploadCoordinator,
};
