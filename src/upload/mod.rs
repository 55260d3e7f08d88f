mod batch;
mod coordinator;
mod file_source;
mod transport;
mod types;

pub use coordinator::UploadCoordinator;
pub use file_source::FileSource;
pub use transport::{ProgressReporter, SimulatedTransport, TransferJob, Transport};
pub use types::{
    AdmissionResult, BatchOutcome, DocumentKind, EntryId, EntrySnapshot, EntryStatus,
    FailedUpload, FileHandle, UploadEntry, UploadEvent, UploadStatus, UploadedDocument,
    MIME_DOCX, MIME_PDF, MIME_PPTX,
};
