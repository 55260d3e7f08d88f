use crate::error::UploadError;
use crate::upload::{BatchOutcome, EntrySnapshot, EntryStatus};
use std::sync::mpsc::Receiver;

/// Overall progress shown under the file list.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchProgress {
    Idle,
    Uploading {
        total: usize,
        complete: usize,
        percent: u32,
    },
    Finished {
        succeeded: usize,
        failed: usize,
    },
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::Idle
    }
}

impl BatchProgress {
    pub fn compute(
        entries: &[EntrySnapshot],
        is_uploading: bool,
        last_outcome: Option<&BatchOutcome>,
    ) -> Self {
        let launched: Vec<_> = entries.iter().filter(|entry| entry.launched).collect();
        if is_uploading && !launched.is_empty() {
            let total = launched.len();
            let complete = launched
                .iter()
                .filter(|entry| entry.status == EntryStatus::Complete)
                .count();
            let sum: u32 = launched.iter().map(|entry| u32::from(entry.progress)).sum();
            return Self::Uploading {
                total,
                complete,
                percent: sum / total as u32,
            };
        }

        match last_outcome {
            Some(outcome @ BatchOutcome::Completed { .. }) => Self::Finished {
                succeeded: outcome.succeeded_count(),
                failed: outcome.failed_count(),
            },
            _ => Self::Idle,
        }
    }

    pub fn fraction(&self) -> f32 {
        match self {
            Self::Idle => 0.0,
            Self::Uploading { percent, .. } => *percent as f32 / 100.0,
            Self::Finished { .. } => 1.0,
        }
    }

    pub fn status_text(&self) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Uploading {
                total, complete, ..
            } => format!("Progress: {}/{} files complete", complete, total),
            Self::Finished { succeeded, failed } => format!(
                "Final Status: ✅ Uploaded: {} | ❌ Failed: {}",
                succeeded, failed
            ),
        }
    }
}

#[derive(Default)]
pub struct UploaderState {
    pub is_dragging: bool,
    pub is_uploading: bool,
    pub show_details: bool,
    pub last_outcome: Option<BatchOutcome>,
    pub error_message: Option<String>,
    pub outcome_receiver: Option<Receiver<Result<BatchOutcome, UploadError>>>,
}

impl UploaderState {
    pub fn clear(&mut self) {
        *self = UploaderState::default();
    }

    /// Failed files of the last batch, for the details panel.
    pub fn failure_lines(&self) -> Vec<String> {
        match &self.last_outcome {
            Some(BatchOutcome::Completed { failed, .. }) => failed
                .iter()
                .map(|failure| format!("{} - {}", failure.name, failure.error))
                .collect(),
            _ => Vec::new(),
        }
    }
}
