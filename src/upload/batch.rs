use crate::error::TransferError;
use crate::upload::transport::TransferJob;
use crate::upload::types::{
    EntryId, EntrySnapshot, FailedUpload, UploadEntry, UploadEvent, UploadStatus,
    UploadedDocument,
};
use std::collections::HashSet;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Ordered working set of the coordinator.
///
/// Lives behind one mutex; every method is a single serialized mutation and
/// publishes its event before the lock is released, so subscribers observe
/// changes in the order they were applied.
#[derive(Debug)]
pub struct UploadBatch {
    entries: Vec<UploadEntry>,
    events: broadcast::Sender<UploadEvent>,
}

impl UploadBatch {
    pub fn new(events: broadcast::Sender<UploadEvent>) -> Self {
        Self {
            entries: Vec::new(),
            events,
        }
    }

    fn publish(&self, event: UploadEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&UploadEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        self.entries.iter().map(UploadEntry::snapshot).collect()
    }

    pub fn push(&mut self, entry: UploadEntry) -> EntryId {
        let id = entry.id;
        let name = entry.source.name.clone();
        self.entries.push(entry);
        self.publish(UploadEvent::Admitted { id, name });
        id
    }

    /// Removes the entry and cancels its transfer. Unknown ids are ignored.
    pub fn remove(&mut self, id: EntryId) -> Option<UploadEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        let entry = self.entries.remove(index);
        if let Some(token) = &entry.transfer {
            token.cancel();
        }
        self.publish(UploadEvent::Removed { id });
        Some(entry)
    }

    pub fn clear(&mut self) -> usize {
        for entry in &self.entries {
            if let Some(token) = &entry.transfer {
                token.cancel();
            }
        }
        let removed = self.entries.len();
        self.entries.clear();
        self.publish(UploadEvent::Cleared);
        removed
    }

    /// Hands every current entry a fresh cancellation token and restarts its
    /// progress from zero. Only called while the coordinator holds the
    /// in-flight flag, so no other task owns these entries.
    pub fn arm(&mut self) -> Vec<(TransferJob, CancellationToken)> {
        let jobs: Vec<_> = self
            .entries
            .iter_mut()
            .map(|entry| {
                let token = CancellationToken::new();
                if let Some(previous) = entry.transfer.replace(token.clone()) {
                    previous.cancel();
                }
                entry.progress = 0;
                let job = TransferJob {
                    id: entry.id,
                    file: entry.source.clone(),
                };
                (job, token)
            })
            .collect();

        if !jobs.is_empty() {
            self.publish(UploadEvent::BatchStarted { files: jobs.len() });
        }
        jobs
    }

    /// Applies a progress write from the transfer holding `token`.
    ///
    /// Fails with `Cancelled` once the entry is gone or its transfer was
    /// cancelled; values are clamped to 100 and never move backwards.
    pub fn advance(
        &mut self,
        id: EntryId,
        token: &CancellationToken,
        progress: u8,
    ) -> Result<(), TransferError> {
        if token.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(TransferError::Cancelled)?;

        let progress = progress.min(100);
        if progress > entry.progress {
            entry.progress = progress;
            self.publish(UploadEvent::Progress { id, progress });
        }
        Ok(())
    }

    /// Folds the joined task results back into the batch in one step.
    ///
    /// Succeeded entries are dropped together. Failed ones stay, reset to
    /// zero, ready for another attempt. Ids no longer in the batch were
    /// removed by the user and are left out of the outcome.
    pub fn settle(
        &mut self,
        results: Vec<(EntryId, UploadStatus)>,
    ) -> (Vec<UploadedDocument>, Vec<FailedUpload>) {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut done = HashSet::new();

        for (id, status) in results {
            let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
                continue;
            };
            entry.transfer = None;

            match status {
                UploadStatus::Success => {
                    done.insert(id);
                    succeeded.push(UploadedDocument {
                        id,
                        name: entry.source.name.clone(),
                    });
                }
                UploadStatus::Error(error) => {
                    entry.progress = 0;
                    failed.push(FailedUpload {
                        id,
                        name: entry.source.name.clone(),
                        error,
                    });
                }
                UploadStatus::Cancelled => {
                    entry.progress = 0;
                }
            }
        }

        self.entries.retain(|entry| !done.contains(&entry.id));
        self.publish(UploadEvent::BatchSettled {
            succeeded: succeeded.len(),
            failed: failed.len(),
        });

        (succeeded, failed)
    }
}
