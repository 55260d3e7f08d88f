use crate::config::TransferConfig;
use crate::error::{Result, TransferError, UploadError};
use crate::notify::{Notification, Notifier};
use crate::upload::batch::UploadBatch;
use crate::upload::transport::{ProgressReporter, SimulatedTransport, TransferJob, Transport};
use crate::upload::types::{
    AdmissionResult, BatchOutcome, DocumentKind, EntryId, EntrySnapshot, FailedUpload,
    FileHandle, UploadEntry, UploadEvent, UploadStatus, UploadedDocument,
};
use derivative::Derivative;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const EVENT_CAPACITY: usize = 256;

/// Owns the upload batch and drives one transfer task per entry.
///
/// Cheap to clone; clones share the same batch.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct UploadCoordinator {
    batch: Arc<Mutex<UploadBatch>>,
    events: broadcast::Sender<UploadEvent>,
    uploading: Arc<AtomicBool>,
    #[derivative(Debug = "ignore")]
    transport: Arc<dyn Transport>,
    #[derivative(Debug = "ignore")]
    notifier: Arc<dyn Notifier>,
}

/// Holds the in-flight flag for one `start_batch_upload` call.
///
/// If the call is dropped before it settles, the launched transfers are
/// cancelled so a later call cannot race them.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    tokens: Vec<CancellationToken>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        for token in &self.tokens {
            token.cancel();
        }
        self.flag.store(false, Ordering::Release);
    }
}

impl UploadCoordinator {
    pub fn new(transport: Arc<dyn Transport>, notifier: Arc<dyn Notifier>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            batch: Arc::new(Mutex::new(UploadBatch::new(events.clone()))),
            events,
            uploading: Arc::new(AtomicBool::new(false)),
            transport,
            notifier,
        }
    }

    /// Coordinator backed by the simulated transport.
    pub fn simulated(config: &TransferConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(Arc::new(SimulatedTransport::from_config(config)), notifier)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        self.batch.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.batch.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.lock().is_empty()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::Acquire)
    }

    /// Queues every candidate with an accepted media type, in arrival order.
    ///
    /// Rejected candidates never enter the batch; a single error notification
    /// covers all of them.
    pub fn admit_files<I>(&self, candidates: I) -> AdmissionResult
    where
        I: IntoIterator<Item = FileHandle>,
    {
        let mut result = AdmissionResult::default();
        {
            let mut batch = self.batch.lock();
            for candidate in candidates {
                if candidate.kind().is_some() {
                    result.accepted.push(batch.push(UploadEntry::new(candidate)));
                } else {
                    let err = UploadError::InvalidMediaType {
                        name: candidate.name.clone(),
                        media_type: candidate.media_type.clone(),
                    };
                    tracing::debug!(error = %err, "Rejected file");
                    result.rejected.push(candidate);
                }
            }
        }

        tracing::info!(
            accepted = result.accepted_count(),
            rejected = result.rejected_count(),
            "Files admitted"
        );

        if !result.rejected.is_empty() {
            let [pdf, docx, pptx] = DocumentKind::ALL.map(DocumentKind::label);
            self.notifier.notify(Notification::error(
                "Invalid file type",
                format!("Only {pdf}, {docx}, and {pptx} files are supported."),
            ));
        }

        result
    }

    /// Drops an entry and stops its transfer. Unknown ids are ignored.
    pub fn remove_entry(&self, id: EntryId) {
        match self.batch.lock().remove(id) {
            Some(entry) => {
                tracing::debug!(entry_id = %id, name = %entry.source.name, "Entry removed")
            }
            None => tracing::trace!(entry_id = %id, "Remove of unknown entry ignored"),
        }
    }

    /// Drops every entry at once, cancelling any running transfers.
    pub fn clear(&self) {
        let removed = self.batch.lock().clear();
        tracing::debug!(removed, "Batch cleared");
    }

    /// Uploads every queued entry concurrently and waits for all of them.
    ///
    /// Succeeded entries leave the batch together; failed ones stay for a
    /// retry. Returns `ConcurrentSubmissionConflict` while a previous call is
    /// still running.
    pub async fn start_batch_upload(&self) -> Result<BatchOutcome> {
        if self
            .uploading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Upload requested while another is in flight");
            return Err(UploadError::ConcurrentSubmissionConflict);
        }
        let mut in_flight = InFlight {
            flag: &self.uploading,
            tokens: Vec::new(),
        };

        let jobs = self.batch.lock().arm();
        if jobs.is_empty() {
            tracing::debug!(reason = %UploadError::EmptyBatchSubmission, "Nothing to upload");
            return Ok(BatchOutcome::EmptyBatch);
        }

        tracing::info!(files = jobs.len(), "Starting batch upload");

        let mut ids = Vec::with_capacity(jobs.len());
        let mut handles = Vec::with_capacity(jobs.len());
        for (job, token) in jobs {
            ids.push(job.id);
            in_flight.tokens.push(token.clone());
            let reporter = ProgressReporter::new(job.id, token, self.batch.clone());
            handles.push(tokio::spawn(run_transfer(
                self.transport.clone(),
                job,
                reporter,
            )));
        }

        let settled = join_all(handles).await;
        let results = ids
            .into_iter()
            .zip(settled)
            .map(|(id, joined)| {
                let status = joined.unwrap_or_else(|e| {
                    tracing::error!(entry_id = %id, error = %e, "Transfer task died");
                    UploadStatus::Error(TransferError::Aborted(e.to_string()))
                });
                (id, status)
            })
            .collect();

        let (succeeded, failed) = self.batch.lock().settle(results);
        in_flight.tokens.clear();
        drop(in_flight);

        self.report_outcome(&succeeded, &failed);
        Ok(BatchOutcome::Completed { succeeded, failed })
    }

    fn report_outcome(&self, succeeded: &[UploadedDocument], failed: &[FailedUpload]) {
        for failure in failed {
            let err = UploadError::Transfer {
                name: failure.name.clone(),
                source: failure.error.clone(),
            };
            tracing::warn!(entry_id = %failure.id, error = %err, "File failed to upload");
        }

        tracing::info!(
            succeeded = succeeded.len(),
            failed = failed.len(),
            "Batch upload settled"
        );

        if failed.is_empty() {
            if succeeded.is_empty() {
                // Everything was removed mid-flight; nothing to tell the user.
                return;
            }
            self.notifier.notify(Notification::success(
                "Upload complete",
                format!(
                    "Successfully uploaded {} document{}.",
                    succeeded.len(),
                    plural(succeeded.len())
                ),
            ));
        } else {
            self.notifier.notify(Notification::error(
                "Upload failed",
                format!(
                    "{} of {} document{} could not be uploaded and remain queued for retry.",
                    failed.len(),
                    succeeded.len() + failed.len(),
                    plural(succeeded.len() + failed.len())
                ),
            ));
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

async fn run_transfer(
    transport: Arc<dyn Transport>,
    job: TransferJob,
    reporter: ProgressReporter,
) -> UploadStatus {
    let token = reporter.token().clone();
    let result = tokio::select! {
        biased;
        _ = token.cancelled() => Err(TransferError::Cancelled),
        result = transport.transfer(&job, &reporter) => result,
    };

    // A transport may finish without reporting the last step.
    match result.and_then(|()| reporter.report(100)) {
        Ok(()) => UploadStatus::Success,
        // Only a removal or clear cancels the token. A transport that gives
        // up on its own still counts as a failure of a queued file.
        Err(TransferError::Cancelled) if token.is_cancelled() => {
            tracing::debug!(entry_id = %job.id, name = %job.file.name, "Transfer cancelled");
            UploadStatus::Cancelled
        }
        Err(e) => UploadStatus::Error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;
    use crate::upload::types::{EntryStatus, MIME_DOCX, MIME_PDF, MIME_PPTX};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        fn take(&self) -> Vec<Notification> {
            std::mem::take(&mut *self.seen.lock())
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.seen.lock().push(notification);
        }
    }

    /// Fails the named file at 30% while `failing` is set.
    struct FlakyTransport {
        name: String,
        failing: AtomicBool,
        inner: SimulatedTransport,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn transfer(
            &self,
            job: &TransferJob,
            progress: &ProgressReporter,
        ) -> std::result::Result<(), TransferError> {
            if job.file.name == self.name && self.failing.load(Ordering::SeqCst) {
                progress.report(30)?;
                return Err(TransferError::Interrupted("connection reset".to_string()));
            }
            self.inner.transfer(job, progress).await
        }
    }

    /// Gives up at 30% with `Cancelled` although nothing cancelled it.
    struct GivesUpTransport;

    #[async_trait]
    impl Transport for GivesUpTransport {
        async fn transfer(
            &self,
            _job: &TransferJob,
            progress: &ProgressReporter,
        ) -> std::result::Result<(), TransferError> {
            progress.report(30)?;
            Err(TransferError::Cancelled)
        }
    }

    fn fast() -> SimulatedTransport {
        SimulatedTransport::new(10, Duration::from_millis(3))
    }

    fn setup(transport: impl Transport + 'static) -> (UploadCoordinator, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = UploadCoordinator::new(Arc::new(transport), notifier.clone());
        (coordinator, notifier)
    }

    fn pdf(name: &str) -> FileHandle {
        FileHandle::new(name, 1024 * 1024, MIME_PDF)
    }

    fn drain(rx: &mut broadcast::Receiver<UploadEvent>) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn wait_for_progress(
        rx: &mut broadcast::Receiver<UploadEvent>,
        target: Option<EntryId>,
        at_least: u8,
    ) {
        loop {
            if let UploadEvent::Progress { id, progress } = rx.recv().await.unwrap() {
                if target.map_or(true, |t| t == id) && progress >= at_least {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_admission_partitions_by_media_type() {
        let (coordinator, notifier) = setup(fast());

        let result = coordinator.admit_files(vec![
            FileHandle::new("report.pdf", 10, MIME_PDF),
            FileHandle::new("logo.png", 10, "image/png"),
            FileHandle::new("notes.docx", 10, MIME_DOCX),
            FileHandle::new("deck.pptx", 10, MIME_PPTX),
            FileHandle::new("legacy.ppt", 10, "application/vnd.ms-powerpoint"),
        ]);

        assert_eq!(result.accepted_count() + result.rejected_count(), 5);
        assert_eq!(result.accepted_count(), 3);
        let rejected: Vec<_> = result.rejected.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(rejected, vec!["logo.png", "legacy.ppt"]);

        let names: Vec<_> = coordinator.snapshot().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["report.pdf", "notes.docx", "deck.pptx"]);
        assert!(coordinator
            .snapshot()
            .iter()
            .all(|s| s.kind.is_some() && s.status == EntryStatus::Pending));

        let seen = notifier.take();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn test_report_and_logo_example() {
        let (coordinator, notifier) = setup(fast());

        let result = coordinator.admit_files(vec![
            FileHandle::new("report.pdf", 2048, "application/pdf"),
            FileHandle::new("logo.png", 512, "image/png"),
        ]);

        assert_eq!(result.accepted.len(), 1);
        assert_eq!(coordinator.snapshot()[0].name, "report.pdf");
        assert_eq!(result.rejected[0].name, "logo.png");
        assert_eq!(
            notifier.take(),
            vec![Notification::error(
                "Invalid file type",
                "Only PDF, DOCX, and PPT files are supported."
            )]
        );
    }

    #[tokio::test]
    async fn test_all_accepted_sends_no_notification() {
        let (coordinator, notifier) = setup(fast());
        coordinator.admit_files(vec![pdf("a.pdf")]);
        assert!(notifier.take().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let (coordinator, notifier) = setup(fast());
        let mut events = coordinator.subscribe();

        let outcome = coordinator.start_batch_upload().await.unwrap();

        assert_eq!(outcome, BatchOutcome::EmptyBatch);
        assert!(!coordinator.is_uploading());
        assert!(drain(&mut events).is_empty());
        assert!(notifier.take().is_empty());
    }

    #[tokio::test]
    async fn test_three_files_upload_and_clear_batch() {
        let (coordinator, notifier) = setup(fast());
        let admitted = coordinator.admit_files(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")]);
        let mut events = coordinator.subscribe();

        let outcome = coordinator.start_batch_upload().await.unwrap();

        assert_eq!(outcome.succeeded_count(), 3);
        assert_eq!(outcome.failed_count(), 0);
        assert!(coordinator.is_empty());
        assert!(!coordinator.is_uploading());

        let mut per_entry: HashMap<EntryId, Vec<u8>> = HashMap::new();
        for event in drain(&mut events) {
            if let UploadEvent::Progress { id, progress } = event {
                per_entry.entry(id).or_default().push(progress);
            }
        }
        for id in &admitted.accepted {
            assert_eq!(
                per_entry[id],
                vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]
            );
        }

        assert_eq!(
            notifier.take(),
            vec![Notification::success(
                "Upload complete",
                "Successfully uploaded 3 documents."
            )]
        );
    }

    #[tokio::test]
    async fn test_second_start_while_in_flight_is_rejected() {
        let (coordinator, _notifier) = setup(fast());
        coordinator.admit_files(vec![pdf("a.pdf"), pdf("b.pdf")]);
        let mut events = coordinator.subscribe();

        let mut first = Box::pin(coordinator.start_batch_upload());
        assert!(futures::poll!(&mut first).is_pending());
        assert!(coordinator.is_uploading());

        let second = coordinator.start_batch_upload().await;
        assert!(matches!(
            second,
            Err(UploadError::ConcurrentSubmissionConflict)
        ));

        let outcome = first.await.unwrap();
        assert_eq!(outcome.succeeded_count(), 2);

        let mut per_entry: HashMap<EntryId, Vec<u8>> = HashMap::new();
        for event in drain(&mut events) {
            if let UploadEvent::Progress { id, progress } = event {
                per_entry.entry(id).or_default().push(progress);
            }
        }
        assert_eq!(per_entry.len(), 2);
        for steps in per_entry.values() {
            assert_eq!(steps.len(), 10);
            assert!(steps.windows(2).all(|w| w[0] < w[1]));
            assert!(steps.iter().all(|p| *p <= 100));
        }
    }

    #[tokio::test]
    async fn test_remove_mid_transfer_stops_writes() {
        let (coordinator, notifier) = setup(fast());
        let admitted = coordinator.admit_files(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")]);
        let target = admitted.accepted[1];
        let mut events = coordinator.subscribe();

        let upload = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.start_batch_upload().await }
        });

        wait_for_progress(&mut events, Some(target), 20).await;
        let progress = coordinator
            .snapshot()
            .into_iter()
            .find(|s| s.id == target)
            .unwrap()
            .progress;
        assert!(progress > 0 && progress < 100);

        coordinator.remove_entry(target);
        coordinator.remove_entry(target);

        let outcome = upload.await.unwrap().unwrap();
        match &outcome {
            BatchOutcome::Completed { succeeded, failed } => {
                assert!(succeeded.iter().all(|doc| doc.id != target));
                assert!(failed.is_empty());
                assert_eq!(succeeded.len(), 2);
            }
            BatchOutcome::EmptyBatch => panic!("batch was not empty"),
        }
        assert!(coordinator.is_empty());

        let mut removed = false;
        for event in drain(&mut events) {
            match event {
                UploadEvent::Removed { id } if id == target => removed = true,
                UploadEvent::Progress { id, .. } if id == target => {
                    assert!(!removed, "progress written after removal")
                }
                _ => {}
            }
        }
        assert!(removed);
        assert_eq!(notifier.take().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_file_stays_queued_for_retry() {
        let (coordinator, notifier) = setup(FlakyTransport {
            name: "broken.pdf".to_string(),
            failing: AtomicBool::new(true),
            inner: fast(),
        });
        coordinator.admit_files(vec![pdf("a.pdf"), pdf("broken.pdf"), pdf("c.pdf")]);

        let outcome = coordinator.start_batch_upload().await.unwrap();

        assert_eq!(outcome.succeeded_count(), 2);
        match &outcome {
            BatchOutcome::Completed { failed, .. } => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].name, "broken.pdf");
                assert_eq!(
                    failed[0].error,
                    TransferError::Interrupted("connection reset".to_string())
                );
            }
            BatchOutcome::EmptyBatch => panic!("batch was not empty"),
        }

        let remaining = coordinator.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "broken.pdf");
        assert_eq!(remaining[0].progress, 0);

        let seen = notifier.take();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, NotificationKind::Error);
        assert_eq!(seen[0].title, "Upload failed");
    }

    #[tokio::test]
    async fn test_transport_giving_up_is_reported_as_failure() {
        let (coordinator, notifier) = setup(GivesUpTransport);
        let admitted = coordinator.admit_files(vec![pdf("a.pdf")]);

        let outcome = coordinator.start_batch_upload().await.unwrap();

        assert_eq!(
            outcome,
            BatchOutcome::Completed {
                succeeded: Vec::new(),
                failed: vec![FailedUpload {
                    id: admitted.accepted[0],
                    name: "a.pdf".to_string(),
                    error: TransferError::Cancelled,
                }],
            }
        );

        let remaining = coordinator.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].progress, 0);

        let seen = notifier.take();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].title, "Upload failed");
    }

    #[tokio::test]
    async fn test_retry_after_failure_succeeds() {
        let transport = Arc::new(FlakyTransport {
            name: "broken.pdf".to_string(),
            failing: AtomicBool::new(true),
            inner: fast(),
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = UploadCoordinator::new(transport.clone(), notifier.clone());
        coordinator.admit_files(vec![pdf("broken.pdf")]);

        let first = coordinator.start_batch_upload().await.unwrap();
        assert_eq!(first.failed_count(), 1);
        assert_eq!(coordinator.len(), 1);

        transport.failing.store(false, Ordering::SeqCst);
        let second = coordinator.start_batch_upload().await.unwrap();
        assert_eq!(second.succeeded_count(), 1);
        assert!(coordinator.is_empty());

        let titles: Vec<_> = notifier.take().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["Upload failed", "Upload complete"]);
    }

    #[tokio::test]
    async fn test_clear_mid_transfer_cancels_everything() {
        let (coordinator, notifier) = setup(fast());
        coordinator.admit_files(vec![pdf("a.pdf"), pdf("b.pdf")]);
        let mut events = coordinator.subscribe();

        let upload = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.start_batch_upload().await }
        });

        wait_for_progress(&mut events, None, 10).await;
        coordinator.clear();

        let outcome = upload.await.unwrap().unwrap();
        assert_eq!(outcome.succeeded_count(), 0);
        assert_eq!(outcome.failed_count(), 0);
        assert!(coordinator.is_empty());
        assert!(notifier.take().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_upload_releases_flag_and_cancels() {
        let (coordinator, _notifier) = setup(fast());
        coordinator.admit_files(vec![pdf("a.pdf")]);

        {
            let mut pending = Box::pin(coordinator.start_batch_upload());
            assert!(futures::poll!(&mut pending).is_pending());
            assert!(coordinator.is_uploading());
        }
        assert!(!coordinator.is_uploading());

        let outcome = coordinator.start_batch_upload().await.unwrap();
        assert_eq!(outcome.succeeded_count(), 1);
        assert!(coordinator.is_empty());
    }

    #[tokio::test]
    async fn test_files_admitted_during_upload_wait_for_next_batch() {
        let (coordinator, _notifier) = setup(fast());
        coordinator.admit_files(vec![pdf("first.pdf")]);

        let mut upload = Box::pin(coordinator.start_batch_upload());
        assert!(futures::poll!(&mut upload).is_pending());
        coordinator.admit_files(vec![pdf("late.pdf")]);
        let launched: Vec<_> = coordinator.snapshot().iter().map(|s| s.launched).collect();
        assert_eq!(launched, vec![true, false]);

        let outcome = upload.await.unwrap();
        assert_eq!(outcome.succeeded_count(), 1);

        let remaining = coordinator.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "late.pdf");
        assert_eq!(remaining[0].status, EntryStatus::Pending);
    }
}
