use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::upload::batch::UploadBatch;
use crate::upload::types::{EntryId, FileHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// One file handed to a transport.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub id: EntryId,
    pub file: FileHandle,
}

/// Write handle for a single entry's progress.
///
/// Every write re-checks, under the batch lock, that the entry still exists
/// and its transfer was not cancelled.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    id: EntryId,
    token: CancellationToken,
    batch: Arc<Mutex<UploadBatch>>,
}

impl ProgressReporter {
    pub(crate) fn new(
        id: EntryId,
        token: CancellationToken,
        batch: Arc<Mutex<UploadBatch>>,
    ) -> Self {
        Self { id, token, batch }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_live(&self) -> bool {
        !self.token.is_cancelled() && self.batch.lock().get(self.id).is_some()
    }

    /// Records `progress` percent. Returns `Cancelled` once the entry is gone,
    /// which the transport should propagate with `?`.
    pub fn report(&self, progress: u8) -> Result<(), TransferError> {
        self.batch.lock().advance(self.id, &self.token, progress)
    }
}

/// Moves one file's bytes somewhere and reports how far it got.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn transfer(
        &self,
        job: &TransferJob,
        progress: &ProgressReporter,
    ) -> Result<(), TransferError>;
}

/// Stand-in transport that advances by a fixed step on a fixed cadence and
/// never fails.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    step: u8,
    cadence: Duration,
}

impl SimulatedTransport {
    pub fn new(step: u8, cadence: Duration) -> Self {
        Self {
            step: step.clamp(1, 100),
            cadence,
        }
    }

    pub fn from_config(config: &TransferConfig) -> Self {
        Self::new(config.progress_step, config.tick_interval())
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::from_config(&TransferConfig::default())
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn transfer(
        &self,
        job: &TransferJob,
        progress: &ProgressReporter,
    ) -> Result<(), TransferError> {
        let mut ticker = time::interval_at(Instant::now() + self.cadence, self.cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut percent: u8 = 0;
        while percent < 100 {
            ticker.tick().await;
            percent = percent.saturating_add(self.step).min(100);
            progress.report(percent)?;
            tracing::trace!(entry_id = %job.id, name = %job.file.name, progress = percent, "Chunk sent");
        }
        Ok(())
    }
}
