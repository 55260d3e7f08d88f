mod state;
mod ui;

use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::notify::{Notification, Notifier, ToastQueue};
use crate::upload::{BatchOutcome, EntryId, FileSource, UploadCoordinator};
use eframe::{egui, App};
use rfd::FileDialog;
pub use state::{BatchProgress, UploaderState};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Extensions offered by the file picker. Legacy `.doc`/`.ppt` are offered
/// too; admission rejects them with a notification.
const PICKER_EXTENSIONS: [&str; 5] = ["pdf", "docx", "doc", "ppt", "pptx"];

pub struct DocumentUploader {
    coordinator: UploadCoordinator,
    toasts: Arc<ToastQueue>,
    file_source: FileSource,
    runtime: Handle,
    state: UploaderState,
}

impl DocumentUploader {
    pub fn new(_cc: &eframe::CreationContext<'_>, runtime: Handle, config: &UploaderConfig) -> Self {
        tracing::info!("Initializing document uploader");
        Self::with_runtime(runtime, config)
    }

    pub fn with_runtime(runtime: Handle, config: &UploaderConfig) -> Self {
        let toasts = Arc::new(ToastQueue::new(Duration::from_secs(config.toast_seconds)));
        let coordinator = UploadCoordinator::simulated(&config.transfer, toasts.clone());
        Self {
            coordinator,
            toasts,
            file_source: FileSource::new(),
            runtime,
            state: UploaderState::default(),
        }
    }

    pub fn coordinator(&self) -> &UploadCoordinator {
        &self.coordinator
    }

    pub fn add_paths(&mut self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        let handles = self.file_source.collect_paths(paths);
        if handles.is_empty() {
            self.toasts.notify(Notification::error(
                "No files found",
                "None of the selected paths could be read.",
            ));
            return;
        }
        self.coordinator.admit_files(handles);
    }

    pub fn pick_files(&mut self) {
        if let Some(paths) = FileDialog::new()
            .add_filter("Documents", &PICKER_EXTENSIONS)
            .pick_files()
        {
            self.add_paths(paths);
        }
    }

    pub fn pick_folder(&mut self) {
        if let Some(folder) = FileDialog::new().pick_folder() {
            tracing::info!(folder = %folder.display(), "Folder selected");
            self.add_paths(vec![folder]);
        }
    }

    pub fn remove_file(&mut self, id: EntryId) {
        self.coordinator.remove_entry(id);
    }

    pub fn reset(&mut self) {
        tracing::info!("Resetting uploader");
        self.coordinator.clear();
        self.state.clear();
    }

    pub fn start_upload(&mut self) {
        if self.state.is_uploading || self.coordinator.is_empty() {
            return;
        }

        let (sender, receiver) = std_mpsc::channel();
        self.state.outcome_receiver = Some(receiver);
        self.state.is_uploading = true;
        self.state.error_message = None;

        let coordinator = self.coordinator.clone();
        self.runtime.spawn(async move {
            let outcome = coordinator.start_batch_upload().await;
            let _ = sender.send(outcome);
        });
    }

    /// Collects a finished batch, if any. Returns true when one arrived.
    pub fn poll_outcome(&mut self) -> bool {
        let Some(receiver) = &self.state.outcome_receiver else {
            return false;
        };

        match receiver.try_recv() {
            Ok(result) => {
                self.finish_upload(result);
                true
            }
            Err(std_mpsc::TryRecvError::Empty) => false,
            Err(std_mpsc::TryRecvError::Disconnected) => {
                self.finish_upload(Err(UploadError::Transfer {
                    name: "batch".to_string(),
                    source: crate::error::TransferError::Aborted(
                        "upload task stopped unexpectedly".to_string(),
                    ),
                }));
                true
            }
        }
    }

    fn finish_upload(&mut self, result: Result<BatchOutcome, UploadError>) {
        self.state.outcome_receiver = None;
        self.state.is_uploading = false;
        match result {
            Ok(outcome) => {
                self.state.error_message = (!outcome.is_fully_successful()).then(|| {
                    "Upload completed with failures. Failed files stay queued for retry."
                        .to_string()
                });
                self.state.last_outcome = Some(outcome);
            }
            Err(e) => {
                tracing::error!(error = %e, "Batch upload did not run");
                self.state.error_message = Some(e.to_string());
            }
        }
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        let (hovering, dropped) = ctx.input(|i| {
            let dropped: Vec<PathBuf> = i
                .raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect();
            (!i.raw.hovered_files.is_empty(), dropped)
        });
        self.state.is_dragging = hovering;
        self.add_paths(dropped);

        if self.poll_outcome() {
            ctx.request_repaint();
        }

        if self.state.is_uploading || !self.toasts.is_empty() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

impl App for DocumentUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
