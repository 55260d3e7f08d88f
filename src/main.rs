use anyhow::{anyhow, Result};
use docsearch_uploader::app::DocumentUploader;
use docsearch_uploader::UploaderConfig;
use eframe::CreationContext;
use tracing_subscriber::EnvFilter;

fn setup_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

fn main() -> Result<()> {
    let config = UploaderConfig::load()?;
    setup_logging(&config.log_filter);

    let runtime = tokio::runtime::Runtime::new()?;
    let handle = runtime.handle().clone();

    tracing::info!(
        step = config.transfer.progress_step,
        tick_ms = config.transfer.tick_interval_ms,
        "Starting document uploader"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([400.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Document Uploader",
        options,
        Box::new(move |cc: &CreationContext| {
            Box::new(DocumentUploader::new(cc, handle, &config))
        }),
    )
    .map_err(|e| anyhow!("failed to open window: {}", e))?;

    runtime.shutdown_background();
    Ok(())
}
