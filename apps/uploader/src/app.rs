//! Wires intake, notifications and the upload orchestrator together.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use bytes::Bytes;
use mediadrop_intake::{IntakeProgress, SourceFile, process_batch};
use mediadrop_notify::{NotificationSink, Severity, SharedToasts, ToastQueue};
use mediadrop_transfer::FileStatus;
use mediadrop_upload::{BatchReport, HttpStorageApi, UploadEvent, UploadOrchestrator};

use crate::config::Config;

/// Uploads `paths` and returns once every file is final.
///
/// Fails if any upload failed.
pub async fn run(config: Config, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let toasts: SharedToasts = Arc::new(Mutex::new(ToastQueue::new()));

    // -- Intake --
    let sources = read_sources(&paths, &*toasts).await;
    let thumbnailer = config.thumbnailer();
    let notifier = Arc::clone(&toasts);
    let intake = tokio::task::spawn_blocking(move || {
        process_batch(
            sources,
            Vec::new(),
            &thumbnailer,
            &*notifier,
            |progress: IntakeProgress| tracing::info!("{}", progress.message()),
        )
    })
    .await
    .context("intake task failed")?;
    flush_toasts(&toasts);

    if intake.files.is_empty() {
        tracing::warn!("no files left to upload");
        return Ok(());
    }

    // -- Upload --
    let api = HttpStorageApi::new(config.api_config()).context("invalid API configuration")?;
    let mut orchestrator = UploadOrchestrator::new(
        Arc::new(api),
        config.orchestrator_config(),
        Arc::clone(&toasts) as Arc<dyn NotificationSink>,
    );
    let mut events = orchestrator
        .take_events()
        .context("event receiver already taken")?;
    let handle = orchestrator.handle();

    let logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
            if matches!(event, UploadEvent::BatchFinished { .. }) {
                break;
            }
        }
    });

    let cancel_handle = handle.clone();
    let ctrl_c = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if cancel_handle.cancel_current() {
                tracing::info!("cancel requested for the running upload");
            }
        }
    });

    let report = orchestrator.run_batch(intake.files).await;
    ctrl_c.abort();
    let summary = handle.progress().summary();
    // Closing drops the sessions' event senders, so the logger ends even
    // when the final event did not fit in the channel.
    handle.close();
    drop(orchestrator);
    let _ = logger.await;
    flush_toasts(&toasts);

    tracing::info!("{summary}");
    log_report(&report);

    let failed = report.failed();
    anyhow::ensure!(
        failed == 0,
        "{failed} of {} uploads failed",
        report.outcomes.len()
    );
    Ok(())
}

/// Reads every path; unreadable files are reported and skipped.
async fn read_sources(paths: &[PathBuf], notifier: &dyn NotificationSink) -> Vec<SourceFile> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        match tokio::fs::read(path).await {
            Ok(bytes) => sources.push(SourceFile::new(display_name(path), Bytes::from(bytes))),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read file");
                notifier.error(format!("Cannot read {}: {e}", path.display()));
            }
        }
    }
    sources
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Drains pending toasts into the log.
fn flush_toasts(toasts: &SharedToasts) {
    let drained = toasts.lock().unwrap_or_else(PoisonError::into_inner).drain();
    for toast in drained {
        match toast.severity {
            Severity::Info => tracing::info!("{}", toast.message),
            Severity::Error => tracing::error!("{}", toast.message),
        }
    }
}

fn log_event(event: &UploadEvent) {
    match event {
        UploadEvent::Started { index, name, .. } => {
            tracing::info!(session = index, file = %name, "upload started");
        }
        UploadEvent::Progress { file_id, percent } => {
            tracing::debug!(file_id = %file_id, percent, "upload progress");
        }
        UploadEvent::Succeeded { name, key, .. } => {
            tracing::debug!(file = %name, key = %key, "upload succeeded");
        }
        UploadEvent::Failed { name, error, .. } => {
            tracing::debug!(file = %name, error = %error, "upload failed");
        }
        UploadEvent::Canceled { name, .. } => {
            tracing::debug!(file = %name, "upload canceled");
        }
        UploadEvent::BatchFinished { completed, total } => {
            tracing::info!(completed, total, "batch finished");
        }
    }
}

fn log_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match outcome.status {
            FileStatus::Completed => tracing::info!(
                file = %outcome.name,
                key = outcome.key.as_deref().unwrap_or("-"),
                "uploaded"
            ),
            FileStatus::Canceled => tracing::warn!(
                file = %outcome.name,
                progress = outcome.progress_percent,
                "canceled"
            ),
            _ => tracing::error!(
                file = %outcome.name,
                error = outcome.error.as_deref().unwrap_or("unknown error"),
                "failed"
            ),
        }
    }
}
