//! Capture execution
//!
//! The scheduler hands a claimed recording to a [`CaptureWorker`], which
//! resolves the channel, derives the output path and drives a pluggable
//! [`CaptureBackend`]. The default backend shells out to ffmpeg with a
//! stream copy bounded to the recording's duration.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::StorageConfig;
use crate::database::Database;
use crate::errors::types::{AppError, CaptureError};
use crate::models::{capture_log_name, recording_file_name, Recording, RecordingStatus};

/// External mechanism performing the actual stream-to-file copy.
///
/// Implementations must bound the copy to `duration_seconds` and write all
/// diagnostic output to `log_path`, never to the application log stream.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn capture(
        &self,
        source_url: &str,
        output_path: &Path,
        log_path: &Path,
        duration_seconds: i64,
    ) -> Result<(), CaptureError>;
}

/// Captures with `ffmpeg -i <url> -t <seconds> -c copy <output>`.
///
/// The `-t` flag is what bounds the capture; the worker blocks until the
/// process exits on its own.
pub struct FfmpegBackend;

#[async_trait]
impl CaptureBackend for FfmpegBackend {
    async fn capture(
        &self,
        source_url: &str,
        output_path: &Path,
        log_path: &Path,
        duration_seconds: i64,
    ) -> Result<(), CaptureError> {
        let log_file = std::fs::File::create(log_path).map_err(|e| CaptureError::LogFile {
            path: log_path.display().to_string(),
            message: e.to_string(),
        })?;
        let log_stderr = log_file.try_clone().map_err(|e| CaptureError::LogFile {
            path: log_path.display().to_string(),
            message: e.to_string(),
        })?;

        let status = Command::new("ffmpeg")
            .arg("-i")
            .arg(source_url)
            .arg("-t")
            .arg(duration_seconds.to_string())
            .arg("-c")
            .arg("copy")
            .arg(output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(log_stderr))
            .status()
            .await
            .map_err(|e| CaptureError::SpawnFailed {
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(CaptureError::NonZeroExit {
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

/// Runs one capture for a recording already claimed into `recording`
/// state and writes the terminal status back to the store.
pub struct CaptureWorker {
    database: Database,
    storage: StorageConfig,
    backend: Arc<dyn CaptureBackend>,
}

impl CaptureWorker {
    pub fn new(database: Database, storage: StorageConfig, backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            database,
            storage,
            backend,
        }
    }

    /// Execute the capture and record the outcome. The worker owns the
    /// row exclusively while it is in `recording`, so the terminal write
    /// is expected to succeed; a compare-and-set failure here is logged
    /// as an anomaly rather than retried.
    pub async fn run(&self, recording: Recording) {
        let id = recording.id;
        match self.capture(&recording).await {
            Ok(output_path) => {
                info!(
                    "Recording {} completed successfully: {}",
                    id,
                    output_path.display()
                );
                self.finish(id, RecordingStatus::Completed).await;
            }
            Err(e) => {
                error!("Recording {} failed: {}", id, e);
                self.finish(id, RecordingStatus::Failed).await;
            }
        }
    }

    async fn capture(&self, recording: &Recording) -> Result<PathBuf, AppError> {
        let channel = self
            .database
            .get_channel(&recording.channel_id)
            .await
            .map_err(|e| {
                AppError::internal(format!(
                    "failed to load channel {}: {}",
                    recording.channel_id, e
                ))
            })?
            .ok_or_else(|| AppError::not_found("channel", recording.channel_id.clone()))?;

        tokio::fs::create_dir_all(&self.storage.recordings_path).await?;
        tokio::fs::create_dir_all(&self.storage.capture_log_path).await?;

        let output_path = self.storage.recordings_path.join(recording_file_name(
            &recording.date,
            &recording.start_time,
            &channel.guide_name,
            &channel.guide_number,
        ));
        let log_path = self
            .storage
            .capture_log_path
            .join(capture_log_name(&recording.date, &recording.start_time));

        let duration_seconds = recording.duration * 60;
        info!(
            "Starting capture for recording {}: channel '{}' ({}), {} minutes -> {}",
            recording.id,
            channel.guide_name,
            channel.guide_number,
            recording.duration,
            output_path.display()
        );

        self.backend
            .capture(&channel.url, &output_path, &log_path, duration_seconds)
            .await?;

        Ok(output_path)
    }

    async fn finish(&self, id: i64, status: RecordingStatus) {
        match self
            .database
            .update_recording_status(id, RecordingStatus::Recording, status)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(
                "Recording {} changed status out from under its capture worker",
                id
            ),
            Err(e) => error!("Failed to update status for recording {}: {}", id, e),
        }
    }
}
