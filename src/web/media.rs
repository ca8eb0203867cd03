//! Recording playback endpoint
//!
//! Serves a completed recording's media file with single-range
//! partial-content support, which is what players rely on for seeking.
//! The file path is re-derived from the recording and channel fields via
//! the shared naming function; it is never stored separately, so the
//! capture worker and this endpoint cannot disagree on where a file
//! lives. Nothing store-related is held while the body streams.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

use super::range::{ByteRange, RangeError};
use super::AppState;
use crate::models::{recording_file_name, RecordingStatus};

pub async fn get_recording_file(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let (recording, guide_name) = match state.database.get_recording_with_channel_name(id).await {
        Ok(Some(pair)) => pair,
        Ok(None) => return (StatusCode::NOT_FOUND, "Recording not found").into_response(),
        Err(e) => {
            error!("Failed to load recording {}: {}", id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Not yet available is distinct from does not exist
    if recording.status != RecordingStatus::Completed {
        return (StatusCode::FORBIDDEN, "Recording not completed").into_response();
    }

    let Some(guide_name) = guide_name else {
        error!(
            "Recording {} is completed but its channel {} is gone; file path unresolvable",
            id, recording.channel_id
        );
        return (StatusCode::NOT_FOUND, "Recording file not found").into_response();
    };

    let file_name = recording_file_name(
        &recording.date,
        &recording.start_time,
        &guide_name,
        &recording.channel_id,
    );
    let path = state.config.storage.recordings_path.join(&file_name);

    let size = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!(
                "Recording {} is completed but {} is missing from storage",
                id,
                path.display()
            );
            return (StatusCode::NOT_FOUND, "Recording file not found").into_response();
        }
        Err(e) => {
            error!("Failed to stat {}: {}", path.display(), e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let range_header = match headers.get(header::RANGE) {
        None => return serve_full(path, &file_name, size).await,
        Some(value) => match value.to_str() {
            Ok(raw) => raw,
            Err(_) => return (StatusCode::BAD_REQUEST, "Invalid range header").into_response(),
        },
    };

    match ByteRange::parse(range_header, size) {
        Ok(range) => {
            debug!(
                "Serving recording {} bytes {}-{} of {}",
                id, range.start, range.end, size
            );
            serve_partial(path, range, size).await
        }
        Err(RangeError::Malformed(_)) => {
            (StatusCode::BAD_REQUEST, "Invalid range header").into_response()
        }
        Err(RangeError::Unsatisfiable { .. }) => {
            (StatusCode::RANGE_NOT_SATISFIABLE, "Invalid range").into_response()
        }
    }
}

async fn serve_full(path: PathBuf, file_name: &str, size: u64) -> Response {
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to open {}: {}", path.display(), e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    Response::builder()
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, size)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .unwrap_or_else(|e| {
            error!("Failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

async fn serve_partial(path: PathBuf, range: ByteRange, size: u64) -> Response {
    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to open {}: {}", path.display(), e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(e) = file.seek(SeekFrom::Start(range.start)).await {
        error!("Failed to seek {} to {}: {}", path.display(), range.start, e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    // Emit exactly the requested window and no more
    let stream = ReaderStream::new(file.take(range.len()));

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", range.start, range.end, size),
        )
        .header(header::CONTENT_LENGTH, range.len())
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            error!("Failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}
