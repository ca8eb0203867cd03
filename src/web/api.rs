use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use super::AppState;
use crate::models::{ChannelSummary, CreateRecordingRequest, RecordingWithChannel};

// Channels API
pub async fn list_channels(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChannelSummary>>, StatusCode> {
    match state.database.list_channels().await {
        Ok(channels) => Ok(Json(channels)),
        Err(e) => {
            error!("Failed to list channels: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// Recordings API
pub async fn list_recordings(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecordingWithChannel>>, StatusCode> {
    match state.database.list_recordings_with_channels().await {
        Ok(recordings) => Ok(Json(recordings)),
        Err(e) => {
            error!("Failed to list recordings: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn create_recording(
    State(state): State<AppState>,
    Json(payload): Json<CreateRecordingRequest>,
) -> Response {
    if payload.duration <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Duration must be positive" })),
        )
            .into_response();
    }

    match state.database.channel_exists(&payload.channel_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Channel not found" })),
            )
                .into_response();
        }
        Err(e) => {
            error!("Failed to check channel {}: {}", payload.channel_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match state.database.create_recording(&payload).await {
        Ok(recording) => (StatusCode::CREATED, Json(recording)).into_response(),
        Err(e) => {
            error!("Failed to create recording: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to create recording" })),
            )
                .into_response()
        }
    }
}

/// Delete is unconditional: 204 whether or not the row existed. The
/// captured file, if any, stays on disk.
pub async fn delete_recording(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, StatusCode> {
    match state.database.delete_recording(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete recording {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
