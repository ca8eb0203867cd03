use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use tuner_dvr::{
    config::{Config, DatabaseConfig},
    database::Database,
    models::{recording_file_name, Channel, CreateRecordingRequest, RecordingStatus},
    web::{AppState, WebServer},
};

struct TestApp {
    app: Router,
    database: Database,
    storage_dir: TempDir,
    _db_dir: TempDir,
}

async fn test_app() -> TestApp {
    let db_dir = tempfile::tempdir().unwrap();
    let storage_dir = tempfile::tempdir().unwrap();

    let database = Database::new(&DatabaseConfig {
        url: format!("sqlite://{}", db_dir.path().join("test.db").display()),
        max_connections: Some(5),
    })
    .await
    .unwrap();
    database.migrate().await.unwrap();

    let mut config = Config::default();
    config.storage.recordings_path = storage_dir.path().to_path_buf();
    config.storage.capture_log_path = storage_dir.path().to_path_buf();

    let app = WebServer::create_router(AppState {
        database: database.clone(),
        config,
    });

    TestApp {
        app,
        database,
        storage_dir,
        _db_dir: db_dir,
    }
}

fn test_channel() -> Channel {
    Channel {
        guide_number: "5".to_string(),
        guide_name: "KPIX".to_string(),
        video_codec: None,
        audio_codec: None,
        hd: None,
        signal_strength: None,
        signal_quality: None,
        url: "http://192.168.1.100:5004/auto/v5".to_string(),
    }
}

// Helper function to send JSON requests to the app
async fn send_request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request_builder = Request::builder().method(method).uri(uri);

    let request = if let Some(body) = body {
        request_builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

// Helper for the file endpoint: returns raw bytes and headers
async fn fetch_file(
    app: &Router,
    uri: &str,
    range: Option<&str>,
) -> (StatusCode, HeaderMap, Bytes) {
    let mut request_builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(range) = range {
        request_builder = request_builder.header("range", range);
    }

    let response = app
        .clone()
        .oneshot(request_builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, headers, body)
}

/// Seed a completed recording plus its on-disk file, returning the id.
async fn seed_completed_recording(test: &TestApp, content: &[u8]) -> i64 {
    let channel = test_channel();
    test.database.insert_channel_if_absent(&channel).await.unwrap();

    let recording = test
        .database
        .create_recording(&CreateRecordingRequest {
            channel_id: channel.guide_number.clone(),
            date: "2026-01-01".to_string(),
            start_time: "19:00".to_string(),
            duration: 30,
        })
        .await
        .unwrap();

    assert!(test
        .database
        .update_recording_status(recording.id, RecordingStatus::Pending, RecordingStatus::Recording)
        .await
        .unwrap());
    assert!(test
        .database
        .update_recording_status(
            recording.id,
            RecordingStatus::Recording,
            RecordingStatus::Completed
        )
        .await
        .unwrap());

    let file_name = recording_file_name(
        &recording.date,
        &recording.start_time,
        &channel.guide_name,
        &channel.guide_number,
    );
    std::fs::write(test.storage_dir.path().join(file_name), content).unwrap();

    recording.id
}

#[tokio::test]
async fn test_list_channels() {
    let test = test_app().await;
    test.database
        .insert_channel_if_absent(&test_channel())
        .await
        .unwrap();

    let (status, body) = send_request(&test.app, Method::GET, "/api/channels", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "guideNumber": "5", "guideName": "KPIX" }]));
}

#[tokio::test]
async fn test_create_recording() {
    let test = test_app().await;
    test.database
        .insert_channel_if_absent(&test_channel())
        .await
        .unwrap();

    let (status, body) = send_request(
        &test.app,
        Method::POST,
        "/api/recordings",
        Some(json!({
            "channelId": "5",
            "date": "2026-01-01",
            "startTime": "19:00",
            "duration": 30
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["channel_id"], "5");
    assert_eq!(body["status"], "pending");
    assert!(body["id"].as_i64().unwrap() >= 1);
}

#[tokio::test]
async fn test_create_recording_rejects_non_positive_duration() {
    let test = test_app().await;
    test.database
        .insert_channel_if_absent(&test_channel())
        .await
        .unwrap();

    for duration in [0, -5] {
        let (status, body) = send_request(
            &test.app,
            Method::POST,
            "/api/recordings",
            Some(json!({
                "channelId": "5",
                "date": "2026-01-01",
                "startTime": "19:00",
                "duration": duration
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Duration must be positive");
    }

    // No row was inserted
    let pending = test
        .database
        .list_recordings_by_status(RecordingStatus::Pending)
        .await
        .unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_create_recording_unknown_channel() {
    let test = test_app().await;

    let (status, body) = send_request(
        &test.app,
        Method::POST,
        "/api/recordings",
        Some(json!({
            "channelId": "99",
            "date": "2026-01-01",
            "startTime": "19:00",
            "duration": 30
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Channel not found");
}

#[tokio::test]
async fn test_list_recordings_includes_channel_info() {
    let test = test_app().await;
    test.database
        .insert_channel_if_absent(&test_channel())
        .await
        .unwrap();
    test.database
        .create_recording(&CreateRecordingRequest {
            channel_id: "5".to_string(),
            date: "2026-01-01".to_string(),
            start_time: "19:00".to_string(),
            duration: 30,
        })
        .await
        .unwrap();

    let (status, body) = send_request(&test.app, Method::GET, "/api/recordings", None).await;

    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["guide_name"], "KPIX");
    assert_eq!(list[0]["status"], "pending");
}

#[tokio::test]
async fn test_delete_recording_is_unconditional() {
    let test = test_app().await;

    // Deleting a recording that never existed still answers 204
    let (status, _) = send_request(&test.app, Method::DELETE, "/api/recordings/12345", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    test.database
        .insert_channel_if_absent(&test_channel())
        .await
        .unwrap();
    let recording = test
        .database
        .create_recording(&CreateRecordingRequest {
            channel_id: "5".to_string(),
            date: "2026-01-01".to_string(),
            start_time: "19:00".to_string(),
            duration: 30,
        })
        .await
        .unwrap();

    let uri = format!("/api/recordings/{}", recording.id);
    let (status, _) = send_request(&test.app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(test
        .database
        .get_recording(recording.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_file_unknown_recording_is_not_found() {
    let test = test_app().await;

    let (status, _, _) = fetch_file(&test.app, "/api/recordings/42/file", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_file_of_pending_recording_is_forbidden() {
    let test = test_app().await;
    test.database
        .insert_channel_if_absent(&test_channel())
        .await
        .unwrap();
    let recording = test
        .database
        .create_recording(&CreateRecordingRequest {
            channel_id: "5".to_string(),
            date: "2026-01-01".to_string(),
            start_time: "19:00".to_string(),
            duration: 30,
        })
        .await
        .unwrap();

    let uri = format!("/api/recordings/{}/file", recording.id);
    let (status, _, _) = fetch_file(&test.app, &uri, None).await;

    // Not yet available, which is different from not existing
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_file_missing_on_disk_is_not_found() {
    let test = test_app().await;
    let id = seed_completed_recording(&test, b"x").await;

    // Remove the file out from under the completed recording
    let file_name = recording_file_name("2026-01-01", "19:00", "KPIX", "5");
    std::fs::remove_file(test.storage_dir.path().join(file_name)).unwrap();

    let uri = format!("/api/recordings/{}/file", id);
    let (status, _, _) = fetch_file(&test.app, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_full_file_download() {
    let test = test_app().await;
    let content: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let id = seed_completed_recording(&test, &content).await;

    let uri = format!("/api/recordings/{}/file", id);
    let (status, headers, body) = fetch_file(&test.app, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-length"], "1000");
    assert_eq!(headers["accept-ranges"], "bytes");
    assert_eq!(headers["content-type"], "video/mp4");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"2026-01-01-19:00-KPIX-5.mp4\""
    );
    assert_eq!(&body[..], &content[..]);
}

#[tokio::test]
async fn test_range_request_returns_exact_window() {
    let test = test_app().await;
    let content: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let id = seed_completed_recording(&test, &content).await;

    let uri = format!("/api/recordings/{}/file", id);
    let (status, headers, body) = fetch_file(&test.app, &uri, Some("bytes=0-99")).await;

    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(headers["content-range"], "bytes 0-99/1000");
    assert_eq!(headers["content-length"], "100");
    assert_eq!(headers["accept-ranges"], "bytes");
    assert_eq!(&body[..], &content[..100]);
}

#[tokio::test]
async fn test_open_ended_range_runs_to_end_of_file() {
    let test = test_app().await;
    let content: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let id = seed_completed_recording(&test, &content).await;

    let uri = format!("/api/recordings/{}/file", id);
    let (status, headers, body) = fetch_file(&test.app, &uri, Some("bytes=500-")).await;

    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(headers["content-range"], "bytes 500-999/1000");
    assert_eq!(headers["content-length"], "500");
    assert_eq!(&body[..], &content[500..]);
}

#[tokio::test]
async fn test_range_past_end_of_file_is_unsatisfiable() {
    let test = test_app().await;
    let content = vec![0u8; 1000];
    let id = seed_completed_recording(&test, &content).await;

    let uri = format!("/api/recordings/{}/file", id);
    let (status, _, _) = fetch_file(&test.app, &uri, Some("bytes=900-1000")).await;

    assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn test_garbage_range_is_bad_request() {
    let test = test_app().await;
    let id = seed_completed_recording(&test, b"0123456789").await;

    let uri = format!("/api/recordings/{}/file", id);
    let (status, _, _) = fetch_file(&test.app, &uri, Some("bytes=abc-10")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
