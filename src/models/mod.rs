use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tuner channel as reported by the lineup endpoint.
///
/// The tuner serves the full payload in PascalCase JSON; only
/// `guide_number`, `guide_name` and `url` are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "GuideNumber")]
    pub guide_number: String,
    #[serde(rename = "GuideName")]
    pub guide_name: String,
    #[serde(rename = "VideoCodec", default)]
    pub video_codec: Option<String>,
    #[serde(rename = "AudioCodec", default)]
    pub audio_codec: Option<String>,
    #[serde(rename = "HD", default)]
    pub hd: Option<i64>,
    #[serde(rename = "SignalStrength", default)]
    pub signal_strength: Option<i64>,
    #[serde(rename = "SignalQuality", default)]
    pub signal_quality: Option<i64>,
    #[serde(rename = "URL")]
    pub url: String,
}

/// Lifecycle state of a recording.
///
/// Valid transitions are `pending -> recording -> completed`,
/// `pending -> recording -> failed` and `pending -> failed`. Terminal
/// states are immutable; deletion is the only further mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    Pending,
    Recording,
    Completed,
    Failed,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Pending => "pending",
            RecordingStatus::Recording => "recording",
            RecordingStatus::Completed => "completed",
            RecordingStatus::Failed => "failed",
        }
    }

    /// Whether `self -> next` is a legal lifecycle transition.
    pub fn can_transition_to(&self, next: RecordingStatus) -> bool {
        matches!(
            (self, next),
            (RecordingStatus::Pending, RecordingStatus::Recording)
                | (RecordingStatus::Pending, RecordingStatus::Failed)
                | (RecordingStatus::Recording, RecordingStatus::Completed)
                | (RecordingStatus::Recording, RecordingStatus::Failed)
        )
    }
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecordingStatus::Pending),
            "recording" => Ok(RecordingStatus::Recording),
            "completed" => Ok(RecordingStatus::Completed),
            "failed" => Ok(RecordingStatus::Failed),
            other => Err(format!("unknown recording status: {}", other)),
        }
    }
}

/// A scheduled or executed recording.
///
/// `date` is `YYYY-MM-DD` and `start_time` is `HH:MM` local wall-clock,
/// interpreted against the process-wide configured timezone.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recording {
    pub id: i64,
    pub channel_id: String,
    pub date: String,
    pub start_time: String,
    pub duration: i64,
    pub status: RecordingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordingRequest {
    pub channel_id: String,
    pub date: String,
    pub start_time: String,
    pub duration: i64,
}

/// Recording joined with its channel for API listings. The channel side
/// may be absent when a channel was removed after the recording was made.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingWithChannel {
    #[serde(flatten)]
    pub recording: Recording,
    pub guide_number: Option<String>,
    pub guide_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub guide_number: String,
    pub guide_name: String,
}

/// Media file name for a recording: `<date>-<startTime>-<guideName>-<guideNumber>.mp4`.
///
/// This is the single naming function shared by the capture worker and the
/// media server; both derive the path from it so they can never disagree
/// on where a recording lives.
pub fn recording_file_name(
    date: &str,
    start_time: &str,
    guide_name: &str,
    guide_number: &str,
) -> String {
    format!("{}-{}-{}-{}.mp4", date, start_time, guide_name, guide_number)
}

/// Side log file name for a capture, keyed by (date, start time).
pub fn capture_log_name(date: &str, start_time: &str) -> String {
    format!("{}-{}.log", date, start_time)
}
