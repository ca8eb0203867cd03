use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

use super::{parse_datetime, Database};
use crate::models::{CreateRecordingRequest, Recording, RecordingStatus, RecordingWithChannel};

fn map_recording(row: &SqliteRow) -> Result<Recording> {
    let status_str: String = row.get("status");
    let status = RecordingStatus::from_str(&status_str).map_err(anyhow::Error::msg)?;
    let created_at: String = row.get("created_at");

    Ok(Recording {
        id: row.get("id"),
        channel_id: row.get("channel_id"),
        date: row.get("date"),
        start_time: row.get("start_time"),
        duration: row.get("duration"),
        status,
        created_at: parse_datetime(&created_at)?,
    })
}

impl Database {
    /// Insert a new recording in `pending` state and return the stored
    /// row. Every insert yields a fresh id; identical (channel, date,
    /// start time) tuples are never merged.
    pub async fn create_recording(&self, request: &CreateRecordingRequest) -> Result<Recording> {
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO recordings (channel_id, date, start_time, duration, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.channel_id)
        .bind(&request.date)
        .bind(&request.start_time)
        .bind(request.duration)
        .bind(RecordingStatus::Pending.as_str())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Recording {
            id: result.last_insert_rowid(),
            channel_id: request.channel_id.clone(),
            date: request.date.clone(),
            start_time: request.start_time.clone(),
            duration: request.duration,
            status: RecordingStatus::Pending,
            created_at,
        })
    }

    pub async fn get_recording(&self, id: i64) -> Result<Option<Recording>> {
        let row = sqlx::query(
            "SELECT id, channel_id, date, start_time, duration, status, created_at
             FROM recordings WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(map_recording(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_recordings_by_status(
        &self,
        status: RecordingStatus,
    ) -> Result<Vec<Recording>> {
        let rows = sqlx::query(
            "SELECT id, channel_id, date, start_time, duration, status, created_at
             FROM recordings WHERE status = ?",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut recordings = Vec::new();
        for row in rows {
            recordings.push(map_recording(&row)?);
        }

        Ok(recordings)
    }

    pub async fn list_recordings_with_channels(&self) -> Result<Vec<RecordingWithChannel>> {
        let rows = sqlx::query(
            "SELECT r.id, r.channel_id, r.date, r.start_time, r.duration, r.status, r.created_at,
                    c.guide_number, c.guide_name
             FROM recordings r
             LEFT JOIN channels c ON r.channel_id = c.guide_number
             ORDER BY r.date, r.start_time",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut recordings = Vec::new();
        for row in rows {
            recordings.push(RecordingWithChannel {
                recording: map_recording(&row)?,
                guide_number: row.get("guide_number"),
                guide_name: row.get("guide_name"),
            });
        }

        Ok(recordings)
    }

    /// Recording joined with its channel's display name, for resolving the
    /// media file path. The name is `None` when the channel row is gone.
    pub async fn get_recording_with_channel_name(
        &self,
        id: i64,
    ) -> Result<Option<(Recording, Option<String>)>> {
        let row = sqlx::query(
            "SELECT r.id, r.channel_id, r.date, r.start_time, r.duration, r.status, r.created_at,
                    c.guide_name
             FROM recordings r
             LEFT JOIN channels c ON r.channel_id = c.guide_number
             WHERE r.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let recording = map_recording(&row)?;
                let guide_name: Option<String> = row.get("guide_name");
                Ok(Some((recording, guide_name)))
            }
            None => Ok(None),
        }
    }

    /// Compare-and-set status update: succeeds only if the row's current
    /// status still equals `expected`. Exactly one of any number of
    /// concurrent callers observes `true`; this is the sole concurrency
    /// guard behind the scheduler's at-most-once activation.
    ///
    /// Transitions outside the recording lifecycle are refused outright,
    /// so no call site can move a row along an illegal edge.
    pub async fn update_recording_status(
        &self,
        id: i64,
        expected: RecordingStatus,
        new: RecordingStatus,
    ) -> Result<bool> {
        if !expected.can_transition_to(new) {
            anyhow::bail!("illegal status transition: {} -> {}", expected, new);
        }

        let result = sqlx::query("UPDATE recordings SET status = ? WHERE id = ? AND status = ?")
            .bind(new.as_str())
            .bind(id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a recording regardless of status. The captured file, if
    /// any, is left on disk.
    pub async fn delete_recording(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM recordings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
