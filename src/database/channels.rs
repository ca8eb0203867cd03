use anyhow::Result;
use sqlx::Row;

use super::Database;
use crate::models::{Channel, ChannelSummary};

impl Database {
    /// Store a channel unless a row with the same guide number already
    /// exists. Re-imports never overwrite existing rows.
    pub async fn insert_channel_if_absent(&self, channel: &Channel) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO channels (guide_number, guide_name, url) VALUES (?, ?, ?)",
        )
        .bind(&channel.guide_number)
        .bind(&channel.guide_name)
        .bind(&channel.url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_channels(&self) -> Result<Vec<ChannelSummary>> {
        let rows = sqlx::query("SELECT guide_number, guide_name FROM channels")
            .fetch_all(&self.pool)
            .await?;

        let mut channels = Vec::new();
        for row in rows {
            channels.push(ChannelSummary {
                guide_number: row.get("guide_number"),
                guide_name: row.get("guide_name"),
            });
        }

        Ok(channels)
    }

    pub async fn get_channel(&self, guide_number: &str) -> Result<Option<Channel>> {
        let row = sqlx::query(
            "SELECT guide_number, guide_name, url FROM channels WHERE guide_number = ?",
        )
        .bind(guide_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Channel {
            guide_number: row.get("guide_number"),
            guide_name: row.get("guide_name"),
            video_codec: None,
            audio_codec: None,
            hd: None,
            signal_strength: None,
            signal_quality: None,
            url: row.get("url"),
        }))
    }

    pub async fn channel_exists(&self, guide_number: &str) -> Result<bool> {
        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM channels WHERE guide_number = ?)")
                .bind(guide_number)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists != 0)
    }
}
