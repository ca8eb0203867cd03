//! Channel lineup loading
//!
//! Fetches the tuner's lineup endpoint and stores the channels it
//! reports. Inserts are insert-if-absent: a re-import never overwrites a
//! row that already exists. Lineup failures are logged and non-fatal;
//! the service keeps running with whatever channels are already stored.

use anyhow::Result;
use tracing::{info, warn};

use crate::database::Database;
use crate::models::Channel;

pub struct LineupClient {
    client: reqwest::Client,
    url: String,
}

impl LineupClient {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Fetch the lineup and store any channels not already present.
    /// Returns the number of channels the tuner reported.
    pub async fn refresh(&self, database: &Database) -> Result<usize> {
        info!("Fetching channel lineup from {}", self.url);

        let channels: Vec<Channel> = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        for channel in &channels {
            if let Err(e) = database.insert_channel_if_absent(channel).await {
                warn!(
                    "Failed to store channel {} ({}): {}",
                    channel.guide_number, channel.guide_name, e
                );
            }
        }

        info!("Lineup reported {} channels", channels.len());
        Ok(channels.len())
    }
}
