use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub storage: StorageConfig,
    pub scheduler: SchedulerConfig,
    pub lineup: LineupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory completed captures are written to.
    pub recordings_path: PathBuf,
    /// Scratch directory for per-capture ffmpeg logs.
    pub capture_log_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// IANA timezone name used to interpret recording start times.
    /// An unparseable value degrades to UTC with a logged warning.
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupConfig {
    /// Tuner lineup endpoint queried for the channel list.
    pub url: String,
    pub refresh_on_startup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://./tuner-dvr.db".to_string(),
                max_connections: Some(10),
            },
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                recordings_path: PathBuf::from("./data/recordings"),
                capture_log_path: PathBuf::from("/tmp"),
            },
            scheduler: SchedulerConfig {
                timezone: "America/Los_Angeles".to_string(),
            },
            lineup: LineupConfig {
                url: "http://hdhomerun.local/lineup.json?show=found".to_string(),
                refresh_on_startup: true,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::create_dir_all(&default_config.storage.recordings_path)?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }
}
