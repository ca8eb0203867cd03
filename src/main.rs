use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tuner_dvr::{
    capture::{CaptureWorker, FfmpegBackend},
    config::Config,
    database::Database,
    lineup::LineupClient,
    scheduler::SchedulerService,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "tuner-dvr")]
#[command(version = "0.1.0")]
#[command(about = "A DVR recording scheduler and media playback service for network TV tuners")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Directory completed captures are written to (overrides config file)
    #[arg(short = 's', long, value_name = "DIR")]
    storage_dir: Option<std::path::PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("tuner_dvr={},tower_http=trace", cli.log_level)
    } else {
        format!("tuner_dvr={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tuner-dvr v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from specified file
    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    if let Some(storage_dir) = cli.storage_dir {
        config.storage.recordings_path = storage_dir;
    }

    info!("Using database: {}", config.database.url);

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and schema applied");

    // Load the channel lineup; keep running with stored channels if the
    // tuner is unreachable
    if config.lineup.refresh_on_startup {
        let lineup = LineupClient::new(config.lineup.url.clone());
        if let Err(e) = lineup.refresh(&database).await {
            warn!("Channel lineup refresh failed: {}", e);
        }
    }

    // Start the recording scheduler
    let worker = Arc::new(CaptureWorker::new(
        database.clone(),
        config.storage.clone(),
        Arc::new(FfmpegBackend),
    ));
    let scheduler = SchedulerService::new(database.clone(), &config.scheduler.timezone, worker);

    tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Scheduler service failed: {}", e);
        }
    });

    let web_server = WebServer::new(config, database).await?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}
