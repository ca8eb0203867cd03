//! Web layer
//!
//! HTTP interface over the recording store: the channel and recording
//! APIs plus the range-aware playback endpoint. Handlers stay thin and
//! delegate to the `Database`; errors are mapped to HTTP status codes at
//! this boundary.

use anyhow::Result;
use axum::{
    routing::{delete, get},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

use crate::{config::Config, database::Database};

pub mod api;
pub mod media;
pub mod range;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Config,
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub async fn new(config: Config, database: Database) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        let app = Self::create_router(AppState { database, config });

        Ok(Self { app, addr })
    }

    /// Build the router. Public so tests can drive the API without
    /// binding a socket.
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/api/channels", get(api::list_channels))
            .route(
                "/api/recordings",
                get(api::list_recordings).post(api::create_recording),
            )
            .route("/api/recordings/:id", delete(api::delete_recording))
            .route("/api/recordings/:id/file", get(media::get_recording_file))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }
}
