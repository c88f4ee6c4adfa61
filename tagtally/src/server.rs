use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{self, AppState};

/// HTTP server wrapping the count endpoint and the embedded form page.
pub struct HttpServer {
    listen_addr: String,
    state: AppState,
}

impl HttpServer {
    pub fn new(listen_addr: String, state: AppState) -> Self {
        Self { listen_addr, state }
    }

    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = self
            .listen_addr
            .parse()
            .context("Invalid HTTP listen address")?;

        let app = create_router(self.state);

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("Listening on http://{}", addr);

        axum::serve(listener, app)
            .await
            .context("HTTP server terminated")?;

        Ok(())
    }
}

/// Builds the application router. The count endpoint only registers POST,
/// so every other verb on it answers 405.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/static/style.css", get(handlers::style))
        .route("/static/script.js", get(handlers::script))
        .route("/api/count", post(handlers::count))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
