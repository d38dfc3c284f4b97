mod config;
mod error;
mod models;
mod routes;
mod services;
mod session;
mod utils;

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;
use crate::routes::AppState;
use crate::services::gemini::GeminiBackend;
use crate::services::llm::AiGateway;
use crate::session::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let backend = GeminiBackend::new(&config).context("Failed to build HTTP client")?;
    let app_state = AppState {
        gateway: AiGateway::new(Arc::new(backend)),
        sessions: SessionStore::with_capacity(config.max_sessions),
    };

    let app = routes::router(app_state, config.max_upload_bytes);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(
        "Listening on {} (model {})",
        listener.local_addr()?,
        config.model
    );
    axum::serve(listener, app).await?;

    Ok(())
}
