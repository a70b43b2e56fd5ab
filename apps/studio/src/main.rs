mod config;
mod engine;
mod errors;
mod folders;
mod logbridge;
mod render;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::engine::HttpEngineFactory;
use crate::logbridge::{ChannelDisplay, LogBridge};
use crate::routes::build_router;
use crate::session::Controller;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging; the Log Bridge layer stays inert until attached
    let bridge = LogBridge::default();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .with(bridge.layer())
        .init();

    info!("Starting Resume Studio v{}", env!("CARGO_PKG_VERSION"));

    // Initialize engine client
    let factory = HttpEngineFactory::new(
        config.engine_url.as_str(),
        config.data_path.clone(),
        Duration::from_secs(config.engine_timeout_secs),
    )?;
    info!("Engine client initialized ({})", config.engine_url);

    folders::ensure_root(&config.data_path)?;
    info!(
        "Data root {}, previews in {}",
        config.data_path.display(),
        config.preview_dir.display()
    );

    // Build app state
    let logs = Arc::new(ChannelDisplay::new());
    let controller = Controller::new(
        Arc::new(factory),
        bridge,
        logs.clone(),
        config.data_path.clone(),
        config.preview_dir.clone(),
    );
    let state = AppState::new(controller, logs)?;

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
