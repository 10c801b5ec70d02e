//! MoodMate web front end (moodmate-ui) - Main entry point
//!
//! Serves the MoodMate pages and proxies classification, recommendation and
//! account requests to the classification backend.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moodmate_common::config::{default_config_path, Settings, TomlConfig};
use moodmate_ui::client::BackendClient;
use moodmate_ui::{build_router, AppState};

/// How often idle browser sessions are looked for
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Command-line arguments for moodmate-ui
#[derive(Parser, Debug)]
#[command(name = "moodmate-ui")]
#[command(about = "Web front end for the MoodMate emotion classifier")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MOODMATE_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long)]
    bind: Option<String>,

    /// Base URL of the classification backend
    #[arg(long)]
    backend_url: Option<String>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing starts so its log level can apply
    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = TomlConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("moodmate_ui={0},moodmate_common={0},tower_http=info", toml_config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting MoodMate UI (moodmate-ui) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match config_path.as_deref() {
        Some(path) if path.exists() => info!("Configuration file: {}", path.display()),
        Some(path) => warn!("Config file not found at {}; using compiled defaults", path.display()),
        None => warn!("Could not determine config directory; using compiled defaults"),
    }

    let settings = Settings::resolve(
        args.backend_url.as_deref(),
        args.port,
        args.bind.as_deref(),
        &toml_config,
    )
    .context("Invalid configuration")?;
    info!("Backend: {}", settings.backend_url);

    let backend = BackendClient::new(
        settings.backend_url.clone(),
        Duration::from_secs(settings.request_timeout_secs),
    )
    .context("Failed to create backend client")?;

    let state = AppState::new(backend, settings.max_upload_bytes);
    state.sessions.spawn_idle_sweeper(
        Duration::from_secs(settings.session_idle_minutes.saturating_mul(60)),
        SESSION_SWEEP_INTERVAL,
    );
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.bind_address, settings.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", settings.bind_address, settings.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("moodmate-ui listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
