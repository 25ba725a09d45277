//! Recital Audio Player - Main entry point
//!
//! Streamed text-to-speech playback daemon: fetches synthesized speech
//! segments from a backend, schedules them gaplessly on a shared playback
//! clock, and exposes an HTTP/SSE control interface.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recital_player::api;
use recital_player::backend::SynthesisClient;
use recital_player::config::{Config, ConfigOverrides};
use recital_player::playback::PlaybackEngine;
use recital_player::state::SharedState;

/// Command-line arguments for recital-player
#[derive(Parser, Debug)]
#[command(name = "recital-player")]
#[command(about = "Streamed text-to-speech playback daemon")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "RECITAL_PORT")]
    port: Option<u16>,

    /// Base URL of the synthesis backend
    #[arg(short, long, env = "RECITAL_BACKEND_URL")]
    backend_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recital_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = Config::load(
        args.config.as_deref(),
        ConfigOverrides {
            backend_url: args.backend_url,
            port: args.port,
        },
    )
    .await
    .context("Failed to load configuration")?;

    info!("Starting Recital Audio Player on port {}", config.port);
    info!("Synthesis backend: {}", config.backend_url);

    let client = SynthesisClient::new(&config.backend_url, config.request_timeout)
        .context("Failed to create backend client")?;
    let state = Arc::new(SharedState::new());
    let engine = Arc::new(PlaybackEngine::new(client, Arc::clone(&state)));
    info!("Playback engine initialized");

    // Position reporting and finish detection
    tokio::spawn(Arc::clone(&engine).run_monitor());

    let app_state = api::AppState {
        engine: Arc::clone(&engine),
        state,
        port: config.port,
    };
    let app = api::create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    engine.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
