//! lyric-player - song lyrics catalog with a simulated now-playing slot
//!
//! Serves the song catalog and the playback progress API over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lyric_common::config::load_config;
use lyric_player::playback::TickerConfig;
use lyric_player::{build_router, AppState};
use tokio::signal;
use tracing::info;

/// Command-line arguments for lyric-player
#[derive(Parser, Debug)]
#[command(name = "lyric-player")]
#[command(about = "Song lyrics catalog and playback progress service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "LYRIC_PLAYER_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "LYRIC_PLAYER_PORT")]
    port: Option<u16>,

    /// Song database path (overrides the config file)
    #[arg(short, long, env = "LYRIC_PLAYER_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("lyric_player={0},lyric_common={0},tower_http=info", config.logging.level)
                    .into()
            }),
        )
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting lyric-player v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let port = args.port.unwrap_or(config.port);
    let db_path = args.database.unwrap_or_else(|| config.database_path());
    info!("Database path: {}", db_path.display());

    let pool = lyric_player::db::init_database_pool(&db_path)
        .await
        .context("Failed to initialize song database")?;
    info!("✓ Connected to database");

    let ticker_config = TickerConfig::from(&config.playback);
    info!(
        "Progress ticker: every {}ms, step {}",
        ticker_config.period.as_millis(),
        ticker_config.step
    );

    let state = AppState::new(pool, ticker_config);
    let playback = state.playback.clone();
    let app = build_router(state);

    let ip = config
        .bind_address
        .parse::<std::net::IpAddr>()
        .with_context(|| format!("Invalid bind_address: {}", config.bind_address))?;
    let addr = SocketAddr::new(ip, port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("lyric-player listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    playback.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
