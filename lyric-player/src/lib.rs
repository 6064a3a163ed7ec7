//! # Lyric Player Library (lyric-player)
//!
//! Song catalog with lyrics plus a simulated "now playing" slot whose progress
//! advances on a fixed tick.
//!
//! **Architecture:** axum HTTP API over a SQLite catalog (sqlx) and an
//! in-process [`playback::PlaybackCoordinator`].

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod playback;

pub use error::{ApiError, ApiResult};

use db::songs::SqliteSongs;
use playback::{PlaybackCoordinator, TickerConfig};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Song catalog connection pool
    pub db: SqlitePool,
    /// Owner of the now-playing session
    pub playback: Arc<PlaybackCoordinator>,
}

impl AppState {
    /// State whose coordinator resolves songs from the same database
    pub fn new(db: SqlitePool, ticker_config: TickerConfig) -> Self {
        let songs = Arc::new(SqliteSongs::new(db.clone()));
        let playback = Arc::new(PlaybackCoordinator::new(songs, ticker_config));
        Self { db, playback }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::song_routes())
        .merge(api::lyric_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
