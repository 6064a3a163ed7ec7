//! HTTP API handlers for lyric-player

pub mod health;
pub mod lyric;
pub mod songs;

pub use health::health_routes;
pub use lyric::lyric_routes;
pub use songs::song_routes;
