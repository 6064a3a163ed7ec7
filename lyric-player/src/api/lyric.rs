//! Now-playing endpoints
//!
//! POST /lyric drives the playback controller, GET /lyric reads the session.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use lyric_common::api::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::playback::{PlayAction, PlayState, PlaybackRequest, PlaybackSession};
use crate::AppState;

/// POST /lyric request
#[derive(Debug, Deserialize)]
pub struct SetLyricRequest {
    pub song_id: Option<i64>,

    /// 1 = play, 0 = pause, 2 = stop
    #[serde(default)]
    pub is_playing: u8,

    pub speed: Option<f64>,

    /// Seek position in seconds
    pub progress: Option<f64>,
}

impl TryFrom<SetLyricRequest> for PlaybackRequest {
    type Error = ApiError;

    fn try_from(request: SetLyricRequest) -> Result<Self, Self::Error> {
        let action = PlayAction::from_code(request.is_playing).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "is_playing must be 0 (pause), 1 (play) or 2 (stop), got {}",
                request.is_playing
            ))
        })?;

        Ok(PlaybackRequest {
            song_id: request.song_id,
            action,
            speed: request.speed,
            progress: request.progress,
        })
    }
}

/// Session as sent to clients
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub song_id: i64,
    pub name: String,
    pub lyrics: String,
    pub duration: f64,
    pub progress: f64,
    pub speed: f64,
    pub play_state: PlayState,
    /// Numeric form of `play_state` (1 = playing, 0 = paused, 2 = stopped)
    pub is_playing: u8,
}

impl From<PlaybackSession> for SessionResponse {
    fn from(session: PlaybackSession) -> Self {
        Self {
            is_playing: session.play_state.code(),
            song_id: session.song_id,
            name: session.name,
            lyrics: session.lyrics,
            duration: session.duration,
            progress: session.progress,
            speed: session.speed,
            play_state: session.play_state,
        }
    }
}

/// POST /lyric
pub async fn set_lyric(
    State(state): State<AppState>,
    payload: Result<Json<SetLyricRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<SessionResponse>>> {
    let Json(request) = payload?;
    let request = PlaybackRequest::try_from(request)?;

    let response = match state.playback.apply(request).await? {
        Some(session) => ApiResponse::success(session.into()),
        None => ApiResponse::with_message("stopped", None),
    };

    Ok(Json(response))
}

/// GET /lyric
pub async fn get_lyric(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<SessionResponse>>> {
    let session = state
        .playback
        .current()
        .await
        .ok_or_else(|| ApiError::NotFound("No song is playing".to_string()))?;

    Ok(Json(ApiResponse::success(session.into())))
}

/// Build now-playing routes
pub fn lyric_routes() -> Router<AppState> {
    Router::new().route("/lyric", get(get_lyric).post(set_lyric))
}
