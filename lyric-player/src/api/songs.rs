//! Song catalog endpoints
//!
//! POST /songs, GET /songs, GET /songs/:id

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use lyric_common::api::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::db::songs::{self, NewSong, Song};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, Pagination};
use crate::AppState;

/// POST /songs request
#[derive(Debug, Deserialize)]
pub struct CreateSongRequest {
    pub name: Option<String>,
    pub lyrics: Option<String>,
    pub duration: Option<f64>,
}

impl CreateSongRequest {
    fn into_new_song(self) -> ApiResult<NewSong> {
        let missing = |field: &str| ApiError::BadRequest(format!("{} is required", field));

        Ok(NewSong {
            name: self.name.ok_or_else(|| missing("name"))?,
            lyrics: self.lyrics.ok_or_else(|| missing("lyrics"))?,
            duration: self.duration.ok_or_else(|| missing("duration"))?,
        })
    }
}

/// GET /songs query
#[derive(Debug, Default, Deserialize)]
pub struct SongQuery {
    /// Substring matched against name and lyrics
    #[serde(default)]
    pub lyric: String,

    /// Page number (1-indexed); the full list is returned when absent
    pub page: Option<i64>,

    pub page_size: Option<i64>,
}

/// GET /songs payload
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SongListing {
    All(Vec<Song>),
    Page {
        items: Vec<Song>,
        pagination: Pagination,
    },
}

/// POST /songs
pub async fn create_song(
    State(state): State<AppState>,
    payload: Result<Json<CreateSongRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Song>>> {
    let Json(request) = payload?;
    let new_song = request.into_new_song()?;

    let song = songs::create_song(&state.db, &new_song).await?;
    tracing::info!(song_id = song.id, name = %song.name, "Song created");

    Ok(Json(ApiResponse::success(song)))
}

/// GET /songs?lyric=<substr>[&page=N&page_size=M]
pub async fn search_songs(
    State(state): State<AppState>,
    query: Result<Query<SongQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<SongListing>>> {
    let Query(query) = query?;

    let listing = match query.page {
        None => SongListing::All(songs::search_songs(&state.db, &query.lyric).await?),
        Some(page) => {
            let total = songs::count_songs(&state.db, &query.lyric).await?;
            let pagination = calculate_pagination(total, page, query.page_size);
            let items = songs::search_songs_page(
                &state.db,
                &query.lyric,
                pagination.page_size,
                pagination.offset,
            )
            .await?;
            SongListing::Page { items, pagination }
        }
    };

    Ok(Json(ApiResponse::success(listing)))
}

/// GET /songs/:id
pub async fn get_song(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<Song>>> {
    let Path(id) = path?;
    let song = songs::load_song(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song not found: {}", id)))?;

    Ok(Json(ApiResponse::success(song)))
}

/// Build song catalog routes
pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/songs", get(search_songs).post(create_song))
        .route("/songs/:id", get(get_song))
}
