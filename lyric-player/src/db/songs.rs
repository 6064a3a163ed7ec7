//! Song catalog operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lyric_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::playback::SongLookup;

/// Song record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub name: String,
    pub lyrics: String,
    /// Seconds
    pub duration: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a song
#[derive(Debug, Clone, PartialEq)]
pub struct NewSong {
    pub name: String,
    pub lyrics: String,
    pub duration: f64,
}

impl NewSong {
    /// All fields are required (non-empty); duration must be positive
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidInput("name is required".to_string()));
        }
        if self.lyrics.is_empty() {
            return Err(Error::InvalidInput("lyrics is required".to_string()));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "duration must be a positive number, got {}",
                self.duration
            )));
        }
        Ok(())
    }
}

fn song_from_row(row: &SqliteRow) -> Song {
    Song {
        id: row.get("id"),
        name: row.get("name"),
        lyrics: row.get("lyrics"),
        duration: row.get("duration"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Insert a song and return the stored record
pub async fn create_song(pool: &SqlitePool, song: &NewSong) -> Result<Song> {
    song.validate()?;

    let now = Utc::now();
    let id = sqlx::query(
        r#"
        INSERT INTO songs (name, lyrics, duration, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&song.name)
    .bind(&song.lyrics)
    .bind(song.duration)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    load_song(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Song {} missing after insert", id)))
}

/// Load a song by id
pub async fn load_song(pool: &SqlitePool, id: i64) -> Result<Option<Song>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, lyrics, duration, created_at, updated_at
        FROM songs
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(song_from_row))
}

/// Songs whose name or lyrics contain `filter` (case-sensitive).
/// An empty filter matches every song.
pub async fn search_songs(pool: &SqlitePool, filter: &str) -> Result<Vec<Song>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, lyrics, duration, created_at, updated_at
        FROM songs
        WHERE ? = '' OR instr(name, ?) > 0 OR instr(lyrics, ?) > 0
        ORDER BY id ASC
        "#,
    )
    .bind(filter)
    .bind(filter)
    .bind(filter)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(song_from_row).collect())
}

/// Number of songs matching `filter`
pub async fn count_songs(pool: &SqlitePool, filter: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM songs
        WHERE ? = '' OR instr(name, ?) > 0 OR instr(lyrics, ?) > 0
        "#,
    )
    .bind(filter)
    .bind(filter)
    .bind(filter)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// One page of songs matching `filter`
pub async fn search_songs_page(
    pool: &SqlitePool,
    filter: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Song>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, lyrics, duration, created_at, updated_at
        FROM songs
        WHERE ? = '' OR instr(name, ?) > 0 OR instr(lyrics, ?) > 0
        ORDER BY id ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(filter)
    .bind(filter)
    .bind(filter)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(song_from_row).collect())
}

/// [`SongLookup`] backed by the SQLite catalog
#[derive(Clone)]
pub struct SqliteSongs {
    pool: SqlitePool,
}

impl SqliteSongs {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SongLookup for SqliteSongs {
    async fn fetch_song(&self, id: i64) -> Result<Option<Song>> {
        load_song(&self.pool, id).await
    }
}
