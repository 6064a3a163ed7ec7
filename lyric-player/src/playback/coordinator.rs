//! Playback controller
//!
//! Applies play/pause/stop requests to the single session and decides what
//! happens to the progress ticker. All transitions run under one async mutex
//! that also owns the live ticker's handle, so two concurrent requests can
//! never both start a ticker: the previous ticker is cancelled and awaited
//! before a new one is spawned. Transitions run on a spawned task and always
//! complete, even when the caller stops waiting.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::session::{PlayAction, PlayState, PlaybackSession};
use super::store::{Expiry, SessionStore};
use super::ticker::{spawn_ticker, LiveTickers, TickerConfig, TickerHandle};
use crate::db::songs::Song;

/// Song metadata source used by the controller
#[async_trait]
pub trait SongLookup: Send + Sync {
    /// Fetch a song by id; `Ok(None)` when it does not exist
    async fn fetch_song(&self, id: i64) -> lyric_common::Result<Option<Song>>;
}

/// Controller errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Malformed request (missing song id, bad speed, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No song with the requested id
    #[error("Song not found: {0}")]
    SongNotFound(i64),

    /// The song lookup itself failed
    #[error("Song lookup failed: {0}")]
    Lookup(#[from] lyric_common::Error),

    /// The transition task panicked or was aborted
    #[error("Playback transition failed: {0}")]
    Transition(String),
}

/// Inbound transition request
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub song_id: Option<i64>,
    pub action: PlayAction,
    /// New speed multiplier; keeps the current one when absent
    pub speed: Option<f64>,
    /// Seek position in seconds; keeps the current one when absent
    pub progress: Option<f64>,
}

impl PlaybackRequest {
    pub fn new(song_id: i64, action: PlayAction) -> Self {
        Self {
            song_id: Some(song_id),
            action,
            speed: None,
            progress: None,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Check field ranges and return the song id
    fn validate(&self) -> Result<i64, PlaybackError> {
        let song_id = match self.song_id {
            Some(id) if id > 0 => id,
            Some(id) => {
                return Err(PlaybackError::InvalidRequest(format!(
                    "song_id must be a positive integer, got {}",
                    id
                )))
            }
            None => {
                return Err(PlaybackError::InvalidRequest(
                    "song_id is required".to_string(),
                ))
            }
        };

        if let Some(speed) = self.speed {
            if !speed.is_finite() || speed < 0.0 {
                return Err(PlaybackError::InvalidRequest(format!(
                    "speed must be a non-negative number, got {}",
                    speed
                )));
            }
        }

        if let Some(progress) = self.progress {
            if !progress.is_finite() || progress < 0.0 {
                return Err(PlaybackError::InvalidRequest(format!(
                    "progress must be a non-negative number, got {}",
                    progress
                )));
            }
        }

        Ok(song_id)
    }

    /// Apply explicit speed and seek position to `session`
    fn apply_overrides(&self, session: &mut PlaybackSession) {
        if let Some(speed) = self.speed {
            session.speed = speed;
        }
        if let Some(progress) = self.progress {
            session.progress = progress.min(session.duration);
        }
    }
}

/// Owner of the "now playing" slot and its progress ticker
pub struct PlaybackCoordinator {
    songs: Arc<dyn SongLookup>,
    transitions: Arc<Transitions>,
}

/// State touched by transitions; shared with the task that runs them
struct Transitions {
    store: Arc<SessionStore>,
    ticker_config: TickerConfig,
    /// Transition lock; holds the live ticker (if any)
    active: Mutex<Option<TickerHandle>>,
    live: LiveTickers,
}

impl PlaybackCoordinator {
    pub fn new(songs: Arc<dyn SongLookup>, ticker_config: TickerConfig) -> Self {
        Self {
            songs,
            transitions: Arc::new(Transitions {
                store: Arc::new(SessionStore::new()),
                ticker_config,
                active: Mutex::new(None),
                live: LiveTickers::default(),
            }),
        }
    }

    /// Apply a play/pause/stop request
    ///
    /// Returns the resulting session, or `None` after a stop. Once the song
    /// lookup succeeds the transition runs on its own task, so dropping the
    /// returned future does not leave it half applied.
    pub async fn apply(
        &self,
        request: PlaybackRequest,
    ) -> Result<Option<PlaybackSession>, PlaybackError> {
        let song_id = request.validate()?;

        let song = self
            .songs
            .fetch_song(song_id)
            .await?
            .ok_or(PlaybackError::SongNotFound(song_id))?;

        let transitions = self.transitions.clone();
        tokio::spawn(async move { transitions.apply(request, song).await })
            .await
            .map_err(|e| PlaybackError::Transition(e.to_string()))
    }

    /// Current session, if any
    pub async fn current(&self) -> Option<PlaybackSession> {
        self.transitions.store.get().await
    }

    /// Number of ticker tasks currently running
    pub fn live_tickers(&self) -> usize {
        self.transitions.live.count()
    }

    /// Cancel and await the live ticker; the session is left as is
    pub async fn shutdown(&self) {
        let transitions = self.transitions.clone();
        let result = tokio::spawn(async move {
            let mut active = transitions.active.lock().await;
            retire(&mut active).await;
        })
        .await;

        if let Err(e) = result {
            warn!(error = %e, "Ticker shutdown task failed");
        }
    }
}

impl Transitions {
    async fn apply(&self, request: PlaybackRequest, song: Song) -> Option<PlaybackSession> {
        let song_id = song.id;
        let mut active = self.active.lock().await;

        // Retire before reading: no tick may land between the read and the write below
        retire(&mut active).await;

        let mut current = self.store.get().await;
        if let Some(existing) = &current {
            if existing.song_id != song_id {
                info!(from = existing.song_id, to = song_id, "Switching song");
                self.store.delete().await;
                current = None;
            }
        }

        match request.action {
            PlayAction::Play => {
                let mut session = match current {
                    Some(mut session) => {
                        session.refresh_metadata(&song);
                        session
                    }
                    None => PlaybackSession::from_song(&song, PlayState::Playing),
                };
                request.apply_overrides(&mut session);
                if request.progress.is_none() && session.is_finished() {
                    // Replay of a finished song starts over
                    session.progress = 0.0;
                }
                session.play_state = PlayState::Playing;

                let epoch = self.store.set(session.clone(), Expiry::Never).await;
                *active = Some(spawn_ticker(
                    self.store.clone(),
                    epoch,
                    self.ticker_config,
                    &self.live,
                ));

                info!(
                    song_id,
                    progress = session.progress,
                    speed = session.speed,
                    "Playback started"
                );
                Some(session)
            }
            PlayAction::Pause => {
                let mut session = match current {
                    Some(mut session) => {
                        session.refresh_metadata(&song);
                        session
                    }
                    None => PlaybackSession::from_song(&song, PlayState::Paused),
                };
                request.apply_overrides(&mut session);
                session.play_state = PlayState::Paused;

                self.store.set(session.clone(), Expiry::Never).await;

                info!(song_id, progress = session.progress, "Playback paused");
                Some(session)
            }
            PlayAction::Stop => {
                self.store.delete().await;

                info!(song_id, "Playback stopped");
                None
            }
        }
    }
}

/// Cancel the live ticker and wait for it to exit
async fn retire(active: &mut Option<TickerHandle>) {
    if let Some(handle) = active.take() {
        let epoch = handle.epoch;
        let exit = handle.retire().await;
        debug!(epoch, ?exit, "Ticker retired");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::time::Duration;

    struct MemorySongs(HashMap<i64, Song>);

    #[async_trait]
    impl SongLookup for MemorySongs {
        async fn fetch_song(&self, id: i64) -> lyric_common::Result<Option<Song>> {
            Ok(self.0.get(&id).cloned())
        }
    }

    fn song(id: i64, duration: f64) -> Song {
        let now = Utc::now();
        Song {
            id,
            name: format!("Song {}", id),
            lyrics: format!("lyrics of song {}", id),
            duration,
            created_at: now,
            updated_at: now,
        }
    }

    fn coordinator() -> PlaybackCoordinator {
        let songs = MemorySongs(
            [(1, song(1, 100.0)), (2, song(2, 100.0)), (3, song(3, 0.2))]
                .into_iter()
                .collect(),
        );
        let config = TickerConfig {
            period: Duration::from_millis(10),
            ..TickerConfig::default()
        };
        PlaybackCoordinator::new(Arc::new(songs), config)
    }

    #[tokio::test]
    async fn test_missing_song_id_rejected() {
        let coordinator = coordinator();
        let request = PlaybackRequest {
            song_id: None,
            action: PlayAction::Play,
            speed: None,
            progress: None,
        };

        let result = coordinator.apply(request).await;
        assert!(matches!(result, Err(PlaybackError::InvalidRequest(_))));
        assert!(coordinator.current().await.is_none());
    }

    #[tokio::test]
    async fn test_negative_speed_rejected() {
        let coordinator = coordinator();
        let request = PlaybackRequest::new(1, PlayAction::Play).with_speed(-1.0);

        let result = coordinator.apply(request).await;
        assert!(matches!(result, Err(PlaybackError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_unknown_song_leaves_session_untouched() {
        let coordinator = coordinator();
        coordinator
            .apply(PlaybackRequest::new(1, PlayAction::Pause))
            .await
            .unwrap();

        let result = coordinator.apply(PlaybackRequest::new(99, PlayAction::Play)).await;
        assert!(matches!(result, Err(PlaybackError::SongNotFound(99))));

        let current = coordinator.current().await.unwrap();
        assert_eq!(current.song_id, 1);
        assert_eq!(current.play_state, PlayState::Paused);
        assert_eq!(coordinator.live_tickers(), 0);
    }

    #[tokio::test]
    async fn test_play_starts_single_ticker() {
        let coordinator = coordinator();
        let session = coordinator
            .apply(PlaybackRequest::new(1, PlayAction::Play))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(session.play_state, PlayState::Playing);
        assert_eq!(session.name, "Song 1");
        assert_eq!(coordinator.live_tickers(), 1);

        // Replaying retires the old ticker first
        coordinator
            .apply(PlaybackRequest::new(1, PlayAction::Play))
            .await
            .unwrap();
        assert_eq!(coordinator.live_tickers(), 1);

        coordinator.shutdown().await;
        assert_eq!(coordinator.live_tickers(), 0);
    }

    #[tokio::test]
    async fn test_pause_without_session_creates_one() {
        let coordinator = coordinator();
        let session = coordinator
            .apply(PlaybackRequest::new(2, PlayAction::Pause))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(session.play_state, PlayState::Paused);
        assert_eq!(session.progress, 0.0);
        assert_eq!(coordinator.live_tickers(), 0);
    }

    #[tokio::test]
    async fn test_resume_keeps_progress_and_speed() {
        let coordinator = coordinator();
        coordinator
            .apply(
                PlaybackRequest::new(1, PlayAction::Pause)
                    .with_progress(12.5)
                    .with_speed(2.0),
            )
            .await
            .unwrap();

        let resumed = coordinator
            .apply(PlaybackRequest::new(1, PlayAction::Play))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resumed.progress, 12.5);
        assert_eq!(resumed.speed, 2.0);

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_seek_clamped_to_duration() {
        let coordinator = coordinator();
        let session = coordinator
            .apply(PlaybackRequest::new(1, PlayAction::Pause).with_progress(500.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.progress, 100.0);
    }

    #[tokio::test]
    async fn test_song_switch_discards_old_session() {
        let coordinator = coordinator();
        coordinator
            .apply(PlaybackRequest::new(1, PlayAction::Pause).with_progress(40.0).with_speed(3.0))
            .await
            .unwrap();

        let switched = coordinator
            .apply(PlaybackRequest::new(2, PlayAction::Pause))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(switched.song_id, 2);
        assert_eq!(switched.name, "Song 2");
        assert_eq!(switched.progress, 0.0);
        assert_eq!(switched.speed, 1.0);
    }

    #[tokio::test]
    async fn test_stop_removes_session() {
        let coordinator = coordinator();
        coordinator
            .apply(PlaybackRequest::new(1, PlayAction::Play))
            .await
            .unwrap();

        let result = coordinator
            .apply(PlaybackRequest::new(1, PlayAction::Stop))
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(coordinator.current().await.is_none());
        assert_eq!(coordinator.live_tickers(), 0);
    }

    #[tokio::test]
    async fn test_replay_after_completion_restarts() {
        let coordinator = coordinator();
        coordinator
            .apply(PlaybackRequest::new(3, PlayAction::Play).with_speed(2.0))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        let finished = coordinator.current().await.unwrap();
        assert_eq!(finished.play_state, PlayState::Stopped);
        assert_eq!(coordinator.live_tickers(), 0);

        let replay = coordinator
            .apply(PlaybackRequest::new(3, PlayAction::Play))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(replay.progress, 0.0);
        assert_eq!(replay.play_state, PlayState::Playing);

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_dropped_pause_request_still_applies() {
        let coordinator = coordinator();
        coordinator
            .apply(PlaybackRequest::new(1, PlayAction::Play))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Caller gives up after the first poll, as a disconnected client would
        tokio::select! {
            biased;
            _ = coordinator.apply(PlaybackRequest::new(1, PlayAction::Pause)) => {}
            _ = std::future::ready(()) => {}
        }

        tokio::time::sleep(Duration::from_millis(30)).await;
        let paused = coordinator.current().await.unwrap();
        assert_eq!(paused.play_state, PlayState::Paused);
        assert_eq!(coordinator.live_tickers(), 0);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(coordinator.current().await.unwrap().progress, paused.progress);
    }

    #[tokio::test]
    async fn test_dropped_play_request_still_starts_ticker() {
        let coordinator = coordinator();
        coordinator
            .apply(PlaybackRequest::new(1, PlayAction::Pause))
            .await
            .unwrap();

        tokio::select! {
            biased;
            _ = coordinator.apply(PlaybackRequest::new(1, PlayAction::Play)) => {}
            _ = std::future::ready(()) => {}
        }

        tokio::time::sleep(Duration::from_millis(60)).await;
        let playing = coordinator.current().await.unwrap();
        assert_eq!(playing.play_state, PlayState::Playing);
        assert!(playing.progress > 0.0);
        assert_eq!(coordinator.live_tickers(), 1);

        coordinator.shutdown().await;
    }
}
