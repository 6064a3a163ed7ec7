//! Playback session record and request types

use serde::{Deserialize, Serialize};

use crate::db::songs::Song;

/// Playback state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Playing,
    Paused,
    Stopped,
}

impl PlayState {
    /// Numeric code used by the `is_playing` wire field (1=Play, 0=Pause, 2=Stop)
    pub fn code(self) -> u8 {
        match self {
            PlayState::Paused => 0,
            PlayState::Playing => 1,
            PlayState::Stopped => 2,
        }
    }
}

/// Requested transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAction {
    Play,
    Pause,
    Stop,
}

impl PlayAction {
    /// Parse the `is_playing` wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PlayAction::Pause),
            1 => Some(PlayAction::Play),
            2 => Some(PlayAction::Stop),
            _ => None,
        }
    }
}

/// The single "now playing" record
///
/// `name`, `lyrics` and `duration` are a snapshot of the song taken when
/// playback was (re)started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub song_id: i64,
    pub name: String,
    pub lyrics: String,
    /// Seconds
    pub duration: f64,
    /// Seconds elapsed, never above `duration`
    pub progress: f64,
    pub speed: f64,
    pub play_state: PlayState,
}

impl PlaybackSession {
    /// Fresh session for `song` at zero progress
    pub fn from_song(song: &Song, play_state: PlayState) -> Self {
        Self {
            song_id: song.id,
            name: song.name.clone(),
            lyrics: song.lyrics.clone(),
            duration: song.duration,
            progress: 0.0,
            speed: 1.0,
            play_state,
        }
    }

    /// Replace the metadata snapshot, keeping progress and speed
    pub fn refresh_metadata(&mut self, song: &Song) {
        self.name = song.name.clone();
        self.lyrics = song.lyrics.clone();
        self.duration = song.duration;
        self.progress = self.progress.min(self.duration);
    }

    /// Whether progress has reached the end of the song
    pub fn is_finished(&self) -> bool {
        self.progress >= self.duration
    }
}

/// Round to two decimal places
pub fn round_progress(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
