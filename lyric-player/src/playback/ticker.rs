//! Progress ticker
//!
//! Background task that advances the session's progress on a fixed period.
//! The ticker owns no session state of its own: each tick reads the record
//! for its epoch from the [`SessionStore`], advances it, and writes it back
//! with a compare-and-swap on that epoch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lyric_common::config::PlaybackConfig;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::{round_progress, PlayState};
use super::store::{Epoch, Expiry, SessionStore};

/// Tick timing and terminal record policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerConfig {
    /// Time between ticks
    pub period: Duration,
    /// Progress added per tick at speed 1.0
    pub step: f64,
    /// Expiry of the terminal record written when the song finishes
    pub finished_expiry: Expiry,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(100),
            step: 0.1,
            finished_expiry: Expiry::Never,
        }
    }
}

impl From<&PlaybackConfig> for TickerConfig {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            period: Duration::from_millis(config.tick_interval_ms),
            step: config.step_size,
            finished_expiry: config
                .finished_session_ttl_secs
                .map(|secs| Expiry::After(Duration::from_secs(secs)))
                .unwrap_or(Expiry::Never),
        }
    }
}

/// Why a ticker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerExit {
    /// Progress reached the song duration; terminal record written
    Completed,
    /// Cancellation token fired
    Cancelled,
    /// The session was replaced or removed underneath the ticker
    Superseded,
}

/// Counts ticker tasks currently running
#[derive(Debug, Clone, Default)]
pub struct LiveTickers(Arc<AtomicUsize>);

impl LiveTickers {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn enter(&self) -> LiveGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        LiveGuard(self.0.clone())
    }
}

/// Decrements the live count when the ticker task ends, however it ends
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to a spawned ticker
#[derive(Debug)]
pub struct TickerHandle {
    pub epoch: Epoch,
    token: CancellationToken,
    task: JoinHandle<TickerExit>,
}

impl TickerHandle {
    /// Signal cancellation and wait until the task has fully exited
    pub async fn retire(self) -> TickerExit {
        self.token.cancel();
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => {
                warn!(epoch = self.epoch, error = %e, "Progress ticker task failed");
                TickerExit::Cancelled
            }
        }
    }
}

/// Spawn a ticker bound to the session written at `epoch`
pub fn spawn_ticker(
    store: Arc<SessionStore>,
    epoch: Epoch,
    config: TickerConfig,
    live: &LiveTickers,
) -> TickerHandle {
    let token = CancellationToken::new();
    // Counted before the task is scheduled so a handle never exists uncounted
    let guard = live.enter();
    let task = tokio::spawn(run_ticker(store, epoch, config, token.clone(), guard));

    TickerHandle { epoch, token, task }
}

async fn run_ticker(
    store: Arc<SessionStore>,
    epoch: Epoch,
    config: TickerConfig,
    token: CancellationToken,
    _guard: LiveGuard,
) -> TickerExit {
    debug!(epoch, period_ms = config.period.as_millis() as u64, "Progress ticker started");

    let mut interval = tokio::time::interval_at(
        tokio::time::Instant::now() + config.period,
        config.period,
    );
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let exit = loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break TickerExit::Cancelled,
            _ = interval.tick() => {}
        }

        match tick(&store, epoch, &config, &token).await {
            Some(exit) => break exit,
            None => continue,
        }
    };

    match exit {
        TickerExit::Completed => info!(epoch, "Playback finished"),
        TickerExit::Superseded => warn!(epoch, "Session changed under ticker, stopping"),
        TickerExit::Cancelled => debug!(epoch, "Progress ticker cancelled"),
    }

    exit
}

/// One tick. Returns `Some` when the ticker must stop.
async fn tick(
    store: &SessionStore,
    epoch: Epoch,
    config: &TickerConfig,
    token: &CancellationToken,
) -> Option<TickerExit> {
    if token.is_cancelled() {
        return Some(TickerExit::Cancelled);
    }

    let Some(mut session) = store.get_if_current(epoch).await else {
        return Some(TickerExit::Superseded);
    };

    if session.play_state != PlayState::Playing {
        // Paused in place without cancellation: idle until resumed or cancelled
        return None;
    }

    session.progress = round_progress(session.progress + config.step * session.speed);

    let finished = session.is_finished();
    let expiry = if finished {
        session.progress = session.duration;
        session.play_state = PlayState::Stopped;
        config.finished_expiry
    } else {
        Expiry::Never
    };

    if token.is_cancelled() {
        return Some(TickerExit::Cancelled);
    }

    if !store.replace_if_current(epoch, session, expiry).await {
        return Some(TickerExit::Superseded);
    }

    finished.then_some(TickerExit::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::session::PlaybackSession;

    fn fast_config() -> TickerConfig {
        TickerConfig {
            period: Duration::from_millis(10),
            ..TickerConfig::default()
        }
    }

    fn session(duration: f64, speed: f64, play_state: PlayState) -> PlaybackSession {
        PlaybackSession {
            song_id: 1,
            name: "test".to_string(),
            lyrics: "lyrics".to_string(),
            duration,
            progress: 0.0,
            speed,
            play_state,
        }
    }

    #[tokio::test]
    async fn test_ticker_advances_progress() {
        let store = Arc::new(SessionStore::new());
        let live = LiveTickers::default();
        let epoch = store.set(session(100.0, 1.0, PlayState::Playing), Expiry::Never).await;

        let handle = spawn_ticker(store.clone(), epoch, fast_config(), &live);
        assert_eq!(live.count(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        let progress = store.get().await.unwrap().progress;
        assert!(progress > 0.0, "progress should advance, got {}", progress);

        assert_eq!(handle.retire().await, TickerExit::Cancelled);
        assert_eq!(live.count(), 0);
    }

    #[tokio::test]
    async fn test_short_song_completes_after_one_tick() {
        let store = Arc::new(SessionStore::new());
        let live = LiveTickers::default();
        let epoch = store.set(session(0.2, 2.0, PlayState::Playing), Expiry::Never).await;

        let handle = spawn_ticker(store.clone(), epoch, fast_config(), &live);
        assert_eq!(handle.task.await.unwrap(), TickerExit::Completed);

        let finished = store.get().await.unwrap();
        assert_eq!(finished.play_state, PlayState::Stopped);
        assert_eq!(finished.progress, 0.2);
        assert_eq!(live.count(), 0);
    }

    #[tokio::test]
    async fn test_progress_clamped_to_duration() {
        let store = Arc::new(SessionStore::new());
        let live = LiveTickers::default();
        let epoch = store.set(session(0.15, 1.0, PlayState::Playing), Expiry::Never).await;

        let handle = spawn_ticker(store.clone(), epoch, fast_config(), &live);
        assert_eq!(handle.task.await.unwrap(), TickerExit::Completed);

        let finished = store.get().await.unwrap();
        assert_eq!(finished.progress, 0.15);
    }

    #[tokio::test]
    async fn test_paused_session_keeps_ticker_idle() {
        let store = Arc::new(SessionStore::new());
        let live = LiveTickers::default();
        let epoch = store.set(session(100.0, 1.0, PlayState::Paused), Expiry::Never).await;

        let handle = spawn_ticker(store.clone(), epoch, fast_config(), &live);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(!handle.task.is_finished());
        assert_eq!(store.get().await.unwrap().progress, 0.0);
        assert_eq!(handle.retire().await, TickerExit::Cancelled);
    }

    #[tokio::test]
    async fn test_controller_write_supersedes_ticker() {
        let store = Arc::new(SessionStore::new());
        let live = LiveTickers::default();
        let epoch = store.set(session(100.0, 1.0, PlayState::Playing), Expiry::Never).await;

        let handle = spawn_ticker(store.clone(), epoch, fast_config(), &live);
        store.set(session(100.0, 1.0, PlayState::Paused), Expiry::Never).await;

        assert_eq!(handle.task.await.unwrap(), TickerExit::Superseded);
        assert_eq!(store.get().await.unwrap().progress, 0.0);
    }

    #[tokio::test]
    async fn test_finished_record_uses_configured_expiry() {
        let store = Arc::new(SessionStore::new());
        let live = LiveTickers::default();
        let epoch = store.set(session(0.1, 1.0, PlayState::Playing), Expiry::Never).await;

        let config = TickerConfig {
            finished_expiry: Expiry::After(Duration::from_millis(30)),
            ..fast_config()
        };
        let handle = spawn_ticker(store.clone(), epoch, config, &live);
        assert_eq!(handle.task.await.unwrap(), TickerExit::Completed);
        assert!(store.get().await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.get().await.is_none());
    }

    #[test]
    fn test_config_from_playback_settings() {
        let settings = PlaybackConfig {
            tick_interval_ms: 250,
            step_size: 0.5,
            finished_session_ttl_secs: Some(5),
        };
        let config = TickerConfig::from(&settings);
        assert_eq!(config.period, Duration::from_millis(250));
        assert_eq!(config.step, 0.5);
        assert_eq!(config.finished_expiry, Expiry::After(Duration::from_secs(5)));
    }
}
