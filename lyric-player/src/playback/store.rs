//! Single-slot session store
//!
//! Holds at most one [`PlaybackSession`]. Controller writes (`set`, `delete`)
//! bump the store epoch; ticker writes go through `replace_if_current`, which
//! only succeeds while the epoch the ticker was started with is still current.
//! A tick computed before a controller transition therefore can never
//! overwrite the controller's fresher record.

use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::session::PlaybackSession;

/// Store write generation
pub type Epoch = u64;

/// Lifetime of a stored session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Kept until replaced or deleted
    Never,
    /// Reads as absent once the duration has elapsed
    After(Duration),
}

impl Expiry {
    fn deadline(self) -> Option<Instant> {
        match self {
            Expiry::Never => None,
            Expiry::After(ttl) => Some(Instant::now() + ttl),
        }
    }
}

#[derive(Debug)]
struct Entry {
    session: PlaybackSession,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<Entry>,
    epoch: Epoch,
}

impl Slot {
    fn live_entry(&mut self) -> Option<&mut Entry> {
        if self.entry.as_ref().is_some_and(Entry::is_expired) {
            self.entry = None;
        }
        self.entry.as_mut()
    }
}

/// Process-wide "now playing" slot
#[derive(Debug, Default)]
pub struct SessionStore {
    slot: RwLock<Slot>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session, if any and not expired
    pub async fn get(&self) -> Option<PlaybackSession> {
        {
            let slot = self.slot.read().await;
            match &slot.entry {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.session.clone()),
                Some(_) => {}
            }
        }

        // Expired: purge under the write lock
        let mut slot = self.slot.write().await;
        slot.live_entry().map(|entry| entry.session.clone())
    }

    /// Replace the session and return the new epoch
    pub async fn set(&self, session: PlaybackSession, expiry: Expiry) -> Epoch {
        let mut slot = self.slot.write().await;
        slot.epoch += 1;
        slot.entry = Some(Entry {
            session,
            expires_at: expiry.deadline(),
        });
        slot.epoch
    }

    /// Remove the session (no-op when empty); invalidates outstanding epochs
    pub async fn delete(&self) {
        let mut slot = self.slot.write().await;
        slot.epoch += 1;
        slot.entry = None;
    }

    /// Session as long as `epoch` is still current
    pub async fn get_if_current(&self, epoch: Epoch) -> Option<PlaybackSession> {
        let mut slot = self.slot.write().await;
        if slot.epoch != epoch {
            return None;
        }
        slot.live_entry().map(|entry| entry.session.clone())
    }

    /// Write `session` only if `epoch` is still current and a session exists.
    ///
    /// Does not bump the epoch. Returns `false` when the write was rejected.
    pub async fn replace_if_current(
        &self,
        epoch: Epoch,
        session: PlaybackSession,
        expiry: Expiry,
    ) -> bool {
        let mut slot = self.slot.write().await;
        if slot.epoch != epoch {
            return false;
        }
        match slot.live_entry() {
            Some(entry) => {
                entry.session = session;
                entry.expires_at = expiry.deadline();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::session::PlayState;

    fn session(song_id: i64, progress: f64) -> PlaybackSession {
        PlaybackSession {
            song_id,
            name: format!("song-{}", song_id),
            lyrics: "la la la".to_string(),
            duration: 10.0,
            progress,
            speed: 1.0,
            play_state: PlayState::Playing,
        }
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = SessionStore::new();
        assert!(store.get().await.is_none());
        assert_eq!(store.slot.read().await.epoch, 0);
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = SessionStore::new();

        let epoch = store.set(session(1, 0.0), Expiry::Never).await;
        assert_eq!(epoch, 1);
        assert_eq!(store.get().await.unwrap().song_id, 1);

        store.delete().await;
        assert!(store.get().await.is_none());
        assert_eq!(store.slot.read().await.epoch, 2);
    }

    #[tokio::test]
    async fn test_replace_if_current_accepts_matching_epoch() {
        let store = SessionStore::new();
        let epoch = store.set(session(1, 0.0), Expiry::Never).await;

        assert!(store.replace_if_current(epoch, session(1, 0.1), Expiry::Never).await);
        assert_eq!(store.get().await.unwrap().progress, 0.1);
        // Ticker writes do not move the epoch
        assert_eq!(store.slot.read().await.epoch, epoch);
    }

    #[tokio::test]
    async fn test_stale_write_rejected_after_controller_write() {
        let store = SessionStore::new();
        let stale = store.set(session(1, 0.0), Expiry::Never).await;

        // Controller transition happens while a tick is in flight
        let mut paused = session(1, 0.0);
        paused.play_state = PlayState::Paused;
        store.set(paused, Expiry::Never).await;

        assert!(!store.replace_if_current(stale, session(1, 5.0), Expiry::Never).await);
        let current = store.get().await.unwrap();
        assert_eq!(current.play_state, PlayState::Paused);
        assert_eq!(current.progress, 0.0);
        assert!(store.get_if_current(stale).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_write_rejected_after_delete() {
        let store = SessionStore::new();
        let epoch = store.set(session(1, 0.0), Expiry::Never).await;
        store.delete().await;

        assert!(!store.replace_if_current(epoch, session(1, 0.1), Expiry::Never).await);
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let store = SessionStore::new();
        let epoch = store
            .set(session(1, 0.0), Expiry::After(Duration::from_millis(20)))
            .await;
        assert!(store.get().await.is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.get().await.is_none());
        assert!(store.get_if_current(epoch).await.is_none());
        assert!(!store.replace_if_current(epoch, session(1, 0.1), Expiry::Never).await);
    }
}
