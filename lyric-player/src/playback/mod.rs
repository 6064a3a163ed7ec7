//! Playback progress coordination
//!
//! - [`store`]: single-slot session store with epoch-checked writes
//! - [`ticker`]: background task advancing progress on a fixed period
//! - [`coordinator`]: play/pause/stop transitions and ticker ownership

pub mod coordinator;
pub mod session;
pub mod store;
pub mod ticker;

pub use coordinator::{PlaybackCoordinator, PlaybackError, PlaybackRequest, SongLookup};
pub use session::{PlayAction, PlayState, PlaybackSession};
pub use store::{Epoch, Expiry, SessionStore};
pub use ticker::{TickerConfig, TickerExit};
