//! Encore - Playback Coordination
//!
//! Queue store, player state machine and UI event bridge for Encore.
//!
//! This crate provides:
//! - Queue store with a cursor that always points at a valid entry (or none)
//! - Play modes (Sequential, RepeatOne, RepeatAll, Shuffle with a stable order)
//! - Player state machine running as a single Tokio actor
//! - Stale-load rejection through generation tokens
//! - A switching guard that debounces rapid skips and always times out
//! - A sync bridge publishing de-flickered snapshots over `watch` channels
//!
//! # Architecture
//!
//! `encore-playback` does no I/O of its own. Stream resolution and audio output
//! come from the `StreamResolver` and `PlaybackDevice` traits in `encore-core`.
//!
//! ```text
//!   PlaybackHandle ──Command──▶ PlaybackManager ──PlayerEvent──▶ SyncBridge ──watch──▶ UI
//!                                 ▲        │
//!                 DeviceEvent ────┘        └── StreamResolver / PlaybackDevice
//! ```
//!
//! # Example: Queue Navigation
//!
//! ```rust
//! use encore_core::TrackIdentity;
//! use encore_playback::{PlayMode, Queue};
//!
//! let mut queue = Queue::new();
//! queue.append(vec![
//!     TrackIdentity::new("a", "First"),
//!     TrackIdentity::new("b", "Second"),
//! ]);
//! queue.set_current_index(Some(1)).unwrap();
//!
//! assert_eq!(queue.next(PlayMode::Sequential), None);
//! assert_eq!(queue.next(PlayMode::RepeatAll), Some(0));
//! ```
//!
//! # Example: Running the Player
//!
//! ```rust,no_run
//! use encore_core::{PlaybackDevice, StreamResolver, TrackIdentity};
//! use encore_playback::{spawn, PlayerConfig};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! # async fn run(resolver: Arc<dyn StreamResolver>, device: Arc<dyn PlaybackDevice>) -> encore_playback::Result<()> {
//! let (_device_tx, device_rx) = mpsc::unbounded_channel();
//! let player = spawn(PlayerConfig::default(), resolver, device, device_rx)?;
//!
//! player.play_track(TrackIdentity::new("42", "Hyperballad")).await?;
//!
//! let mut snapshots = player.player_snapshots();
//! snapshots.changed().await.ok();
//! println!("{:?}", snapshots.borrow().status);
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
mod error;
pub mod events;
mod handle;
mod manager;
pub mod queue;
mod shuffle;
pub mod switching;
pub mod types;
mod volume;

// Public exports
pub use bridge::SyncBridge;
pub use config::{PlayerConfig, ProviderSettings};
pub use error::{PlaybackError, Result};
pub use events::PlayerEvent;
pub use handle::{spawn, PlaybackHandle};
pub use queue::{Queue, QueueEntry};
pub use switching::{SwitchGuard, DEFAULT_SWITCH_TIMEOUT};
pub use types::{
    CurrentTrack, NavigationOutcome, PlayMode, PlaybackFailure, PlayerState, PlayerStateSnapshot,
    PlayerStatus, QueueEntryId, QueueEntrySnapshot, QueueSnapshot,
};
pub use volume::{Volume, DEFAULT_VOLUME};
