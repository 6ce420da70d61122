//! Public command and subscription surface
//!
//! `PlaybackHandle` is a cheap, cloneable front for the manager actor. Every
//! command is a message with a oneshot reply, so callers on any task see the
//! same serialized order of effects.

use crate::bridge::SyncBridge;
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::events::PlayerEvent;
use crate::manager::{Command, PlaybackManager, Reply};
use crate::types::{
    NavigationOutcome, PlayMode, PlayerStateSnapshot, QueueEntryId, QueueEntrySnapshot,
    QueueSnapshot,
};
use encore_core::{DeviceEvent, PlaybackDevice, StreamResolver, TrackIdentity};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::info;

/// Start the playback manager and its sync bridge
///
/// `device_events` is the channel the device sends its events on. Must be
/// called from within a Tokio runtime.
///
/// # Errors
/// Returns `PlaybackError::Config` if `config` is invalid
pub fn spawn(
    config: PlayerConfig,
    resolver: Arc<dyn StreamResolver>,
    device: Arc<dyn PlaybackDevice>,
    device_events: mpsc::UnboundedReceiver<DeviceEvent>,
) -> Result<PlaybackHandle> {
    config.validate()?;

    let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
    let (events_tx, _) = broadcast::channel(config.event_capacity);
    let (bridge_tx, bridge_rx) = mpsc::unbounded_channel();

    let switch_timeout = config.switch_timeout();
    let (manager, resolutions_rx) =
        PlaybackManager::new(config, resolver, device, bridge_tx, events_tx.clone());

    let bridge = SyncBridge::new(manager.snapshot(), QueueSnapshot::default(), switch_timeout);
    let player = bridge.subscribe_player();
    let queue = bridge.subscribe_queue();

    tokio::spawn(bridge.run(bridge_rx));
    tokio::spawn(manager.run(command_rx, resolutions_rx, device_events));
    info!("Playback started");

    Ok(PlaybackHandle {
        commands: command_tx,
        player,
        queue,
        events: events_tx,
    })
}

/// Handle to a running playback manager
#[derive(Clone)]
pub struct PlaybackHandle {
    commands: mpsc::Sender<Command>,
    player: watch::Receiver<PlayerStateSnapshot>,
    queue: watch::Receiver<QueueSnapshot>,
    events: broadcast::Sender<PlayerEvent>,
}

impl PlaybackHandle {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| PlaybackError::ManagerClosed)?;
        response.await.map_err(|_| PlaybackError::ManagerClosed)?
    }

    // ===== Playback Control =====

    /// Play `track`, locating it in the queue or appending it
    ///
    /// Returns the queue index that is now current.
    pub async fn play_track(&self, track: TrackIdentity) -> Result<usize> {
        self.request(|reply| Command::PlayTrack { track, reply }).await
    }

    /// Insert `track` right after the current entry and play it
    pub async fn play_now(&self, track: TrackIdentity) -> Result<usize> {
        self.request(|reply| Command::PlayNow { track, reply }).await
    }

    /// Start the current (or first) entry, or resume if paused
    pub async fn play(&self) -> Result<()> {
        self.request(|reply| Command::Play { reply }).await
    }

    /// Pause playback (no-op if already paused)
    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| Command::Pause { reply }).await
    }

    /// Resume playback (no-op if already playing)
    pub async fn resume(&self) -> Result<()> {
        self.request(|reply| Command::Resume { reply }).await
    }

    /// Stop playback and release the device
    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Seek within the current track
    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        self.request(|reply| Command::Seek { position_ms, reply })
            .await
    }

    /// Skip to the next track per the current mode
    pub async fn next(&self) -> Result<NavigationOutcome> {
        self.request(|reply| Command::Next { reply }).await
    }

    /// Go back per the current mode, or restart the current track
    pub async fn previous(&self) -> Result<NavigationOutcome> {
        self.request(|reply| Command::Previous { reply }).await
    }

    /// Jump to the entry at `index` and play it
    pub async fn skip_to(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::SkipTo { index, reply }).await
    }

    // ===== Volume =====

    /// Set volume level (0.0-1.0, clamped)
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.request(|reply| Command::SetVolume { volume, reply })
            .await
    }

    /// Mute or unmute
    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        self.request(|reply| Command::SetMuted { muted, reply }).await
    }

    /// Toggle mute; returns the new mute state
    pub async fn toggle_mute(&self) -> Result<bool> {
        self.request(|reply| Command::ToggleMute { reply }).await
    }

    // ===== Mode =====

    /// Set the play mode
    pub async fn set_mode(&self, mode: PlayMode) -> Result<()> {
        self.request(|reply| Command::SetMode { mode, reply }).await
    }

    /// Advance to the next play mode; returns it
    pub async fn cycle_mode(&self) -> Result<PlayMode> {
        self.request(|reply| Command::CycleMode { reply }).await
    }

    // ===== Queue Management =====

    /// Append tracks to the queue
    pub async fn add_to_queue(&self, tracks: Vec<TrackIdentity>) -> Result<Vec<QueueEntryId>> {
        self.request(|reply| Command::AddToQueue { tracks, reply })
            .await
    }

    /// Remove the entry at `index`
    pub async fn remove_from_queue(&self, index: usize) -> Result<QueueEntrySnapshot> {
        self.request(|reply| Command::RemoveFromQueue { index, reply })
            .await
    }

    /// Empty the queue and stop playback
    pub async fn clear_queue(&self) -> Result<()> {
        self.request(|reply| Command::ClearQueue { reply }).await
    }

    /// Shuffle the queue, keeping the current entry in place
    pub async fn shuffle_queue(&self) -> Result<()> {
        self.request(|reply| Command::ShuffleQueue { reply }).await
    }

    /// Move the entry at `from` to `to`
    pub async fn reorder_queue(&self, from: usize, to: usize) -> Result<()> {
        self.request(|reply| Command::ReorderQueue { from, to, reply })
            .await
    }

    // ===== Queries =====

    /// Manager-side state, without bridge smoothing
    pub async fn state(&self) -> Result<PlayerStateSnapshot> {
        self.request(|reply| Command::GetState { reply }).await
    }

    /// Current queue contents
    pub async fn queue(&self) -> Result<QueueSnapshot> {
        self.request(|reply| Command::GetQueue { reply }).await
    }

    /// Stop playback and end the manager task
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    // ===== Subscriptions =====

    /// De-flickered player snapshots
    pub fn player_snapshots(&self) -> watch::Receiver<PlayerStateSnapshot> {
        self.player.clone()
    }

    /// Queue snapshots
    pub fn queue_snapshots(&self) -> watch::Receiver<QueueSnapshot> {
        self.queue.clone()
    }

    /// Raw manager events, not debounced
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("closed", &self.commands.is_closed())
            .finish_non_exhaustive()
    }
}
