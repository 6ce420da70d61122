//! Event synchronization bridge
//!
//! Turns the raw manager event stream into de-flickered snapshots for the UI.
//!
//! ```text
//!   PlaybackManager ──PlayerEvent──▶ SyncBridge ──watch──▶ UI
//!                                       │
//!                                  switch guard
//! ```
//!
//! The bridge owns the only mutable copy of the published snapshots. While a
//! track switch is in flight it holds back non-definitive statuses so the UI
//! does not blink through Loading/Stopped between two playing tracks.

use crate::events::PlayerEvent;
use crate::switching::{sleep_until_deadline, SwitchGuard};
use crate::types::{CurrentTrack, PlayerStateSnapshot, PlayerStatus, QueueSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, trace};

/// De-flickering snapshot publisher
pub struct SyncBridge {
    /// Latest state, minus any held status
    state: PlayerStateSnapshot,

    /// Latest queue
    queue: QueueSnapshot,

    /// Bridge-side switching guard
    guard: SwitchGuard,

    /// Most recent non-definitive status seen while the guard was raised
    held_status: Option<PlayerStatus>,

    player_tx: watch::Sender<PlayerStateSnapshot>,
    queue_tx: watch::Sender<QueueSnapshot>,
}

impl SyncBridge {
    /// Create a bridge publishing `initial` state and queue
    pub fn new(initial: PlayerStateSnapshot, queue: QueueSnapshot, switch_timeout: Duration) -> Self {
        let (player_tx, _) = watch::channel(initial.clone());
        let (queue_tx, _) = watch::channel(queue.clone());
        Self {
            state: initial,
            queue,
            guard: SwitchGuard::new(switch_timeout),
            held_status: None,
            player_tx,
            queue_tx,
        }
    }

    /// Receiver for player snapshots
    pub fn subscribe_player(&self) -> watch::Receiver<PlayerStateSnapshot> {
        self.player_tx.subscribe()
    }

    /// Receiver for queue snapshots
    pub fn subscribe_queue(&self) -> watch::Receiver<QueueSnapshot> {
        self.queue_tx.subscribe()
    }

    /// Whether the bridge is currently smoothing over a switch
    pub fn is_switching(&self) -> bool {
        self.guard.is_active()
    }

    /// When the guard will force-release, if raised
    pub fn deadline(&self) -> Option<Instant> {
        self.guard.deadline()
    }

    /// Apply one manager event and publish whatever changed
    pub fn apply(&mut self, event: &PlayerEvent, now: Instant) {
        trace!(event = event.name(), "Bridge received event");

        match event {
            PlayerEvent::TrackChanging { current } => {
                self.guard.engage(now);
                self.set_current(Some(current.clone()));
                self.state.error = None;
            }

            PlayerEvent::StatusChanged { status } => {
                if self.guard.is_active() && !status.is_definitive() {
                    debug!(?status, "Holding non-definitive status during switch");
                    self.held_status = Some(*status);
                } else {
                    if status.is_definitive() {
                        self.guard.release();
                    }
                    self.held_status = None;
                    self.state.status = *status;
                }
            }

            PlayerEvent::DeviceStateChanged { playing, paused } => {
                if !playing && !paused {
                    trace!("Discarding indeterminate device state");
                } else if self.guard.release() {
                    self.held_status = None;
                    self.state.status = if *playing {
                        PlayerStatus::Playing
                    } else {
                        PlayerStatus::Paused
                    };
                }
            }

            PlayerEvent::PositionChanged { position } => {
                self.state.position_ms = position.to_millis();
            }

            PlayerEvent::MetadataLoaded { duration_ms } => {
                if duration_ms.is_some() {
                    self.state.duration_ms = *duration_ms;
                }
                self.release_guard();
            }

            PlayerEvent::VolumeChanged { volume, muted } => {
                self.state.volume = *volume;
                self.state.muted = *muted;
            }

            PlayerEvent::ModeChanged { mode } => {
                self.state.mode = *mode;
            }

            PlayerEvent::TrackFinished { .. } | PlayerEvent::SwitchingCleared => {
                self.release_guard();
            }

            PlayerEvent::QueueChanged { queue } => {
                let current = queue.current_index.and_then(|index| {
                    queue.entries.get(index).map(|entry| CurrentTrack {
                        index,
                        entry_id: entry.id,
                        track: Arc::clone(&entry.track),
                    })
                });
                self.set_current(current);
                self.queue = queue.clone();
            }

            PlayerEvent::Error { failure } => {
                self.guard.release();
                self.held_status = None;
                self.state.status = PlayerStatus::Error;
                self.state.error = Some(failure.clone());
            }
        }

        self.publish();
    }

    /// Force-release the guard if its deadline has passed
    ///
    /// Returns whether anything was released.
    pub fn on_deadline(&mut self, now: Instant) -> bool {
        if !self.guard.expired(now) {
            return false;
        }

        debug!("Bridge switch guard timed out, publishing last known state");
        self.release_guard();
        self.publish();
        true
    }

    /// Consume events until the manager goes away
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<PlayerEvent>) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.apply(&event, Instant::now()),
                    None => break,
                },
                () = sleep_until_deadline(self.guard.deadline()) => {
                    self.on_deadline(Instant::now());
                }
            }
        }

        debug!("Sync bridge stopped");
    }

    fn release_guard(&mut self) {
        if self.guard.release() {
            if let Some(status) = self.held_status.take() {
                self.state.status = status;
            }
        }
        self.held_status = None;
    }

    fn set_current(&mut self, current: Option<CurrentTrack>) {
        let previous_entry = self.state.current.as_ref().map(|c| c.entry_id);
        let next_entry = current.as_ref().map(|c| c.entry_id);

        if previous_entry != next_entry {
            self.state.position_ms = 0;
            self.state.duration_ms = current.as_ref().and_then(|c| c.track.duration_ms);
        }
        self.state.current = current;
    }

    fn publish(&mut self) {
        self.state.switching = self.guard.is_active();

        let state = &self.state;
        self.player_tx.send_if_modified(|published| {
            if published == state {
                false
            } else {
                *published = state.clone();
                true
            }
        });

        let queue = &self.queue;
        self.queue_tx.send_if_modified(|published| {
            if published == queue {
                false
            } else {
                *published = queue.clone();
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlaybackFailure, QueueEntrySnapshot};
    use encore_core::{DevicePosition, TrackId, TrackIdentity};

    const TIMEOUT: Duration = Duration::from_millis(3000);

    fn playing_bridge() -> SyncBridge {
        let initial = PlayerStateSnapshot {
            status: PlayerStatus::Playing,
            ..Default::default()
        };
        SyncBridge::new(initial, QueueSnapshot::default(), TIMEOUT)
    }

    fn current(index: usize, id: u64) -> CurrentTrack {
        CurrentTrack {
            index,
            entry_id: crate::types::QueueEntryId(id),
            track: Arc::new(TrackIdentity::new(format!("t{id}"), "Song").with_duration_ms(200_000)),
        }
    }

    fn status(status: PlayerStatus) -> PlayerEvent {
        PlayerEvent::StatusChanged { status }
    }

    #[test]
    fn holds_loading_during_switch() {
        let now = Instant::now();
        let mut bridge = playing_bridge();
        let rx = bridge.subscribe_player();

        bridge.apply(&PlayerEvent::TrackChanging { current: current(1, 7) }, now);
        bridge.apply(&status(PlayerStatus::Loading), now);

        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.status, PlayerStatus::Playing);
        assert!(snapshot.switching);
        assert_eq!(snapshot.current.unwrap().entry_id.value(), 7);
        assert_eq!(snapshot.duration_ms, Some(200_000));
    }

    #[test]
    fn definitive_status_releases_guard() {
        let now = Instant::now();
        let mut bridge = playing_bridge();
        let rx = bridge.subscribe_player();

        bridge.apply(&PlayerEvent::TrackChanging { current: current(0, 1) }, now);
        bridge.apply(&status(PlayerStatus::Loading), now);
        bridge.apply(&status(PlayerStatus::Paused), now);

        assert!(!bridge.is_switching());
        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.status, PlayerStatus::Paused);
        assert!(!snapshot.switching);
    }

    #[test]
    fn indeterminate_device_state_is_discarded() {
        let now = Instant::now();
        let mut bridge = playing_bridge();
        let mut rx = bridge.subscribe_player();
        rx.borrow_and_update();

        bridge.apply(
            &PlayerEvent::DeviceStateChanged {
                playing: false,
                paused: false,
            },
            now,
        );
        assert!(!rx.has_changed().unwrap());

        bridge.apply(&PlayerEvent::TrackChanging { current: current(0, 1) }, now);
        bridge.apply(
            &PlayerEvent::DeviceStateChanged {
                playing: false,
                paused: false,
            },
            now,
        );
        assert!(bridge.is_switching());

        bridge.apply(
            &PlayerEvent::DeviceStateChanged {
                playing: true,
                paused: false,
            },
            now,
        );
        assert!(!bridge.is_switching());
        assert_eq!(rx.borrow().status, PlayerStatus::Playing);
    }

    #[test]
    fn deadline_publishes_held_status() {
        let now = Instant::now();
        let mut bridge = playing_bridge();
        let rx = bridge.subscribe_player();

        bridge.apply(&PlayerEvent::TrackChanging { current: current(0, 1) }, now);
        bridge.apply(&status(PlayerStatus::Loading), now);

        assert!(!bridge.on_deadline(now + Duration::from_millis(2999)));
        assert!(rx.borrow().switching);

        assert!(bridge.on_deadline(now + TIMEOUT));
        let snapshot = rx.borrow().clone();
        assert!(!snapshot.switching);
        assert_eq!(snapshot.status, PlayerStatus::Loading);
        assert!(bridge.deadline().is_none());
    }

    #[test]
    fn switching_cleared_publishes_held_stop() {
        let now = Instant::now();
        let mut bridge = playing_bridge();
        let rx = bridge.subscribe_player();

        bridge.apply(&PlayerEvent::TrackChanging { current: current(0, 1) }, now);
        bridge.apply(&status(PlayerStatus::Stopped), now);
        assert_eq!(rx.borrow().status, PlayerStatus::Playing);

        bridge.apply(&PlayerEvent::SwitchingCleared, now);
        assert_eq!(rx.borrow().status, PlayerStatus::Stopped);
    }

    #[test]
    fn metadata_releases_guard_and_sets_duration() {
        let now = Instant::now();
        let mut bridge = playing_bridge();
        let rx = bridge.subscribe_player();

        bridge.apply(&PlayerEvent::TrackChanging { current: current(0, 1) }, now);
        bridge.apply(
            &PlayerEvent::MetadataLoaded {
                duration_ms: Some(123_000),
            },
            now,
        );

        let snapshot = rx.borrow().clone();
        assert!(!snapshot.switching);
        assert_eq!(snapshot.duration_ms, Some(123_000));
    }

    #[test]
    fn error_is_always_definitive() {
        let now = Instant::now();
        let mut bridge = playing_bridge();
        let rx = bridge.subscribe_player();

        bridge.apply(&PlayerEvent::TrackChanging { current: current(0, 1) }, now);
        bridge.apply(&status(PlayerStatus::Error), now);
        let failure = PlaybackFailure::ResolutionFailed {
            track_id: TrackId::new("t1"),
            reason: "gone".to_string(),
        };
        bridge.apply(
            &PlayerEvent::Error {
                failure: failure.clone(),
            },
            now,
        );

        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.status, PlayerStatus::Error);
        assert_eq!(snapshot.error, Some(failure));
        assert!(!snapshot.switching);
    }

    #[test]
    fn position_is_normalized() {
        let now = Instant::now();
        let mut bridge = playing_bridge();
        let rx = bridge.subscribe_player();

        bridge.apply(
            &PlayerEvent::PositionChanged {
                position: DevicePosition::new(12, 0.345),
            },
            now,
        );
        assert_eq!(rx.borrow().position_ms, 12_345);
    }

    #[test]
    fn queue_changes_publish_only_when_different() {
        let now = Instant::now();
        let mut bridge = playing_bridge();
        let mut queue_rx = bridge.subscribe_queue();
        let player_rx = bridge.subscribe_player();
        queue_rx.borrow_and_update();

        let track = Arc::new(TrackIdentity::new("a", "A"));
        let queue = QueueSnapshot {
            entries: vec![QueueEntrySnapshot {
                id: crate::types::QueueEntryId(3),
                track,
            }],
            current_index: Some(0),
        };

        bridge.apply(
            &PlayerEvent::QueueChanged {
                queue: queue.clone(),
            },
            now,
        );
        assert!(queue_rx.has_changed().unwrap());
        queue_rx.borrow_and_update();
        assert_eq!(player_rx.borrow().current.as_ref().unwrap().index, 0);

        bridge.apply(&PlayerEvent::QueueChanged { queue }, now);
        assert!(!queue_rx.has_changed().unwrap());
    }
}
