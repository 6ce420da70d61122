//! Playback manager - core orchestration
//!
//! A single actor task owns the queue, the player state, the load generation
//! and the switching guard. Everything that mutates them arrives through its
//! `select!` loop:
//!
//! - commands from `PlaybackHandle` (each with a oneshot reply)
//! - stream resolution results from spawned resolver tasks
//! - device events
//! - the switching guard deadline
//!
//! Resolution runs off the actor so stop/volume/pause stay responsive while a
//! provider is slow. Device calls run inline, so commands that arrive during a
//! device load wait behind it.

use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::events::PlayerEvent;
use crate::queue::Queue;
use crate::switching::{sleep_until_deadline, SwitchGuard};
use crate::types::{
    CurrentTrack, NavigationOutcome, PlayMode, PlaybackFailure, PlayerState, PlayerStateSnapshot,
    PlayerStatus, QueueEntryId, QueueEntrySnapshot, QueueSnapshot,
};
use crate::volume::Volume;
use encore_core::{
    DeviceError, DeviceEvent, DeviceEventKind, DevicePosition, Generation, PlaybackDevice,
    ResolutionError, StreamHandle, StreamResolver, TrackIdentity,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// A report this close to a seek target confirms the device has moved there
const SEEK_SETTLE_WINDOW_MS: u64 = 1_000;

/// Off-target reports discarded before trusting the device again
const SEEK_SETTLE_MAX_SKIPS: u32 = 8;

/// Reply channel carried by every command
pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

/// Commands accepted by the manager actor
pub(crate) enum Command {
    PlayTrack {
        track: TrackIdentity,
        reply: Reply<usize>,
    },
    PlayNow {
        track: TrackIdentity,
        reply: Reply<usize>,
    },
    Play {
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    Stop {
        reply: Reply<()>,
    },
    Seek {
        position_ms: u64,
        reply: Reply<()>,
    },
    SetVolume {
        volume: f32,
        reply: Reply<()>,
    },
    SetMuted {
        muted: bool,
        reply: Reply<()>,
    },
    ToggleMute {
        reply: Reply<bool>,
    },
    Next {
        reply: Reply<NavigationOutcome>,
    },
    Previous {
        reply: Reply<NavigationOutcome>,
    },
    SkipTo {
        index: usize,
        reply: Reply<()>,
    },
    SetMode {
        mode: PlayMode,
        reply: Reply<()>,
    },
    CycleMode {
        reply: Reply<PlayMode>,
    },
    AddToQueue {
        tracks: Vec<TrackIdentity>,
        reply: Reply<Vec<QueueEntryId>>,
    },
    RemoveFromQueue {
        index: usize,
        reply: Reply<QueueEntrySnapshot>,
    },
    ClearQueue {
        reply: Reply<()>,
    },
    ShuffleQueue {
        reply: Reply<()>,
    },
    ReorderQueue {
        from: usize,
        to: usize,
        reply: Reply<()>,
    },
    GetState {
        reply: Reply<PlayerStateSnapshot>,
    },
    GetQueue {
        reply: Reply<QueueSnapshot>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// Outcome of one resolver call
enum ResolveOutcome {
    Resolved(StreamHandle),
    Failed(ResolutionError),
    TimedOut(Duration),
}

/// Resolver result, tagged with the generation it was started under
pub(crate) struct Resolution {
    generation: Generation,
    track: Arc<TrackIdentity>,
    outcome: ResolveOutcome,
}

/// Seek the device has not yet confirmed through a position report
///
/// Reports produced before the device reached the target can still be in
/// the event channel. Until one lands near the target they are discarded.
#[derive(Debug, Clone, Copy)]
struct SeekSettle {
    target_ms: u64,
    skipped: u32,
}

impl SeekSettle {
    fn new(target_ms: u64) -> Self {
        Self {
            target_ms,
            skipped: 0,
        }
    }

    fn lands(&self, position_ms: u64) -> bool {
        position_ms.abs_diff(self.target_ms) <= SEEK_SETTLE_WINDOW_MS
    }
}

/// Player state machine
pub(crate) struct PlaybackManager {
    config: PlayerConfig,
    queue: Queue,
    state: PlayerState,

    /// Bumped for every load attempt and on stop/failure
    generation: Generation,

    /// Controller-side switching guard (debounce + liveness)
    guard: SwitchGuard,

    /// Start output once the pending load completes
    autoplay: bool,

    /// Seek requested while loading, applied after load
    pending_seek: Option<u64>,

    /// Seek sent to the device, awaiting a matching position report
    seek_settle: Option<SeekSettle>,

    /// In-flight resolver task
    resolve_task: Option<JoinHandle<()>>,

    resolver: Arc<dyn StreamResolver>,
    device: Arc<dyn PlaybackDevice>,
    resolutions_tx: mpsc::UnboundedSender<Resolution>,

    /// Lossless feed for the sync bridge
    bridge_tx: mpsc::UnboundedSender<PlayerEvent>,

    /// Raw event fan-out for diagnostics
    events_tx: broadcast::Sender<PlayerEvent>,
}

impl PlaybackManager {
    /// Create a manager and the receiving end of its resolution channel
    pub(crate) fn new(
        config: PlayerConfig,
        resolver: Arc<dyn StreamResolver>,
        device: Arc<dyn PlaybackDevice>,
        bridge_tx: mpsc::UnboundedSender<PlayerEvent>,
        events_tx: broadcast::Sender<PlayerEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<Resolution>) {
        let (resolutions_tx, resolutions_rx) = mpsc::unbounded_channel();
        let state = PlayerState {
            volume: Volume::new(config.initial_volume),
            mode: config.initial_mode,
            ..Default::default()
        };

        let mut queue = Queue::new();
        if state.mode == PlayMode::Shuffle {
            queue.regenerate_play_order();
        }

        let manager = Self {
            guard: SwitchGuard::new(config.switch_timeout()),
            config,
            queue,
            state,
            generation: Generation::INITIAL,
            autoplay: false,
            pending_seek: None,
            seek_settle: None,
            resolve_task: None,
            resolver,
            device,
            resolutions_tx,
            bridge_tx,
            events_tx,
        };
        (manager, resolutions_rx)
    }

    /// Run the actor loop until shutdown or until every handle is dropped
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut resolutions: mpsc::UnboundedReceiver<Resolution>,
        mut device_events: mpsc::UnboundedReceiver<DeviceEvent>,
    ) {
        info!("Playback manager started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).await.is_break() {
                            break;
                        }
                    }
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(resolution) = resolutions.recv() => self.on_resolved(resolution).await,
                Some(event) = device_events.recv() => self.on_device_event(event).await,
                () = sleep_until_deadline(self.guard.deadline()) => self.on_switch_deadline(),
            }
        }

        info!("Playback manager stopped");
    }

    /// Apply one command; `Break` ends the actor loop
    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::PlayTrack { track, reply } => {
                let _ = reply.send(self.play_track(track).await);
            }
            Command::PlayNow { track, reply } => {
                let _ = reply.send(self.play_now(track));
            }
            Command::Play { reply } => {
                let _ = reply.send(self.play().await);
            }
            Command::Pause { reply } => {
                let _ = reply.send(self.pause().await);
            }
            Command::Resume { reply } => {
                let _ = reply.send(self.resume().await);
            }
            Command::Stop { reply } => {
                self.stop().await;
                let _ = reply.send(Ok(()));
            }
            Command::Seek { position_ms, reply } => {
                let _ = reply.send(self.seek(position_ms).await);
            }
            Command::SetVolume { volume, reply } => {
                let _ = reply.send(self.set_volume(volume).await);
            }
            Command::SetMuted { muted, reply } => {
                let _ = reply.send(self.set_muted(muted).await);
            }
            Command::ToggleMute { reply } => {
                let muted = !self.state.volume.is_muted();
                let result = self.set_muted(muted).await.map(|()| muted);
                let _ = reply.send(result);
            }
            Command::Next { reply } => {
                let _ = reply.send(self.next().await);
            }
            Command::Previous { reply } => {
                let _ = reply.send(self.previous().await);
            }
            Command::SkipTo { index, reply } => {
                let _ = reply.send(self.skip_to(index));
            }
            Command::SetMode { mode, reply } => {
                self.set_mode(mode);
                let _ = reply.send(Ok(()));
            }
            Command::CycleMode { reply } => {
                let mode = self.state.mode.cycle();
                self.set_mode(mode);
                let _ = reply.send(Ok(mode));
            }
            Command::AddToQueue { tracks, reply } => {
                let ids = self.queue.append(tracks);
                debug!(count = ids.len(), "Added tracks to queue");
                self.emit_queue_changed();
                let _ = reply.send(Ok(ids));
            }
            Command::RemoveFromQueue { index, reply } => {
                let _ = reply.send(self.remove_from_queue(index).await);
            }
            Command::ClearQueue { reply } => {
                self.clear_queue().await;
                let _ = reply.send(Ok(()));
            }
            Command::ShuffleQueue { reply } => {
                self.queue.shuffle();
                self.emit_queue_changed();
                let _ = reply.send(Ok(()));
            }
            Command::ReorderQueue { from, to, reply } => {
                let result = self.queue.reorder(from, to);
                if result.is_ok() {
                    self.emit_queue_changed();
                }
                let _ = reply.send(result);
            }
            Command::GetState { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            Command::GetQueue { reply } => {
                let _ = reply.send(Ok(self.queue.snapshot()));
            }
            Command::Shutdown { reply } => {
                self.shutdown().await;
                let _ = reply.send(Ok(()));
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // ===== Playback Control =====

    /// Locate `track` in the queue (appending it if absent) and play it
    async fn play_track(&mut self, track: TrackIdentity) -> Result<usize> {
        let key = track.key();

        if let Some(current) = self.queue.current() {
            if current.track.key() == key {
                let index = self.queue.current_index().unwrap_or_default();
                match self.state.status {
                    PlayerStatus::Loading | PlayerStatus::Playing | PlayerStatus::Buffering => {
                        debug!(track = %key, "Track already current");
                    }
                    PlayerStatus::Paused => self.resume().await?,
                    PlayerStatus::Stopped | PlayerStatus::Error => {
                        self.begin_transition(index, true)?;
                    }
                }
                return Ok(index);
            }
        }

        let index = match self.queue.position_of(&key) {
            Some(index) => index,
            None => {
                self.queue.append(vec![track]);
                self.queue.len() - 1
            }
        };

        self.begin_transition(index, true)?;
        Ok(index)
    }

    /// Splice `track` right after the cursor and jump to it
    fn play_now(&mut self, track: TrackIdentity) -> Result<usize> {
        let index = self.queue.current_index().map_or(0, |c| c + 1);
        self.queue.insert_at(index, track)?;
        self.begin_transition(index, true)?;
        Ok(index)
    }

    /// Start the current (or first) entry, or resume when paused
    async fn play(&mut self) -> Result<()> {
        match self.state.status {
            PlayerStatus::Paused => self.resume().await,
            PlayerStatus::Loading => {
                self.autoplay = true;
                Ok(())
            }
            PlayerStatus::Playing | PlayerStatus::Buffering => Ok(()),
            PlayerStatus::Stopped | PlayerStatus::Error => {
                if self.queue.is_empty() {
                    return Err(PlaybackError::QueueEmpty);
                }
                let index = self.queue.current_index().unwrap_or(0);
                self.begin_transition(index, true)
            }
        }
    }

    /// Pause playback
    ///
    /// Paused is a no-op. While loading, the new track will load paused.
    async fn pause(&mut self) -> Result<()> {
        match self.state.status {
            PlayerStatus::Playing | PlayerStatus::Buffering => {
                self.device.pause().await?;
                self.set_status(PlayerStatus::Paused);
                Ok(())
            }
            PlayerStatus::Paused => Ok(()),
            PlayerStatus::Loading => {
                debug!("Pause while loading, new track will start paused");
                self.autoplay = false;
                Ok(())
            }
            status @ (PlayerStatus::Stopped | PlayerStatus::Error) => {
                Err(PlaybackError::InvalidTransition {
                    command: "pause",
                    status,
                })
            }
        }
    }

    /// Resume paused playback
    async fn resume(&mut self) -> Result<()> {
        match self.state.status {
            PlayerStatus::Paused => {
                self.device.play().await?;
                self.set_status(PlayerStatus::Playing);
                Ok(())
            }
            PlayerStatus::Playing | PlayerStatus::Buffering => Ok(()),
            PlayerStatus::Loading => {
                self.autoplay = true;
                Ok(())
            }
            status @ (PlayerStatus::Stopped | PlayerStatus::Error) => {
                Err(PlaybackError::InvalidTransition {
                    command: "resume",
                    status,
                })
            }
        }
    }

    /// Stop playback and release the device
    ///
    /// Always succeeds. Any in-flight resolution is abandoned.
    async fn stop(&mut self) {
        self.cancel_resolution();
        self.generation = self.generation.next();
        self.autoplay = false;
        self.pending_seek = None;
        self.seek_settle = None;

        if self.state.status != PlayerStatus::Stopped {
            if let Err(e) = self.device.stop().await {
                warn!(error = %e, "Device failed to stop");
            }
            info!("Playback stopped");
        }

        self.state.position_ms = 0;
        self.set_status(PlayerStatus::Stopped);
        self.release_switching();
    }

    /// Seek within the current track, clamped to its duration
    async fn seek(&mut self, position_ms: u64) -> Result<()> {
        let position_ms = match self.state.duration_ms {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };

        match self.state.status {
            PlayerStatus::Loading => {
                debug!(position_ms, "Deferring seek until the new track is loaded");
                self.pending_seek = Some(position_ms);
                Ok(())
            }
            PlayerStatus::Playing | PlayerStatus::Paused | PlayerStatus::Buffering => {
                self.device.seek(position_ms).await?;
                self.moved_to(position_ms);
                Ok(())
            }
            status @ (PlayerStatus::Stopped | PlayerStatus::Error) => {
                Err(PlaybackError::InvalidTransition {
                    command: "seek",
                    status,
                })
            }
        }
    }

    /// Record a seek the device accepted
    fn moved_to(&mut self, position_ms: u64) {
        self.state.position_ms = position_ms;
        self.seek_settle = Some(SeekSettle::new(position_ms));
        self.emit(PlayerEvent::PositionChanged {
            position: DevicePosition::from_millis(position_ms),
        });
    }

    // ===== Volume =====

    /// Set volume level (clamped); valid in any status
    async fn set_volume(&mut self, level: f32) -> Result<()> {
        let mut volume = self.state.volume;
        if !volume.set_level(level)? {
            return Ok(());
        }
        self.apply_volume(volume).await
    }

    /// Mute or unmute, preserving the level
    async fn set_muted(&mut self, muted: bool) -> Result<()> {
        let mut volume = self.state.volume;
        if !volume.set_muted(muted) {
            return Ok(());
        }
        self.apply_volume(volume).await
    }

    async fn apply_volume(&mut self, volume: Volume) -> Result<()> {
        // Loading applies it after the new stream is in
        if self.state.status.has_stream() {
            self.device.set_volume(volume.effective()).await?;
        }

        self.state.volume = volume;
        self.emit(PlayerEvent::VolumeChanged {
            volume: volume.level(),
            muted: volume.is_muted(),
        });
        Ok(())
    }

    // ===== Navigation =====

    /// Skip to next track
    ///
    /// Debounced while a switch is in flight; stops at the end of the queue.
    async fn next(&mut self) -> Result<NavigationOutcome> {
        if self.guard.is_active() {
            debug!("Next ignored, switch in flight");
            return Ok(NavigationOutcome::Debounced);
        }

        match self.queue.next(self.state.mode) {
            Some(index) => {
                self.begin_transition(index, true)?;
                Ok(NavigationOutcome::Started { index })
            }
            None => {
                info!("End of queue");
                self.stop().await;
                Ok(NavigationOutcome::EndOfQueue)
            }
        }
    }

    /// Go to previous track
    ///
    /// Past the restart threshold, restarts the current track instead.
    async fn previous(&mut self) -> Result<NavigationOutcome> {
        if self.guard.is_active() {
            debug!("Previous ignored, switch in flight");
            return Ok(NavigationOutcome::Debounced);
        }

        let threshold = self.config.previous_restart_threshold();
        if self.state.status.has_stream()
            && Duration::from_millis(self.state.position_ms) > threshold
        {
            self.device.seek(0).await?;
            self.moved_to(0);
            return Ok(NavigationOutcome::Restarted);
        }

        match self.queue.previous(self.state.mode) {
            Some(index) => {
                self.begin_transition(index, true)?;
                Ok(NavigationOutcome::Started { index })
            }
            None => {
                self.stop().await;
                Ok(NavigationOutcome::EndOfQueue)
            }
        }
    }

    /// Jump to `index` and play it
    fn skip_to(&mut self, index: usize) -> Result<()> {
        if index >= self.queue.len() {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                len: self.queue.len(),
            });
        }
        self.begin_transition(index, true)
    }

    /// Change the play mode; takes effect on the next navigation
    fn set_mode(&mut self, mode: PlayMode) {
        if self.state.mode == mode {
            return;
        }

        if mode == PlayMode::Shuffle {
            self.queue.regenerate_play_order();
        }
        self.state.mode = mode;
        debug!(%mode, "Play mode changed");
        self.emit(PlayerEvent::ModeChanged { mode });
    }

    // ===== Queue Management =====

    async fn remove_from_queue(&mut self, index: usize) -> Result<QueueEntrySnapshot> {
        let was_current = self.queue.current_index() == Some(index);
        let removed = self.queue.remove_at(index)?;
        self.emit_queue_changed();

        if was_current {
            match (self.queue.current_index(), self.state.status) {
                (None, _) => {
                    debug!("Removed the last entry, stopping");
                    self.stop().await;
                }
                (Some(index), PlayerStatus::Loading) => {
                    let autoplay = self.autoplay;
                    self.begin_transition(index, autoplay)?;
                }
                (Some(index), PlayerStatus::Playing | PlayerStatus::Buffering) => {
                    self.begin_transition(index, true)?;
                }
                (Some(_), PlayerStatus::Paused) => self.stop().await,
                (Some(_), PlayerStatus::Stopped | PlayerStatus::Error) => {}
            }
        }

        Ok(QueueEntrySnapshot {
            id: removed.id,
            track: removed.track,
        })
    }

    async fn clear_queue(&mut self) {
        self.stop().await;
        self.queue.clear();
        self.state.duration_ms = None;
        self.emit_queue_changed();
    }

    // ===== Transitions =====

    /// Make `index` current and start resolving it
    ///
    /// Pre-empts any load in flight: its resolution is aborted and anything
    /// it produces later is dropped by the generation check.
    fn begin_transition(&mut self, index: usize, autoplay: bool) -> Result<()> {
        self.queue.set_current_index(Some(index))?;
        self.queue.mark_played(index);

        let Some(entry) = self.queue.get(index) else {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                len: self.queue.len(),
            });
        };
        let current = CurrentTrack {
            index,
            entry_id: entry.id,
            track: Arc::clone(&entry.track),
        };

        self.cancel_resolution();
        self.generation = self.generation.next();
        self.autoplay = autoplay;
        self.pending_seek = None;
        self.seek_settle = None;
        self.state.position_ms = 0;
        self.state.duration_ms = current.track.duration_ms;
        self.state.last_error = None;
        self.guard.engage(Instant::now());
        self.state.switching = true;

        info!(
            index,
            track = %current.track.key(),
            generation = %self.generation,
            "Switching track"
        );

        let track = Arc::clone(&current.track);
        self.emit(PlayerEvent::TrackChanging { current });
        self.emit_queue_changed();
        self.set_status(PlayerStatus::Loading);
        self.spawn_resolution(track);
        Ok(())
    }

    fn spawn_resolution(&mut self, track: Arc<TrackIdentity>) {
        let budget = self
            .config
            .resolve_timeout_for(track.source.provider_key());
        let generation = self.generation;
        let resolver = Arc::clone(&self.resolver);
        let results = self.resolutions_tx.clone();

        self.resolve_task = Some(tokio::spawn(async move {
            let outcome = match tokio::time::timeout(budget, resolver.resolve(&track)).await {
                Ok(Ok(stream)) => ResolveOutcome::Resolved(stream),
                Ok(Err(e)) => ResolveOutcome::Failed(e),
                Err(_) => ResolveOutcome::TimedOut(budget),
            };
            let _ = results.send(Resolution {
                generation,
                track,
                outcome,
            });
        }));
    }

    fn cancel_resolution(&mut self) {
        if let Some(task) = self.resolve_task.take() {
            task.abort();
        }
    }

    async fn on_resolved(&mut self, resolution: Resolution) {
        if resolution.generation != self.generation || self.state.status != PlayerStatus::Loading
        {
            debug!(
                track = %resolution.track.id,
                stale = %resolution.generation,
                current = %self.generation,
                "Dropping stale resolution"
            );
            return;
        }
        self.resolve_task = None;

        match resolution.outcome {
            ResolveOutcome::Resolved(stream) => self.load_stream(stream).await,
            ResolveOutcome::Failed(e) => {
                self.fail(PlaybackFailure::ResolutionFailed {
                    track_id: resolution.track.id.clone(),
                    reason: e.to_string(),
                })
                .await;
            }
            ResolveOutcome::TimedOut(budget) => {
                self.fail(PlaybackFailure::ResolutionTimeout {
                    track_id: resolution.track.id.clone(),
                    timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                })
                .await;
            }
        }
    }

    /// Hand a resolved stream to the device and start it
    async fn load_stream(&mut self, stream: StreamHandle) {
        if let Some(duration) = stream.duration_ms {
            self.state.duration_ms = Some(duration);
        }

        match self.start_device(stream).await {
            Ok(()) => {
                let status = if self.autoplay {
                    PlayerStatus::Playing
                } else {
                    PlayerStatus::Paused
                };
                info!(?status, generation = %self.generation, "Track loaded");
                self.set_status(status);
                self.release_switching();
            }
            Err(e) => {
                self.fail(PlaybackFailure::Device { message: e.message })
                    .await;
            }
        }
    }

    async fn start_device(&mut self, stream: StreamHandle) -> std::result::Result<(), DeviceError> {
        self.device.load(self.generation, stream).await?;
        self.device
            .set_volume(self.state.volume.effective())
            .await?;

        if let Some(requested) = self.pending_seek.take() {
            let position_ms = match self.state.duration_ms {
                Some(duration) => requested.min(duration),
                None => requested,
            };
            self.device.seek(position_ms).await?;
            self.moved_to(position_ms);
        }

        if self.autoplay {
            self.device.play().await?;
        }
        Ok(())
    }

    /// Put the player in `Error` and surface `failure`
    async fn fail(&mut self, failure: PlaybackFailure) {
        warn!(%failure, "Playback failed");

        self.cancel_resolution();
        self.generation = self.generation.next();
        self.pending_seek = None;
        self.seek_settle = None;
        if let Err(e) = self.device.stop().await {
            warn!(error = %e, "Device failed to stop after failure");
        }

        self.state.last_error = Some(failure.clone());
        self.set_status(PlayerStatus::Error);
        self.emit(PlayerEvent::Error { failure });
        self.release_switching();
    }

    fn on_switch_deadline(&mut self) {
        if self.guard.expired(Instant::now()) {
            warn!(
                timeout = ?self.guard.timeout(),
                status = ?self.state.status,
                "Switching guard timed out"
            );
            self.release_switching();
        }
    }

    fn release_switching(&mut self) {
        if self.guard.release() {
            self.state.switching = false;
            self.emit(PlayerEvent::SwitchingCleared);
        }
    }

    // ===== Device Events =====

    async fn on_device_event(&mut self, event: DeviceEvent) {
        if event.generation != self.generation {
            trace!(
                stale = %event.generation,
                current = %self.generation,
                "Dropping stale device event"
            );
            return;
        }

        match event.kind {
            DeviceEventKind::PositionChanged(position) => {
                let position_ms = position.to_millis();
                if let Some(settle) = self.seek_settle.as_mut() {
                    if !settle.lands(position_ms) && settle.skipped < SEEK_SETTLE_MAX_SKIPS {
                        settle.skipped += 1;
                        trace!(
                            position_ms,
                            target_ms = settle.target_ms,
                            "Ignoring position report from before the seek"
                        );
                        return;
                    }
                    self.seek_settle = None;
                } else if self.state.status == PlayerStatus::Playing
                    && position_ms < self.state.position_ms
                {
                    trace!(position_ms, "Ignoring backwards position report");
                    return;
                }
                self.state.position_ms = position_ms;
                self.emit(PlayerEvent::PositionChanged { position });
            }

            DeviceEventKind::PlaybackStateChanged { playing, paused } => {
                self.emit(PlayerEvent::DeviceStateChanged { playing, paused });
                if !self.state.status.has_stream() {
                    return;
                }
                if playing {
                    self.set_status(PlayerStatus::Playing);
                } else if paused {
                    self.set_status(PlayerStatus::Paused);
                }
            }

            DeviceEventKind::Buffering { active } => match (active, self.state.status) {
                (true, PlayerStatus::Playing) => self.set_status(PlayerStatus::Buffering),
                (false, PlayerStatus::Buffering) => self.set_status(PlayerStatus::Playing),
                _ => {}
            },

            DeviceEventKind::MetadataLoaded { duration_ms } => {
                if duration_ms.is_some() {
                    self.state.duration_ms = duration_ms;
                }
                self.emit(PlayerEvent::MetadataLoaded { duration_ms });
            }

            DeviceEventKind::TrackFinished => {
                if let Some(entry) = self.queue.current() {
                    let entry_id = entry.id;
                    self.emit(PlayerEvent::TrackFinished { entry_id });
                }
                self.auto_advance().await;
            }

            DeviceEventKind::Error(e) => {
                self.fail(PlaybackFailure::Device { message: e.message })
                    .await;
            }
        }
    }

    /// Advance after a natural end of track
    async fn auto_advance(&mut self) {
        if self.guard.is_active() {
            debug!("Auto-advance ignored, switch in flight");
            return;
        }

        match self.queue.next(self.state.mode) {
            Some(index) => {
                if let Err(e) = self.begin_transition(index, true) {
                    warn!(error = %e, "Auto-advance failed");
                }
            }
            None => {
                info!("Reached end of queue");
                self.stop().await;
            }
        }
    }

    async fn shutdown(&mut self) {
        self.cancel_resolution();
        if self.state.status != PlayerStatus::Stopped {
            if let Err(e) = self.device.stop().await {
                warn!(error = %e, "Device failed to stop on shutdown");
            }
        }
    }

    // ===== State =====

    /// Authoritative snapshot of the manager's own state
    pub(crate) fn snapshot(&self) -> PlayerStateSnapshot {
        PlayerStateSnapshot {
            status: self.state.status,
            position_ms: self.state.position_ms,
            duration_ms: self.state.duration_ms,
            volume: self.state.volume.level(),
            muted: self.state.volume.is_muted(),
            mode: self.state.mode,
            current: self.current_track(),
            switching: self.state.switching,
            error: self.state.last_error.clone(),
        }
    }

    fn current_track(&self) -> Option<CurrentTrack> {
        let index = self.queue.current_index()?;
        let entry = self.queue.get(index)?;
        Some(CurrentTrack {
            index,
            entry_id: entry.id,
            track: Arc::clone(&entry.track),
        })
    }

    // ===== Event Emission =====

    fn set_status(&mut self, status: PlayerStatus) {
        if self.state.status == status {
            return;
        }
        debug!(from = ?self.state.status, to = ?status, "Status changed");
        self.state.status = status;
        self.emit(PlayerEvent::StatusChanged { status });
    }

    fn emit_queue_changed(&self) {
        self.emit(PlayerEvent::QueueChanged {
            queue: self.queue.snapshot(),
        });
    }

    fn emit(&self, event: PlayerEvent) {
        trace!(event = event.name(), "Emitting event");
        let _ = self.bridge_tx.send(event.clone());
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }
}
