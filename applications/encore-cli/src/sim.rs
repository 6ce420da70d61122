//! Simulated collaborators
//!
//! `SimulatedDevice` pretends to decode audio: a ticker task advances the
//! position while playing and reports the end of the stream.
//! `CatalogResolver` serves streams for the tracks of a playlist after a fixed
//! latency.

use crate::config::SimulationSettings;
use crate::library::Playlist;
use async_trait::async_trait;
use encore_core::{
    DeviceError, DeviceEvent, DeviceEventKind, DevicePosition, Generation, PlaybackDevice,
    ResolutionError, StreamHandle, StreamResolver, TrackIdentity, TrackKey,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

// ===== Device =====

#[derive(Debug, Default)]
struct DeviceState {
    generation: Generation,
    loaded: bool,
    playing: bool,
    position_ms: u64,
    duration_ms: u64,
    volume: f32,
}

/// In-process stand-in for an audio output
pub struct SimulatedDevice {
    state: Arc<Mutex<DeviceState>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    events: mpsc::UnboundedSender<DeviceEvent>,
    tick: Duration,
    default_duration_ms: u64,
}

impl SimulatedDevice {
    /// Create a device and the event channel to hand to the coordinator
    pub fn new(settings: &SimulationSettings) -> (Arc<Self>, mpsc::UnboundedReceiver<DeviceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let device = Arc::new(Self {
            state: Arc::new(Mutex::new(DeviceState::default())),
            ticker: Mutex::new(None),
            events: tx,
            tick: settings.tick(),
            default_duration_ms: settings.default_duration_ms,
        });
        (device, rx)
    }

    /// Last volume the coordinator applied
    pub fn volume(&self) -> f32 {
        self.state().volume
    }

    /// Current position of the loaded stream
    pub fn position_ms(&self) -> u64 {
        self.state().position_ms
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, generation: Generation, kind: DeviceEventKind) {
        send(&self.events, generation, kind);
    }

    fn replace_ticker(&self, ticker: Option<JoinHandle<()>>) {
        let mut slot = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = ticker;
    }

    fn loaded_generation(&self) -> Result<Generation, DeviceError> {
        let state = self.state();
        if state.loaded {
            Ok(state.generation)
        } else {
            Err(DeviceError::new("no stream loaded"))
        }
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.replace_ticker(None);
    }
}

#[async_trait]
impl PlaybackDevice for SimulatedDevice {
    async fn load(&self, generation: Generation, stream: StreamHandle) -> Result<(), DeviceError> {
        let duration_ms = stream.duration_ms.unwrap_or(self.default_duration_ms);
        debug!(%generation, uri = %stream.uri, duration_ms, "Loading stream");

        {
            let mut state = self.state();
            state.generation = generation;
            state.loaded = true;
            state.playing = false;
            state.position_ms = 0;
            state.duration_ms = duration_ms;
        }

        // Both flags drop while the previous stream is torn down
        self.emit(
            generation,
            DeviceEventKind::PlaybackStateChanged {
                playing: false,
                paused: false,
            },
        );
        self.emit(
            generation,
            DeviceEventKind::MetadataLoaded {
                duration_ms: Some(duration_ms),
            },
        );

        let ticker = tokio::spawn(run_ticker(
            Arc::clone(&self.state),
            self.events.clone(),
            generation,
            self.tick,
        ));
        self.replace_ticker(Some(ticker));
        Ok(())
    }

    async fn play(&self) -> Result<(), DeviceError> {
        let generation = self.loaded_generation()?;
        self.state().playing = true;
        self.emit(
            generation,
            DeviceEventKind::PlaybackStateChanged {
                playing: true,
                paused: false,
            },
        );
        Ok(())
    }

    async fn pause(&self) -> Result<(), DeviceError> {
        let generation = self.loaded_generation()?;
        self.state().playing = false;
        self.emit(
            generation,
            DeviceEventKind::PlaybackStateChanged {
                playing: false,
                paused: true,
            },
        );
        Ok(())
    }

    async fn stop(&self) -> Result<(), DeviceError> {
        self.replace_ticker(None);
        let mut state = self.state();
        state.loaded = false;
        state.playing = false;
        state.position_ms = 0;
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<(), DeviceError> {
        let generation = self.loaded_generation()?;
        let position_ms = {
            let mut state = self.state();
            state.position_ms = position_ms.min(state.duration_ms);
            state.position_ms
        };
        self.emit(
            generation,
            DeviceEventKind::PositionChanged(DevicePosition::from_millis(position_ms)),
        );
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> Result<(), DeviceError> {
        self.state().volume = volume;
        Ok(())
    }
}

fn send(events: &mpsc::UnboundedSender<DeviceEvent>, generation: Generation, kind: DeviceEventKind) {
    // Receiver gone means the coordinator shut down
    let _ = events.send(DeviceEvent::new(generation, kind));
}

async fn run_ticker(
    shared: Arc<Mutex<DeviceState>>,
    events: mpsc::UnboundedSender<DeviceEvent>,
    generation: Generation,
    tick: Duration,
) {
    let step = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX);

    loop {
        tokio::time::sleep(tick).await;

        let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation != generation || !state.loaded {
            return;
        }
        if !state.playing {
            continue;
        }

        state.position_ms = state.position_ms.saturating_add(step).min(state.duration_ms);
        send(
            &events,
            generation,
            DeviceEventKind::PositionChanged(DevicePosition::from_millis(state.position_ms)),
        );

        if state.position_ms >= state.duration_ms {
            state.playing = false;
            trace!(%generation, "Stream finished");
            send(&events, generation, DeviceEventKind::TrackFinished);
            return;
        }
    }
}

// ===== Resolver =====

/// Resolves the tracks of a playlist to `sim://` streams
#[derive(Debug, Clone)]
pub struct CatalogResolver {
    known: HashSet<TrackKey>,
    failing: HashSet<TrackKey>,
    latency: Duration,
}

impl CatalogResolver {
    pub fn from_playlist(playlist: &Playlist, settings: &SimulationSettings) -> Self {
        Self {
            known: playlist.identities().iter().map(TrackIdentity::key).collect(),
            failing: playlist.failing_keys(),
            latency: settings.resolve_latency(),
        }
    }
}

#[async_trait]
impl StreamResolver for CatalogResolver {
    async fn resolve(&self, track: &TrackIdentity) -> Result<StreamHandle, ResolutionError> {
        tokio::time::sleep(self.latency).await;

        let key = track.key();
        if !self.known.contains(&key) {
            return Err(ResolutionError::NotFound(track.id.clone()));
        }
        if self.failing.contains(&key) {
            return Err(ResolutionError::Unavailable {
                provider: key.provider,
                reason: "simulated outage".to_string(),
            });
        }

        let mut stream = StreamHandle::new(format!("sim://{}/{}", key.provider, key.id))
            .with_mime_type("audio/flac");
        if let Some(duration_ms) = track.duration_ms {
            stream = stream.with_duration_ms(duration_ms);
        }
        Ok(stream)
    }
}
