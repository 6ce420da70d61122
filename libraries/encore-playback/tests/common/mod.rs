//! Shared test doubles for encore-playback integration tests
//!
//! - `ScriptedResolver`: resolves immediately, fails, hangs, or waits on a gate
//! - `RecordingDevice`: records every call and lets tests push device events

#![allow(dead_code)]

use async_trait::async_trait;
use encore_core::{
    DeviceError, DeviceEvent, DeviceEventKind, Generation, PlaybackDevice, ResolutionError,
    StreamHandle, StreamResolver, TrackId, TrackIdentity,
};
use encore_playback::{spawn, PlaybackHandle, PlayerConfig, PlayerEvent, PlayerStatus};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

// ===== Tracks =====

pub fn track(id: &str) -> TrackIdentity {
    TrackIdentity::new(id, format!("Track {id}"))
        .with_artist("Test Artist")
        .with_duration_ms(180_000)
}

pub fn tracks(ids: &[&str]) -> Vec<TrackIdentity> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn stream_for(id: &str) -> StreamHandle {
    StreamHandle::new(format!("mem://{id}")).with_duration_ms(180_000)
}

// ===== Resolver =====

type Gate = oneshot::Receiver<Result<StreamHandle, ResolutionError>>;

/// Resolver whose behaviour is scripted per track id
#[derive(Default)]
pub struct ScriptedResolver {
    gates: Mutex<HashMap<String, Gate>>,
    failing: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hold resolution of `id` until the returned sender fires
    pub fn gate(&self, id: &str) -> oneshot::Sender<Result<StreamHandle, ResolutionError>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(id.to_string(), rx);
        tx
    }

    /// Make resolution of `id` fail with `NotFound`
    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    /// Make resolution of `id` never complete
    pub fn hang(&self, id: &str) {
        self.hanging.lock().unwrap().insert(id.to_string());
    }

    /// Track ids resolved so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamResolver for ScriptedResolver {
    async fn resolve(&self, track: &TrackIdentity) -> Result<StreamHandle, ResolutionError> {
        let id = track.id.as_str().to_string();
        self.calls.lock().unwrap().push(id.clone());

        if self.failing.lock().unwrap().contains(&id) {
            return Err(ResolutionError::NotFound(TrackId::new(id)));
        }
        if self.hanging.lock().unwrap().contains(&id) {
            std::future::pending::<()>().await;
        }

        let gate = self.gates.lock().unwrap().remove(&id);
        match gate {
            Some(gate) => gate
                .await
                .unwrap_or_else(|_| Err(ResolutionError::provider("gate dropped"))),
            None => Ok(stream_for(&id)),
        }
    }
}

// ===== Device =====

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Load { generation: Generation, uri: String },
    Play,
    Pause,
    Stop,
    Seek(u64),
    SetVolume(f32),
}

/// Device double: records calls, emits only what the test tells it to
pub struct RecordingDevice {
    calls: Mutex<Vec<DeviceCall>>,
    loaded: Mutex<Generation>,
    events: mpsc::UnboundedSender<DeviceEvent>,
    fail_load: AtomicBool,
}

impl RecordingDevice {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<DeviceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let device = Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            loaded: Mutex::new(Generation::INITIAL),
            events: tx,
            fail_load: AtomicBool::new(false),
        });
        (device, rx)
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::Load { uri, .. } => Some(uri),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Generation of the most recent load
    pub fn loaded_generation(&self) -> Generation {
        *self.loaded.lock().unwrap()
    }

    /// Make the next `load` call fail
    pub fn fail_next_load(&self) {
        self.fail_load.store(true, Ordering::SeqCst);
    }

    /// Emit an event for the currently loaded stream
    pub fn emit(&self, kind: DeviceEventKind) {
        self.emit_for(self.loaded_generation(), kind);
    }

    /// Emit an event tagged with an arbitrary generation
    pub fn emit_for(&self, generation: Generation, kind: DeviceEventKind) {
        let _ = self.events.send(DeviceEvent::new(generation, kind));
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlaybackDevice for RecordingDevice {
    async fn load(&self, generation: Generation, stream: StreamHandle) -> Result<(), DeviceError> {
        self.record(DeviceCall::Load {
            generation,
            uri: stream.uri.clone(),
        });
        if self.fail_load.swap(false, Ordering::SeqCst) {
            return Err(DeviceError::new("unsupported codec"));
        }
        *self.loaded.lock().unwrap() = generation;
        Ok(())
    }

    async fn play(&self) -> Result<(), DeviceError> {
        self.record(DeviceCall::Play);
        Ok(())
    }

    async fn pause(&self) -> Result<(), DeviceError> {
        self.record(DeviceCall::Pause);
        Ok(())
    }

    async fn stop(&self) -> Result<(), DeviceError> {
        self.record(DeviceCall::Stop);
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<(), DeviceError> {
        self.record(DeviceCall::Seek(position_ms));
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> Result<(), DeviceError> {
        self.record(DeviceCall::SetVolume(volume));
        Ok(())
    }
}

// ===== Harness =====

pub struct Harness {
    pub player: PlaybackHandle,
    pub resolver: Arc<ScriptedResolver>,
    pub device: Arc<RecordingDevice>,
    pub events: broadcast::Receiver<PlayerEvent>,
}

impl Harness {
    pub fn start() -> Self {
        Self::start_with(PlayerConfig::default())
    }

    pub fn start_with(config: PlayerConfig) -> Self {
        let resolver = ScriptedResolver::new();
        let (device, device_events) = RecordingDevice::new();
        let player = spawn(
            config,
            Arc::clone(&resolver) as Arc<dyn StreamResolver>,
            Arc::clone(&device) as Arc<dyn PlaybackDevice>,
            device_events,
        )
        .expect("valid config");
        let events = player.subscribe_events();

        Self {
            player,
            resolver,
            device,
            events,
        }
    }

    /// Harness with `ids` already queued
    pub async fn with_queue(ids: &[&str]) -> Self {
        let harness = Self::start();
        harness.player.add_to_queue(tracks(ids)).await.unwrap();
        harness
    }

    /// Wait for the next raw event matching `pred`
    pub async fn wait_for(&mut self, pred: impl Fn(&PlayerEvent) -> bool) -> PlayerEvent {
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                match self.events.recv().await {
                    Ok(event) if pred(&event) => return event,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    /// Wait until the manager reports `status`
    pub async fn wait_for_status(&mut self, status: PlayerStatus) {
        self.wait_for(|e| matches!(e, PlayerEvent::StatusChanged { status: s } if *s == status))
            .await;
    }

    /// Drain every event emitted so far
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}
