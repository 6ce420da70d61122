//! Collaborator traits for Encore
//!
//! The playback coordinator only knows providers and audio output through
//! these two traits. Implementations live in platform crates or tests.
use crate::error::{DeviceError, ResolutionError};
use crate::types::{Generation, StreamHandle, TrackIdentity};
use async_trait::async_trait;

/// Resolves a track identity to a playable stream on demand
///
/// Resolution may be slow (network, plugin sandbox). The coordinator enforces
/// its own timeout around every call, so implementations do not need one.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Resolve `track` into a stream handle
    ///
    /// # Errors
    /// Returns a `ResolutionError` if the provider cannot produce a stream
    async fn resolve(&self, track: &TrackIdentity) -> Result<StreamHandle, ResolutionError>;
}

/// Black-box audio decode/output device
///
/// Events are delivered asynchronously on the channel handed to the
/// coordinator at spawn time, tagged with the generation given to `load`.
/// Events for one loaded stream must be sent in the order they occur.
#[async_trait]
pub trait PlaybackDevice: Send + Sync {
    /// Load a stream, replacing whatever was loaded before
    async fn load(&self, generation: Generation, stream: StreamHandle) -> Result<(), DeviceError>;

    /// Start or resume output
    async fn play(&self) -> Result<(), DeviceError>;

    /// Pause output, keeping the stream loaded
    async fn pause(&self) -> Result<(), DeviceError>;

    /// Stop output and release the loaded stream
    async fn stop(&self) -> Result<(), DeviceError>;

    /// Seek within the loaded stream
    async fn seek(&self, position_ms: u64) -> Result<(), DeviceError>;

    /// Set output volume in `[0.0, 1.0]`
    async fn set_volume(&self, volume: f32) -> Result<(), DeviceError>;
}
