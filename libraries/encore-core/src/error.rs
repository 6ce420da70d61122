/// Collaborator error types
use crate::types::TrackId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a `StreamResolver`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The provider does not know the track
    #[error("Track not found: {0}")]
    NotFound(TrackId),

    /// The provider exists but cannot serve the track right now
    #[error("Provider {provider} unavailable: {reason}")]
    Unavailable {
        /// Provider namespace
        provider: String,
        /// Human-readable cause
        reason: String,
    },

    /// Any other provider-side failure
    #[error("Provider error: {0}")]
    Provider(String),
}

impl ResolutionError {
    /// Create a provider error from any displayable message
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

/// Opaque error from the playback device
///
/// Always definitive: the coordinator never retries on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Device error: {message}")]
pub struct DeviceError {
    /// Message as reported by the device
    pub message: String,
}

impl DeviceError {
    /// Create a device error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
