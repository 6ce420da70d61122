//! Error types for playback management

use crate::types::PlayerStatus;
use encore_core::DeviceError;
use thiserror::Error;

/// Playback errors
///
/// Returned synchronously from commands. Failures that happen later, while a
/// stream is resolving or playing, are reported as `PlaybackFailure` on the
/// event stream instead.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Index outside the queue
    #[error("Index out of range: {index} (queue length {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Queue length at the time of the call
        len: usize,
    },

    /// Queue is empty
    #[error("Queue is empty")]
    QueueEmpty,

    /// Command not valid in the current status
    #[error("Cannot {command} while {status:?}")]
    InvalidTransition {
        /// Command name
        command: &'static str,
        /// Status when the command arrived
        status: PlayerStatus,
    },

    /// Volume was not a number
    #[error("Invalid volume: {0}")]
    InvalidVolume(f32),

    /// Device rejected a synchronous command
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The playback manager task has shut down
    #[error("Playback manager is not running")]
    ManagerClosed,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
