/// Events reported by a playback device
use super::ids::Generation;
use crate::error::DeviceError;
use serde::{Deserialize, Serialize};

/// Position as reported by the device: whole seconds plus a sub-second fraction
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DevicePosition {
    /// Whole seconds
    pub seconds: u64,

    /// Fraction of a second in `[0.0, 1.0)`
    pub subsec: f64,
}

impl DevicePosition {
    /// Create a position from its two components
    pub fn new(seconds: u64, subsec: f64) -> Self {
        Self { seconds, subsec }
    }

    /// Build a position from milliseconds
    pub fn from_millis(ms: u64) -> Self {
        Self {
            seconds: ms / 1000,
            subsec: (ms % 1000) as f64 / 1000.0,
        }
    }

    /// Normalize to a single millisecond integer
    ///
    /// Out-of-range or non-finite fractions are clamped; a fraction that rounds
    /// up to a full second never exceeds the next second boundary.
    pub fn to_millis(self) -> u64 {
        let frac = if self.subsec.is_finite() {
            self.subsec.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let sub_ms = ((frac * 1000.0).round() as u64).min(1000);
        self.seconds.saturating_mul(1000).saturating_add(sub_ms)
    }
}

/// Device event tagged with the generation it was loaded under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    /// Generation passed to `PlaybackDevice::load`
    pub generation: Generation,

    /// What happened
    pub kind: DeviceEventKind,
}

impl DeviceEvent {
    /// Create an event
    pub fn new(generation: Generation, kind: DeviceEventKind) -> Self {
        Self { generation, kind }
    }
}

/// Device event payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEventKind {
    /// Periodic position report
    PositionChanged(DevicePosition),

    /// Raw playing/paused flags
    ///
    /// Both flags can be false for a moment while the device tears a stream
    /// down or reloads it.
    PlaybackStateChanged {
        /// Audio is flowing
        playing: bool,
        /// Paused mid-track
        paused: bool,
    },

    /// Network stall started or ended
    Buffering {
        /// Whether the device is currently stalled
        active: bool,
    },

    /// Stream metadata arrived for the loaded track
    MetadataLoaded {
        /// Duration, if the stream exposes one
        duration_ms: Option<u64>,
    },

    /// Reached the end of the stream
    TrackFinished,

    /// Device failure
    Error(DeviceError),
}
