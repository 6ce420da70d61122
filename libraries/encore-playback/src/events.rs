//! Playback Events
//!
//! Closed set of events emitted by the playback manager. The sync bridge
//! consumes them to build UI snapshots; diagnostics can subscribe to the raw
//! stream too.
//!
//! Events are emitted at key points:
//! - Track transitions (start of switch, stream metadata, end of track)
//! - Status changes (play/pause/stop/buffering/error)
//! - Position updates (as reported by the device)
//! - Volume, mode and queue changes

use crate::types::{
    CurrentTrack, PlayMode, PlaybackFailure, PlayerStatus, QueueEntryId, QueueSnapshot,
};
use encore_core::DevicePosition;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// A track transition started; `current` is the entry being loaded
    TrackChanging {
        /// New current entry
        current: CurrentTrack,
    },

    /// Authoritative player status changed
    StatusChanged {
        /// New status
        status: PlayerStatus,
    },

    /// Raw playing/paused flags from the device (may be indeterminate)
    DeviceStateChanged {
        /// Audio is flowing
        playing: bool,
        /// Paused mid-track
        paused: bool,
    },

    /// Position report, as the device gave it
    PositionChanged {
        /// Seconds + fraction
        position: DevicePosition,
    },

    /// Stream metadata arrived for the current track
    MetadataLoaded {
        /// Duration, if known
        duration_ms: Option<u64>,
    },

    /// Volume or mute changed
    VolumeChanged {
        /// Level in `[0.0, 1.0]`
        volume: f32,
        /// Mute flag
        muted: bool,
    },

    /// Play mode changed
    ModeChanged {
        /// New mode
        mode: PlayMode,
    },

    /// Current track reached its end
    TrackFinished {
        /// Entry that finished
        entry_id: QueueEntryId,
    },

    /// Queue contents or cursor changed
    QueueChanged {
        /// Full queue snapshot
        queue: QueueSnapshot,
    },

    /// Manager released its switching guard without a definitive device signal
    SwitchingCleared,

    /// Asynchronous failure
    Error {
        /// What went wrong
        failure: PlaybackFailure,
    },
}

impl PlayerEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrackChanging { .. } => "track_changing",
            Self::StatusChanged { .. } => "status_changed",
            Self::DeviceStateChanged { .. } => "device_state_changed",
            Self::PositionChanged { .. } => "position_changed",
            Self::MetadataLoaded { .. } => "metadata_loaded",
            Self::VolumeChanged { .. } => "volume_changed",
            Self::ModeChanged { .. } => "mode_changed",
            Self::TrackFinished { .. } => "track_finished",
            Self::QueueChanged { .. } => "queue_changed",
            Self::SwitchingCleared => "switching_cleared",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = PlayerEvent::StatusChanged {
            status: PlayerStatus::Playing,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["status"], "playing");

        let json = serde_json::to_value(PlayerEvent::SwitchingCleared).unwrap();
        assert_eq!(json["type"], "switching_cleared");
    }

    #[test]
    fn event_names_match_tags() {
        let event = PlayerEvent::ModeChanged {
            mode: PlayMode::Shuffle,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
        assert_eq!(json["mode"], "shuffle");
    }
}
