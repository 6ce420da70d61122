//! Core types for playback management

use crate::volume::Volume;
use encore_core::{TrackId, TrackIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Queue-local entry identifier
///
/// Separate from the track id because the same track may be queued twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueEntryId(pub(crate) u64);

impl QueueEntryId {
    /// Raw value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueueEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry#{}", self.0)
    }
}

/// Player status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// Nothing loaded
    #[default]
    Stopped,

    /// Resolving or loading a stream
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Playing, but stalled on the network
    Buffering,

    /// Last load or playback failed; a new play command is needed
    Error,
}

impl PlayerStatus {
    /// Playing or Paused: a state the UI can show without flicker
    pub fn is_definitive(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }

    /// A stream is loading or producing audio
    pub fn is_active(self) -> bool {
        matches!(self, Self::Loading | Self::Playing | Self::Buffering)
    }

    /// A stream is loaded in the device
    pub fn has_stream(self) -> bool {
        matches!(self, Self::Playing | Self::Paused | Self::Buffering)
    }
}

/// Play mode, governs what "next" resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayMode {
    /// Play in queue order, stop at the end
    #[default]
    Sequential,

    /// Loop the current track
    RepeatOne,

    /// Loop the whole queue
    RepeatAll,

    /// Walk a pre-shuffled order
    Shuffle,
}

impl PlayMode {
    /// Next mode for the single cycling UI control
    ///
    /// Sequential → RepeatOne → RepeatAll → Shuffle → Sequential
    #[must_use]
    pub fn cycle(self) -> Self {
        match self {
            Self::Sequential => Self::RepeatOne,
            Self::RepeatOne => Self::RepeatAll,
            Self::RepeatAll => Self::Shuffle,
            Self::Shuffle => Self::Sequential,
        }
    }

    /// String representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::RepeatOne => "repeat-one",
            Self::RepeatAll => "repeat-all",
            Self::Shuffle => "shuffle",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(Self::Sequential),
            "repeat-one" => Ok(Self::RepeatOne),
            "repeat-all" => Ok(Self::RepeatAll),
            "shuffle" => Ok(Self::Shuffle),
            other => Err(format!("unknown play mode: {other}")),
        }
    }
}

/// Asynchronous failure, reported on the event stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackFailure {
    /// Provider could not produce a playable stream
    ResolutionFailed {
        /// Track that failed
        track_id: TrackId,
        /// Provider message
        reason: String,
    },

    /// Provider did not answer within the resolution budget
    ResolutionTimeout {
        /// Track that failed
        track_id: TrackId,
        /// Budget that elapsed
        timeout_ms: u64,
    },

    /// Device failure (passthrough)
    Device {
        /// Device message
        message: String,
    },
}

impl fmt::Display for PlaybackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolutionFailed { track_id, reason } => {
                write!(f, "could not resolve {track_id}: {reason}")
            }
            Self::ResolutionTimeout {
                track_id,
                timeout_ms,
            } => write!(f, "resolving {track_id} timed out after {timeout_ms}ms"),
            Self::Device { message } => write!(f, "device error: {message}"),
        }
    }
}

/// Player state owned by the playback manager
#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    /// Current status
    pub status: PlayerStatus,

    /// Last known position; non-decreasing while playing
    pub position_ms: u64,

    /// Duration of the current track, if known
    pub duration_ms: Option<u64>,

    /// Volume and mute
    pub volume: Volume,

    /// Navigation mode
    pub mode: PlayMode,

    /// A track transition is in flight
    pub switching: bool,

    /// Failure that put the player in `Error`
    pub last_error: Option<PlaybackFailure>,
}

/// The queue entry the player points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTrack {
    /// Index in the queue
    pub index: usize,

    /// Queue-local entry id
    pub entry_id: QueueEntryId,

    /// Shared track metadata
    pub track: Arc<TrackIdentity>,
}

/// UI-facing player snapshot, published by the sync bridge
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerStateSnapshot {
    /// Status as the UI should show it
    pub status: PlayerStatus,

    /// Position in milliseconds
    pub position_ms: u64,

    /// Duration in milliseconds, if known
    pub duration_ms: Option<u64>,

    /// Volume level in `[0.0, 1.0]`
    pub volume: f32,

    /// Mute flag
    pub muted: bool,

    /// Navigation mode
    pub mode: PlayMode,

    /// Current track, if any
    pub current: Option<CurrentTrack>,

    /// Whether a track switch is being smoothed over
    pub switching: bool,

    /// Failure shown to the user
    pub error: Option<PlaybackFailure>,
}

/// One row of a queue snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntrySnapshot {
    /// Entry id
    pub id: QueueEntryId,

    /// Shared track metadata
    pub track: Arc<TrackIdentity>,
}

/// UI-facing queue snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Entries in queue order
    pub entries: Vec<QueueEntrySnapshot>,

    /// Cursor (`None` when nothing is current)
    pub current_index: Option<usize>,
}

/// Result of a `next`/`previous` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// A transition to `index` started
    Started {
        /// Target index
        index: usize,
    },

    /// Ignored: another transition is in flight
    Debounced,

    /// Nothing to go to; playback stopped
    EndOfQueue,

    /// Current track restarted from the beginning
    Restarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_cycle_visits_every_mode() {
        let mut mode = PlayMode::Sequential;
        let mut seen = vec![mode];
        for _ in 0..3 {
            mode = mode.cycle();
            seen.push(mode);
        }
        assert_eq!(
            seen,
            vec![
                PlayMode::Sequential,
                PlayMode::RepeatOne,
                PlayMode::RepeatAll,
                PlayMode::Shuffle
            ]
        );
        assert_eq!(mode.cycle(), PlayMode::Sequential);
    }

    #[test]
    fn mode_string_round_trip() {
        for mode in [
            PlayMode::Sequential,
            PlayMode::RepeatOne,
            PlayMode::RepeatAll,
            PlayMode::Shuffle,
        ] {
            assert_eq!(mode.as_str().parse::<PlayMode>().unwrap(), mode);
        }
        assert!("loop".parse::<PlayMode>().is_err());
    }

    #[test]
    fn definitive_statuses() {
        assert!(PlayerStatus::Playing.is_definitive());
        assert!(PlayerStatus::Paused.is_definitive());
        assert!(!PlayerStatus::Loading.is_definitive());
        assert!(!PlayerStatus::Buffering.is_definitive());
        assert!(!PlayerStatus::Stopped.is_definitive());
        assert!(!PlayerStatus::Error.is_definitive());
    }

    #[test]
    fn failure_serializes_tagged() {
        let failure = PlaybackFailure::ResolutionTimeout {
            track_id: TrackId::new("t1"),
            timeout_ms: 5000,
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "resolution_timeout");
        assert_eq!(json["timeout_ms"], 5000);
    }
}
