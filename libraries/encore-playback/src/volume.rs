//! Volume control
//!
//! Level is a linear `[0.0, 1.0]` value handed straight to the device.
//! Mute preserves the level.

use crate::error::{PlaybackError, Result};

/// Default volume level
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Volume level with mute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    /// Volume level (0.0-1.0)
    level: f32,

    /// Mute state (preserves volume level)
    muted: bool,
}

impl Volume {
    /// Create new volume, clamping `level` into range
    ///
    /// NaN falls back to the default level.
    pub fn new(level: f32) -> Self {
        let level = if level.is_nan() {
            DEFAULT_VOLUME
        } else {
            level.clamp(0.0, 1.0)
        };
        Self {
            level,
            muted: false,
        }
    }

    /// Set volume level, clamped to `[0.0, 1.0]`
    ///
    /// Returns whether the level changed.
    pub fn set_level(&mut self, level: f32) -> Result<bool> {
        if level.is_nan() {
            return Err(PlaybackError::InvalidVolume(level));
        }
        let level = level.clamp(0.0, 1.0);
        let changed = level != self.level;
        self.level = level;
        Ok(changed)
    }

    /// Get current volume level
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Mute or unmute; returns whether the flag changed
    pub fn set_muted(&mut self, muted: bool) -> bool {
        let changed = self.muted != muted;
        self.muted = muted;
        changed
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Level the device should actually output (0.0 when muted)
    pub fn effective(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME)
    }
}
