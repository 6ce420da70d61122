//! Playback configuration
//!
//! Plain serde struct; every field has a default so a partial config file
//! (or none at all) works. Applications load it from files/environment.

use crate::error::{PlaybackError, Result};
use crate::types::PlayMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Per-provider overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderSettings {
    /// Resolution budget for this provider, overrides the global one
    #[serde(default)]
    pub resolve_timeout_ms: Option<u64>,
}

/// Configuration for the playback manager
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Max lifetime of the switching guard (default: 3000)
    #[serde(default = "default_switch_timeout_ms")]
    pub switch_timeout_ms: u64,

    /// Stream resolution budget (default: 5000)
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,

    /// Overrides keyed by provider namespace (`local` for local files)
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,

    /// Initial volume, 0.0-1.0 (default: 0.8)
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// Initial play mode (default: sequential)
    #[serde(default)]
    pub initial_mode: PlayMode,

    /// "Previous" restarts the current track past this position (default: 3000)
    #[serde(default = "default_previous_restart_threshold_ms")]
    pub previous_restart_threshold_ms: u64,

    /// Command mailbox size (default: 64)
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,

    /// Raw event broadcast buffer (default: 256)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            switch_timeout_ms: default_switch_timeout_ms(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
            providers: HashMap::new(),
            initial_volume: default_initial_volume(),
            initial_mode: PlayMode::default(),
            previous_restart_threshold_ms: default_previous_restart_threshold_ms(),
            command_capacity: default_command_capacity(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl PlayerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.switch_timeout_ms == 0 {
            return Err(PlaybackError::Config(
                "switch_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.resolve_timeout_ms == 0 {
            return Err(PlaybackError::Config(
                "resolve_timeout_ms must be greater than zero".to_string(),
            ));
        }

        for (provider, settings) in &self.providers {
            if settings.resolve_timeout_ms == Some(0) {
                return Err(PlaybackError::Config(format!(
                    "providers.{provider}.resolve_timeout_ms must be greater than zero"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlaybackError::Config(format!(
                "initial_volume must be within 0.0-1.0, got {}",
                self.initial_volume
            )));
        }

        if self.command_capacity == 0 || self.event_capacity == 0 {
            return Err(PlaybackError::Config(
                "channel capacities must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Switching guard timeout
    pub fn switch_timeout(&self) -> Duration {
        Duration::from_millis(self.switch_timeout_ms)
    }

    /// Resolution budget for `provider`, falling back to the global one
    pub fn resolve_timeout_for(&self, provider: &str) -> Duration {
        let ms = self
            .providers
            .get(provider)
            .and_then(|p| p.resolve_timeout_ms)
            .unwrap_or(self.resolve_timeout_ms);
        Duration::from_millis(ms)
    }

    /// Position past which "previous" restarts the track
    pub fn previous_restart_threshold(&self) -> Duration {
        Duration::from_millis(self.previous_restart_threshold_ms)
    }
}

// Default values
fn default_switch_timeout_ms() -> u64 {
    3000
}

fn default_resolve_timeout_ms() -> u64 {
    5000
}

fn default_initial_volume() -> f32 {
    crate::volume::DEFAULT_VOLUME
}

fn default_previous_restart_threshold_ms() -> u64 {
    3000
}

fn default_command_capacity() -> usize {
    64
}

fn default_event_capacity() -> usize {
    256
}
