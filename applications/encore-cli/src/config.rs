/// CLI configuration
use anyhow::{bail, Context, Result};
use encore_playback::PlayerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub library: LibrarySettings,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibrarySettings {
    /// Playlist loaded at startup when none is given on the command line
    #[serde(default)]
    pub playlist: Option<PathBuf>,
}

/// Knobs for the simulated device and resolver
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_resolve_latency_ms")]
    pub resolve_latency_ms: u64,

    /// Used for tracks whose playlist entry has no duration
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u64,
}

impl SimulationSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn resolve_latency(&self) -> Duration {
        Duration::from_millis(self.resolve_latency_ms)
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        default_simulation()
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist. Without one, `config.toml` in the
    /// working directory is used when present. `ENCORE_*` variables override
    /// file values, with `__` between nested keys
    /// (`ENCORE_PLAYER__SWITCH_TIMEOUT_MS=5000`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    bail!("config file not found: {}", path.display());
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let config_path = PathBuf::from("config.toml");
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("ENCORE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.player.validate()?;

        if self.simulation.tick_ms == 0 {
            bail!("simulation.tick_ms must be greater than zero");
        }

        Ok(())
    }
}

// Default values
fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        tick_ms: default_tick_ms(),
        resolve_latency_ms: default_resolve_latency_ms(),
        default_duration_ms: default_duration_ms(),
    }
}

fn default_tick_ms() -> u64 {
    250
}

fn default_resolve_latency_ms() -> u64 {
    150
}

fn default_duration_ms() -> u64 {
    30_000
}
