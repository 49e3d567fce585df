//! Engine configuration
//!
//! Loaded from a JSON file (every field optional), then overridden by the
//! `DMX_PORT` and `DMX_BAUDRATE` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dmx::frame::MAX_BREAK_TO_BREAK;
use crate::dmx::{FixtureConfig, FrameTiming, DMX_BAUD_RATE};
use crate::effects::DEFAULT_AUDIO_TIMEOUT;
use crate::logging::LogConfig;
use crate::{error::ControlError, Result};

/// Environment variable overriding the serial device
pub const ENV_PORT: &str = "DMX_PORT";
/// Environment variable overriding the baud rate
pub const ENV_BAUD_RATE: &str = "DMX_BAUDRATE";

fn default_port() -> String {
    "/dev/serial0".to_string()
}

fn default_baud_rate() -> u32 {
    DMX_BAUD_RATE
}

fn default_refresh_interval_ms() -> u64 {
    23
}

fn default_break_us() -> u64 {
    200
}

fn default_mark_after_break_us() -> u64 {
    48
}

fn default_write_timeout_ms() -> u64 {
    100
}

fn default_effect_interval_ms() -> u64 {
    10
}

fn default_audio_timeout_ms() -> u64 {
    DEFAULT_AUDIO_TIMEOUT.as_millis() as u64
}

fn default_scene_dir() -> PathBuf {
    PathBuf::from("scenes")
}

/// Runtime settings for one engine instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Serial device driving the RS-485 line
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Time between frame starts
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_break_us")]
    pub break_us: u64,
    #[serde(default = "default_mark_after_break_us")]
    pub mark_after_break_us: u64,
    /// Upper bound on one serial write
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Effect and sequencer tick period
    #[serde(default = "default_effect_interval_ms")]
    pub effect_interval_ms: u64,
    /// Silence after which audio input counts as stale
    #[serde(default = "default_audio_timeout_ms")]
    pub audio_timeout_ms: u64,
    #[serde(default = "default_scene_dir")]
    pub scene_dir: PathBuf,
    #[serde(default)]
    pub fixture: FixtureConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            refresh_interval_ms: default_refresh_interval_ms(),
            break_us: default_break_us(),
            mark_after_break_us: default_mark_after_break_us(),
            write_timeout_ms: default_write_timeout_ms(),
            effect_interval_ms: default_effect_interval_ms(),
            audio_timeout_ms: default_audio_timeout_ms(),
            scene_dir: default_scene_dir(),
            fixture: FixtureConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply `DMX_PORT` / `DMX_BAUDRATE` from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(ENV_PORT).ok(),
            std::env::var(ENV_BAUD_RATE).ok(),
        )
    }

    /// Apply explicit port / baud rate overrides
    pub fn apply_overrides(&mut self, port: Option<String>, baud_rate: Option<String>) -> Result<()> {
        if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
            self.port = port.trim().to_string();
        }
        if let Some(raw) = baud_rate {
            self.baud_rate = raw.trim().parse().map_err(|_| {
                ControlError::Configuration(format!("{} is not a valid baud rate: {:?}", ENV_BAUD_RATE, raw))
            })?;
        }
        Ok(())
    }

    pub fn timing(&self) -> FrameTiming {
        FrameTiming {
            break_time: Duration::from_micros(self.break_us),
            mark_after_break: Duration::from_micros(self.mark_after_break_us),
            baud_rate: self.baud_rate,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn effect_interval(&self) -> Duration {
        Duration::from_millis(self.effect_interval_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn audio_timeout(&self) -> Duration {
        Duration::from_millis(self.audio_timeout_ms)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        self.fixture.validate()?;

        if self.baud_rate == 0 {
            return Err(ControlError::Configuration("Baud rate must be > 0".to_string()));
        }
        if self.baud_rate != DMX_BAUD_RATE {
            tracing::warn!(
                "Baud rate {} differs from the DMX512 rate of {}",
                self.baud_rate,
                DMX_BAUD_RATE
            );
        }

        let timing = self.timing();
        timing.validate()?;
        let min = timing.min_frame_interval();
        if self.refresh_interval() < min {
            return Err(ControlError::Configuration(format!(
                "Refresh interval {}ms is shorter than one frame ({:?})",
                self.refresh_interval_ms, min
            )));
        }
        if self.refresh_interval() > MAX_BREAK_TO_BREAK {
            return Err(ControlError::Configuration(format!(
                "Refresh interval {}ms exceeds the DMX maximum of {:?}",
                self.refresh_interval_ms, MAX_BREAK_TO_BREAK
            )));
        }

        if self.effect_interval_ms == 0 {
            return Err(ControlError::Configuration(
                "Effect interval must be > 0".to_string(),
            ));
        }
        if self.write_timeout_ms == 0 {
            return Err(ControlError::Configuration(
                "Write timeout must be > 0".to_string(),
            ));
        }
        if self.audio_timeout_ms == 0 {
            return Err(ControlError::Configuration(
                "Audio timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
