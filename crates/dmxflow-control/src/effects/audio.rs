//! Audio-reactive dimmer effect
//!
//! The audio collaborator pushes one level per analysis window (0.0-1.0,
//! typically RMS). The effect scales it by `gain` and drives every head's
//! dimmer. When samples stop arriving the last level is held.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::dmx::{level_to_dmx, ChannelType, ChannelWrite, FixtureConfig};

/// Stale timeout used when neither the effect nor the engine sets one
pub const DEFAULT_AUDIO_TIMEOUT: Duration = Duration::from_millis(500);

/// Maps the latest audio level to head intensity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioReactivity {
    pub gain: f32,
    /// Silence after which the input is reported stale; `None` uses the
    /// engine's configured audio timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip)]
    pub(crate) level: f32,
    #[serde(skip)]
    pub(crate) since_sample: Duration,
    #[serde(skip)]
    pub(crate) stale: bool,
}

impl AudioReactivity {
    pub fn new(gain: f32) -> Self {
        Self {
            gain,
            timeout_ms: None,
            level: 0.0,
            since_sample: Duration::ZERO,
            stale: false,
        }
    }

    /// Current output level (0.0-1.0)
    pub fn level(&self) -> f32 {
        self.level
    }

    /// True once no sample arrived within the timeout
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub(crate) fn tick(
        &mut self,
        dt: Duration,
        sample: Option<f32>,
        fixture: &FixtureConfig,
        default_timeout: Duration,
    ) -> Vec<ChannelWrite> {
        let timeout = self
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(default_timeout);
        match sample {
            Some(raw) if raw.is_finite() => {
                self.level = (raw * self.gain).clamp(0.0, 1.0);
                self.since_sample = Duration::ZERO;
                self.stale = false;
            }
            _ => {
                self.since_sample += dt;
                if self.since_sample > timeout {
                    self.stale = true;
                }
            }
        }

        let value = level_to_dmx(self.level);
        fixture
            .role_offsets(ChannelType::Dimmer)
            .into_iter()
            .map(|offset| ChannelWrite::new(offset, value))
            .collect()
    }
}

impl Default for AudioReactivity {
    fn default() -> Self {
        Self::new(1.0)
    }
}
