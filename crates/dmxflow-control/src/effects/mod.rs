//! Effect generators
//!
//! Five effect kinds, each a small state machine advanced once per engine
//! tick. Ticking never touches the universe directly: it returns the
//! channel writes for the caller to apply under the buffer lock.
//!
//! ```rust
//! use dmxflow_control::dmx::FixtureConfig;
//! use dmxflow_control::effects::{Effect, EffectContext, Strobe};
//! use std::time::Duration;
//!
//! let fixture = FixtureConfig::default();
//! let mut effect = Effect::Strobe(Strobe::new(4.0));
//! effect.validate().unwrap();
//!
//! let ctx = EffectContext::new(&fixture);
//! let writes = effect.tick(Duration::from_millis(10), &ctx);
//! assert_eq!(writes.len(), 2); // one dimmer per head
//! ```

pub mod audio;
pub mod color;
pub mod patterns;

pub use audio::{AudioReactivity, DEFAULT_AUDIO_TIMEOUT};
pub use color::Rgb;
pub use patterns::{ColorChase, GoboPattern, Rainbow, Strobe};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::dmx::{ChannelWrite, FixtureConfig};
use crate::{error::ControlError, Result};

/// Effect type without parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    ColorChase,
    Strobe,
    Rainbow,
    GoboPattern,
    AudioReactivity,
}

impl EffectKind {
    pub const ALL: [EffectKind; 5] = [
        EffectKind::ColorChase,
        EffectKind::Strobe,
        EffectKind::Rainbow,
        EffectKind::GoboPattern,
        EffectKind::AudioReactivity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::ColorChase => "ColorChase",
            EffectKind::Strobe => "Strobe",
            EffectKind::Rainbow => "Rainbow",
            EffectKind::GoboPattern => "GoboPattern",
            EffectKind::AudioReactivity => "AudioReactivity",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ControlError::Validation(format!("Unknown effect: {}", s)))
    }
}

/// Inputs an effect may read during a tick
#[derive(Debug, Clone, Copy)]
pub struct EffectContext<'a> {
    pub fixture: &'a FixtureConfig,
    /// Audio level received since the previous tick, if any
    pub audio_sample: Option<f32>,
    /// Stale timeout for audio effects without their own
    pub audio_timeout: Duration,
}

impl<'a> EffectContext<'a> {
    pub fn new(fixture: &'a FixtureConfig) -> Self {
        Self {
            fixture,
            audio_sample: None,
            audio_timeout: DEFAULT_AUDIO_TIMEOUT,
        }
    }
}

/// Map the 0-100% speed control onto an effect speed (0.1-10 per second)
pub fn speed_from_percent(percent: u8) -> f32 {
    0.1 + f32::from(percent.min(100)) / 100.0 * 9.9
}

fn check_speed(speed: f32) -> Result<()> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(ControlError::Validation(format!(
            "Effect speed must be > 0 (got {})",
            speed
        )));
    }
    Ok(())
}

/// An effect with its parameters and phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect")]
pub enum Effect {
    ColorChase(ColorChase),
    Strobe(Strobe),
    Rainbow(Rainbow),
    GoboPattern(GoboPattern),
    AudioReactivity(AudioReactivity),
}

impl Effect {
    /// Default parameters for a kind
    pub fn default_for(kind: EffectKind) -> Self {
        match kind {
            EffectKind::ColorChase => Effect::ColorChase(ColorChase::default()),
            EffectKind::Strobe => Effect::Strobe(Strobe::default()),
            EffectKind::Rainbow => Effect::Rainbow(Rainbow::default()),
            EffectKind::GoboPattern => Effect::GoboPattern(GoboPattern::default()),
            EffectKind::AudioReactivity => Effect::AudioReactivity(AudioReactivity::default()),
        }
    }

    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::ColorChase(_) => EffectKind::ColorChase,
            Effect::Strobe(_) => EffectKind::Strobe,
            Effect::Rainbow(_) => EffectKind::Rainbow,
            Effect::GoboPattern(_) => EffectKind::GoboPattern,
            Effect::AudioReactivity(_) => EffectKind::AudioReactivity,
        }
    }

    /// Check parameters before the effect may run
    pub fn validate(&self) -> Result<()> {
        match self {
            Effect::ColorChase(e) => {
                check_speed(e.speed)?;
                if e.colors.is_empty() {
                    return Err(ControlError::Validation(
                        "ColorChase needs at least one color".to_string(),
                    ));
                }
            }
            Effect::Strobe(e) => check_speed(e.speed)?,
            Effect::Rainbow(e) => {
                check_speed(e.speed)?;
                if !e.head_offset.is_finite() {
                    return Err(ControlError::Validation(
                        "Rainbow head offset must be finite".to_string(),
                    ));
                }
            }
            Effect::GoboPattern(e) => {
                check_speed(e.speed)?;
                if e.gobos.is_empty() {
                    return Err(ControlError::Validation(
                        "GoboPattern needs at least one gobo".to_string(),
                    ));
                }
            }
            Effect::AudioReactivity(e) => {
                if !e.gain.is_finite() || e.gain <= 0.0 {
                    return Err(ControlError::Validation(format!(
                        "Audio gain must be > 0 (got {})",
                        e.gain
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rewind to phase 0
    pub fn reset(&mut self) {
        match self {
            Effect::ColorChase(e) => e.phase = 0.0,
            Effect::Strobe(e) => e.phase = 0.0,
            Effect::Rainbow(e) => e.phase = 0.0,
            Effect::GoboPattern(e) => e.phase = 0.0,
            Effect::AudioReactivity(e) => {
                e.level = 0.0;
                e.since_sample = Duration::ZERO;
                e.stale = false;
            }
        }
    }

    /// Speed, for effects that have one
    pub fn speed(&self) -> Option<f32> {
        match self {
            Effect::ColorChase(e) => Some(e.speed),
            Effect::Strobe(e) => Some(e.speed),
            Effect::Rainbow(e) => Some(e.speed),
            Effect::GoboPattern(e) => Some(e.speed),
            Effect::AudioReactivity(_) => None,
        }
    }

    /// Change speed without touching the phase
    pub fn set_speed(&mut self, speed: f32) -> Result<()> {
        check_speed(speed)?;
        match self {
            Effect::ColorChase(e) => e.speed = speed,
            Effect::Strobe(e) => e.speed = speed,
            Effect::Rainbow(e) => e.speed = speed,
            Effect::GoboPattern(e) => e.speed = speed,
            Effect::AudioReactivity(_) => {
                return Err(ControlError::Validation(
                    "AudioReactivity has no speed".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// Replace parameters with those of `update`, keeping the running phase.
    /// `update` must be the same kind and valid.
    pub fn update_parameters(&mut self, mut update: Effect) -> Result<()> {
        if update.kind() != self.kind() {
            return Err(ControlError::Validation(format!(
                "Cannot apply {} parameters to running {}",
                update.kind(),
                self.kind()
            )));
        }
        update.validate()?;

        match (&mut update, &*self) {
            (Effect::ColorChase(new), Effect::ColorChase(old)) => {
                new.phase = old.phase.rem_euclid(new.colors.len() as f32)
            }
            (Effect::Strobe(new), Effect::Strobe(old)) => new.phase = old.phase,
            (Effect::Rainbow(new), Effect::Rainbow(old)) => new.phase = old.phase,
            (Effect::GoboPattern(new), Effect::GoboPattern(old)) => {
                new.phase = old.phase.rem_euclid(new.gobos.len() as f32)
            }
            (Effect::AudioReactivity(new), Effect::AudioReactivity(old)) => {
                new.level = old.level;
                new.since_sample = old.since_sample;
                new.stale = old.stale;
            }
            _ => {}
        }
        *self = update;
        Ok(())
    }

    /// True if this is an audio effect whose input went stale
    pub fn audio_stale(&self) -> bool {
        matches!(self, Effect::AudioReactivity(e) if e.is_stale())
    }

    /// Advance by `dt` and return the channel writes for this tick
    pub fn tick(&mut self, dt: Duration, ctx: &EffectContext<'_>) -> Vec<ChannelWrite> {
        let secs = dt.as_secs_f32();
        match self {
            Effect::ColorChase(e) => e.tick(secs, ctx.fixture),
            Effect::Strobe(e) => e.tick(secs, ctx.fixture),
            Effect::Rainbow(e) => e.tick(secs, ctx.fixture),
            Effect::GoboPattern(e) => e.tick(secs, ctx.fixture),
            Effect::AudioReactivity(e) => e.tick(dt, ctx.audio_sample, ctx.fixture, ctx.audio_timeout),
        }
    }
}
