//! Timed step playback
//!
//! A [`Sequence`] is an immutable list of steps; each step overwrites some
//! or all universe channels and is then held for its duration. Sequences
//! come from [`SequenceDef`] data and are validated as a whole before the
//! first step can reach the buffer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::dmx::{ChannelWrite, UNIVERSE_SIZE};
use crate::{error::ControlError, Result};

/// Shortest hold a step may have
pub const MIN_STEP_HOLD: Duration = Duration::from_millis(1);

/// One validated step: channel writes plus hold time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStep {
    writes: Vec<ChannelWrite>,
    hold: Duration,
}

impl SequenceStep {
    /// Build a step from 1-based DMX channels
    pub fn new(channels: &[(u16, u8)], hold: Duration) -> Result<Self> {
        if hold < MIN_STEP_HOLD {
            return Err(ControlError::Validation(format!(
                "Step hold duration must be at least {}ms (got {:?})",
                MIN_STEP_HOLD.as_millis(),
                hold
            )));
        }
        let mut writes = Vec::with_capacity(channels.len());
        for &(channel, value) in channels {
            if channel == 0 || channel as usize > UNIVERSE_SIZE {
                return Err(ControlError::Validation(format!(
                    "Channel {} out of range (1-{})",
                    channel, UNIVERSE_SIZE
                )));
            }
            writes.push(ChannelWrite::new(channel as usize - 1, value));
        }
        Ok(Self { writes, hold })
    }

    pub fn writes(&self) -> &[ChannelWrite] {
        &self.writes
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }
}

/// Validated, immutable step list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    name: Option<String>,
    steps: Vec<SequenceStep>,
    looping: bool,
}

impl Sequence {
    pub fn new(steps: Vec<SequenceStep>, looping: bool) -> Result<Self> {
        if steps.is_empty() {
            return Err(ControlError::Validation(
                "Sequence has no steps".to_string(),
            ));
        }
        Ok(Self {
            name: None,
            steps,
            looping,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn steps(&self) -> &[SequenceStep] {
        &self.steps
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Length of one pass through all steps
    pub fn cycle_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.hold).sum()
    }
}

/// Step as supplied by a sequence source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
    /// 1-based DMX channel -> value
    pub channels: BTreeMap<i64, i64>,
    pub duration_ms: Option<i64>,
}

/// Sequence as supplied by a sequence source (JSON file, OSC, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "loop", default)]
    pub looping: bool,
    pub steps: Vec<StepDef>,
}

impl SequenceDef {
    /// Parse sequence data. Malformed content is a validation error.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ControlError::Validation(format!("Malformed sequence: {}", e)))
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every step and build the playable sequence.
    /// Any malformed step rejects the whole sequence.
    pub fn validate(&self) -> Result<Sequence> {
        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let duration_ms = step.duration_ms.ok_or_else(|| {
                ControlError::Validation(format!("Step {} has no duration", index))
            })?;
            if duration_ms <= 0 {
                return Err(ControlError::Validation(format!(
                    "Step {} has non-positive duration {}ms",
                    index, duration_ms
                )));
            }

            let mut channels = Vec::with_capacity(step.channels.len());
            for (&channel, &value) in &step.channels {
                if !(1..=UNIVERSE_SIZE as i64).contains(&channel) {
                    return Err(ControlError::Validation(format!(
                        "Step {}: channel {} out of range (1-{})",
                        index, channel, UNIVERSE_SIZE
                    )));
                }
                if !(0..=255).contains(&value) {
                    return Err(ControlError::Validation(format!(
                        "Step {}: value {} for channel {} out of range (0-255)",
                        index, value, channel
                    )));
                }
                channels.push((channel as u16, value as u8));
            }

            steps.push(SequenceStep::new(
                &channels,
                Duration::from_millis(duration_ms as u64),
            )?);
        }

        let sequence = Sequence::new(steps, self.looping)?;
        Ok(match &self.name {
            Some(name) => sequence.with_name(name.clone()),
            None => sequence,
        })
    }
}

/// Sequencer playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerState {
    Idle,
    Running,
    Stopped,
}

/// Result of advancing the sequencer
#[derive(Debug, Default)]
pub struct SequencerTick {
    pub writes: Vec<ChannelWrite>,
    /// A non-looping sequence just finished its last step
    pub finished: bool,
}

/// Plays one sequence at a time
#[derive(Debug)]
pub struct Sequencer {
    state: SequencerState,
    sequence: Option<Sequence>,
    current_step: usize,
    elapsed: Duration,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            state: SequencerState::Idle,
            sequence: None,
            current_step: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Start `sequence` from step 0, replacing any current playback.
    /// Returns the writes of the first step.
    pub fn play(&mut self, sequence: Sequence) -> Vec<ChannelWrite> {
        let first = sequence.steps[0].writes.clone();
        self.sequence = Some(sequence);
        self.current_step = 0;
        self.elapsed = Duration::ZERO;
        self.state = SequencerState::Running;
        first
    }

    /// Stop immediately; channel values stay where they are
    pub fn stop(&mut self) {
        if self.state == SequencerState::Running {
            self.state = SequencerState::Stopped;
        }
    }

    /// Advance playback by `dt`
    pub fn tick(&mut self, dt: Duration) -> SequencerTick {
        let mut tick = SequencerTick::default();
        if self.state != SequencerState::Running {
            return tick;
        }
        let Some(sequence) = self.sequence.as_ref() else {
            self.state = SequencerState::Idle;
            return tick;
        };

        self.elapsed += dt;
        // After a long stall replay at most two passes; the buffer ends the same
        let cycle = sequence.cycle_duration();
        if sequence.looping && self.elapsed >= cycle * 2 {
            let remainder = self.elapsed.as_nanos() % cycle.as_nanos();
            self.elapsed = cycle + Duration::from_nanos(remainder as u64);
        }
        loop {
            let hold = sequence.steps[self.current_step].hold;
            if self.elapsed < hold {
                break;
            }
            self.elapsed -= hold;

            if self.current_step + 1 < sequence.steps.len() {
                self.current_step += 1;
            } else if sequence.looping {
                self.current_step = 0;
            } else {
                self.state = SequencerState::Idle;
                self.elapsed = Duration::ZERO;
                tick.finished = true;
                break;
            }
            tick.writes
                .extend_from_slice(&sequence.steps[self.current_step].writes);
        }
        tick
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SequencerState::Running
    }

    /// Index of the step currently on the buffer
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    /// Fraction of the current pass completed (0.0-1.0)
    pub fn progress(&self) -> f32 {
        match &self.sequence {
            Some(sequence) => {
                let done: Duration = sequence.steps[..self.current_step]
                    .iter()
                    .map(|s| s.hold)
                    .sum::<Duration>()
                    + self.elapsed;
                let total = sequence.cycle_duration().as_secs_f32();
                if total > 0.0 {
                    (done.as_secs_f32() / total).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
