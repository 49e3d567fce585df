//! Engine status events
//!
//! The engine reports what it does (effect started, transmission failing,
//! configuration rejected, ...) to an [`EventSink`]. Sinks must not block:
//! they are called from the timing loops.

use crossbeam_channel::{Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::dmx::FixtureConfig;
use crate::effects::EffectKind;

/// Something the engine did or observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    EffectStarted { kind: EffectKind },
    EffectStopped { kind: EffectKind },
    SequenceStarted { steps: usize, looping: bool },
    /// Non-looping sequence reached its last step
    SequenceFinished,
    SequenceStopped,
    SceneSaved { name: String },
    SceneLoaded { name: String },
    Blackout,
    FixtureReconfigured { config: FixtureConfig },
    InvalidConfiguration { reason: String },
    TransmissionFailed { transport: String, error: String },
    TransmissionRecovered { transport: String, failed_frames: u64 },
    /// No audio sample within the timeout; the last level is held
    AudioStale,
}

/// Indicator colour shown by a status LED collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLight {
    /// Green: manual control only
    Idle,
    /// Blue: an effect or sequence drives the fixtures
    Active,
}

impl StatusLight {
    /// RGB triple for the indicator
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            StatusLight::Idle => (0, 255, 0),
            StatusLight::Active => (0, 0, 255),
        }
    }
}

impl EngineEvent {
    /// Indicator change implied by this event, if any
    pub fn status_light(&self) -> Option<StatusLight> {
        match self {
            EngineEvent::EffectStarted { .. } | EngineEvent::SequenceStarted { .. } => {
                Some(StatusLight::Active)
            }
            EngineEvent::EffectStopped { .. }
            | EngineEvent::SequenceStopped
            | EngineEvent::SequenceFinished => Some(StatusLight::Idle),
            _ => None,
        }
    }
}

/// Receiver of engine events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Sink that drops everything
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Sink that writes events to the tracing subscriber
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: EngineEvent) {
        match &event {
            EngineEvent::TransmissionFailed { transport, error } => {
                tracing::warn!(transport = %transport, error = %error, "DMX transmission failing");
            }
            EngineEvent::InvalidConfiguration { reason } => {
                tracing::warn!(reason = %reason, "Rejected configuration");
            }
            EngineEvent::AudioStale => {
                tracing::warn!("Audio input stale, holding last level");
            }
            other => tracing::info!(event = ?other, "Engine event"),
        }
    }
}

/// Sink that forwards events to a channel. Full or closed channels drop
/// the event instead of blocking the caller.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<EngineEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<EngineEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: EngineEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::trace!("Event channel full, dropping event");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::trace!("Event channel closed, dropping event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_light_mapping() {
        let started = EngineEvent::EffectStarted {
            kind: EffectKind::Strobe,
        };
        assert_eq!(started.status_light(), Some(StatusLight::Active));
        assert_eq!(
            EngineEvent::SequenceFinished.status_light(),
            Some(StatusLight::Idle)
        );
        assert_eq!(EngineEvent::Blackout.status_light(), None);
        assert_eq!(StatusLight::Active.rgb(), (0, 0, 255));
    }

    #[test]
    fn test_channel_sink_never_blocks() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let sink = ChannelSink::new(tx);

        sink.emit(EngineEvent::Blackout);
        // Channel is full; must return immediately
        sink.emit(EngineEvent::SequenceStopped);

        assert_eq!(rx.try_recv().unwrap(), EngineEvent::Blackout);
        assert!(rx.try_recv().is_err());

        drop(rx);
        sink.emit(EngineEvent::Blackout);
    }
}
