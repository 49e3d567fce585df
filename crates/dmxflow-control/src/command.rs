//! Command surface
//!
//! [`CommandSurface`] owns the channel buffer and is the only way to change
//! it. Every request (manual write, effect start/stop, sequence play/stop,
//! scene load, blackout, driver tick) runs under one lock, so no request
//! ever observes or produces a half-applied buffer. At most one automatic
//! driver is active: starting an effect stops the sequencer and playing a
//! sequence stops the effect. Manual writes are always accepted; a running
//! driver overwrites them on its next tick.
//!
//! Events are collected under the lock and emitted after it is released.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::dmx::{clamp_dmx, ChannelBuffer, ChannelType, ChannelWrite, FixtureConfig, UNIVERSE_SIZE};
use crate::effects::{
    speed_from_percent, Effect, EffectContext, EffectKind, Rgb, DEFAULT_AUDIO_TIMEOUT,
};
use crate::events::{EngineEvent, EventSink};
use crate::scene::{Scene, SceneStore};
use crate::sequencer::{Sequence, SequenceDef, Sequencer, SequencerState};
use crate::{error::ControlError, Result};

/// Request shapes accepted from collaborators (console, OSC, IR, audio)
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Head-relative write; `channel` is the 0-based logical channel
    ManualValue { head: u16, channel: u16, value: i32 },
    /// Absolute 1-based universe channel
    DmxValue { channel: u16, value: i32 },
    Color(Rgb),
    StartEffect(Effect),
    StopEffect,
    /// Speed slider, 0-100 %
    EffectSpeed { percent: u8 },
    AudioLevel(f32),
    IrTriggered,
    Blackout,
    SaveScene { name: String },
    LoadScene { name: String },
    PlaySequence(Sequence),
    StopSequence,
}

/// Point-in-time view of the engine for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub fixture: FixtureConfig,
    pub effect: Option<EffectKind>,
    pub sequencer: SequencerState,
    pub sequence_step: usize,
}

struct EngineState {
    buffer: ChannelBuffer,
    fixture: FixtureConfig,
    effect: Option<Effect>,
    sequencer: Sequencer,
    pending_audio: Option<f32>,
    audio_stale_reported: bool,
}

impl EngineState {
    /// Stop whichever driver is active, returning the matching events
    fn stop_drivers(&mut self, events: &mut Vec<EngineEvent>) {
        if let Some(effect) = self.effect.take() {
            events.push(EngineEvent::EffectStopped {
                kind: effect.kind(),
            });
        }
        if self.sequencer.is_running() {
            self.sequencer.stop();
            events.push(EngineEvent::SequenceStopped);
        }
    }
}

/// Synchronized owner of the universe
pub struct CommandSurface {
    state: Mutex<EngineState>,
    scenes: Arc<dyn SceneStore>,
    sink: Arc<dyn EventSink>,
    audio_timeout: Duration,
}

impl CommandSurface {
    /// Create a surface with a dark universe
    pub fn new(
        fixture: FixtureConfig,
        scenes: Arc<dyn SceneStore>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        fixture.validate()?;
        Ok(Self {
            state: Mutex::new(EngineState {
                buffer: ChannelBuffer::new(),
                fixture,
                effect: None,
                sequencer: Sequencer::new(),
                pending_audio: None,
                audio_stale_reported: false,
            }),
            scenes,
            sink,
            audio_timeout: DEFAULT_AUDIO_TIMEOUT,
        })
    }

    /// Stale timeout for audio effects started without their own
    pub fn with_audio_timeout(mut self, timeout: Duration) -> Self {
        self.audio_timeout = timeout;
        self
    }

    pub fn audio_timeout(&self) -> Duration {
        self.audio_timeout
    }

    fn emit_all(&self, events: Vec<EngineEvent>) {
        for event in events {
            self.sink.emit(event);
        }
    }

    // ===== Manual control =====

    /// Write a head's logical channel; `value` is clamped to 0-255
    pub fn set_channel(&self, head: u16, channel: u16, value: i32) -> Result<()> {
        let mut state = self.state.lock();
        let offset = state.fixture.offset(head, channel)?;
        state.buffer.set(offset, clamp_dmx(i64::from(value)))
    }

    /// Write an absolute 1-based DMX channel; `value` is clamped to 0-255
    pub fn set_dmx_channel(&self, channel: u16, value: i32) -> Result<()> {
        if channel == 0 || channel as usize > UNIVERSE_SIZE {
            return Err(ControlError::Validation(format!(
                "DMX channel {} out of range (1-{})",
                channel, UNIVERSE_SIZE
            )));
        }
        let mut state = self.state.lock();
        state
            .buffer
            .set(channel as usize - 1, clamp_dmx(i64::from(value)))
    }

    /// Apply one colour to every head
    pub fn set_color(&self, color: Rgb) {
        let mut state = self.state.lock();
        let mut writes = Vec::new();
        for (role, value) in [
            (ChannelType::Red, color.r),
            (ChannelType::Green, color.g),
            (ChannelType::Blue, color.b),
        ] {
            writes.extend(
                state
                    .fixture
                    .role_offsets(role)
                    .into_iter()
                    .map(|offset| ChannelWrite::new(offset, value)),
            );
        }
        state.buffer.apply(&writes);
    }

    /// Zero the whole universe. The active driver keeps running.
    pub fn blackout(&self) {
        self.state.lock().buffer.clear();
        tracing::info!("Blackout");
        self.sink.emit(EngineEvent::Blackout);
    }

    // ===== Fixture patch =====

    /// Replace the fixture patch. An invalid patch leaves the old one in
    /// place and is reported to the sink.
    pub fn configure(&self, config: FixtureConfig) -> Result<()> {
        if let Err(e) = config.validate() {
            tracing::warn!("Rejected fixture configuration {:?}: {}", config, e);
            self.sink.emit(EngineEvent::InvalidConfiguration {
                reason: e.to_string(),
            });
            return Err(e);
        }

        self.state.lock().fixture = config;
        tracing::info!("Fixture patch now {}", config);
        self.sink
            .emit(EngineEvent::FixtureReconfigured { config });
        Ok(())
    }

    pub fn fixture(&self) -> FixtureConfig {
        self.state.lock().fixture
    }

    // ===== Effects =====

    /// Start `effect` from phase 0, stopping any running effect or
    /// sequence. Returns the kind of the effect it displaced.
    pub fn start_effect(&self, mut effect: Effect) -> Result<Option<EffectKind>> {
        effect.validate()?;
        effect.reset();
        let kind = effect.kind();

        let mut events = Vec::new();
        let previous = {
            let mut state = self.state.lock();
            let previous = state.effect.as_ref().map(Effect::kind);
            state.stop_drivers(&mut events);
            state.effect = Some(effect);
            state.pending_audio = None;
            state.audio_stale_reported = false;
            previous
        };
        events.push(EngineEvent::EffectStarted { kind });

        tracing::info!("Effect {} started", kind);
        self.emit_all(events);
        Ok(previous)
    }

    /// Stop the running effect. Channel values stay as last written.
    pub fn stop_effect(&self) -> Option<EffectKind> {
        let stopped = self.state.lock().effect.take().map(|e| e.kind());
        if let Some(kind) = stopped {
            tracing::info!("Effect {} stopped", kind);
            self.sink.emit(EngineEvent::EffectStopped { kind });
        }
        stopped
    }

    /// Swap the running effect's parameters, keeping its phase
    pub fn set_effect_parameters(&self, update: Effect) -> Result<()> {
        let mut state = self.state.lock();
        match state.effect.as_mut() {
            Some(effect) => effect.update_parameters(update),
            None => Err(ControlError::NotFound("running effect".to_string())),
        }
    }

    /// Set the running effect's speed from the 0-100 % slider
    pub fn set_effect_speed_percent(&self, percent: u8) -> Result<()> {
        let mut state = self.state.lock();
        match state.effect.as_mut() {
            Some(effect) => effect.set_speed(speed_from_percent(percent)),
            None => Err(ControlError::NotFound("running effect".to_string())),
        }
    }

    pub fn active_effect(&self) -> Option<EffectKind> {
        self.state.lock().effect.as_ref().map(Effect::kind)
    }

    /// Copy of the running effect with its current phase
    pub fn effect(&self) -> Option<Effect> {
        self.state.lock().effect.clone()
    }

    /// Hand the latest audio level to the audio effect's next tick
    pub fn submit_audio_level(&self, level: f32) {
        self.state.lock().pending_audio = Some(level);
    }

    // ===== Sequences =====

    /// Play a validated sequence from step 0. The first step is written
    /// immediately; any running effect or sequence is stopped.
    pub fn play_sequence(&self, sequence: Sequence) {
        let started = EngineEvent::SequenceStarted {
            steps: sequence.steps().len(),
            looping: sequence.is_looping(),
        };

        let mut events = Vec::new();
        {
            let mut state = self.state.lock();
            state.stop_drivers(&mut events);
            let first = state.sequencer.play(sequence);
            state.buffer.apply(&first);
        }
        events.push(started);

        tracing::info!("Sequence started");
        self.emit_all(events);
    }

    /// Validate sequence data and play it. Invalid data leaves the buffer
    /// untouched.
    pub fn play_sequence_def(&self, def: &SequenceDef) -> Result<()> {
        let sequence = def.validate()?;
        self.play_sequence(sequence);
        Ok(())
    }

    /// Stop playback, leaving current values in place
    pub fn stop_sequence(&self) -> bool {
        let stopped = {
            let mut state = self.state.lock();
            let running = state.sequencer.is_running();
            state.sequencer.stop();
            running
        };
        if stopped {
            tracing::info!("Sequence stopped");
            self.sink.emit(EngineEvent::SequenceStopped);
        }
        stopped
    }

    pub fn sequencer_state(&self) -> SequencerState {
        self.state.lock().sequencer.state()
    }

    // ===== Scenes =====

    /// Capture the buffer and patch under `name`, replacing any scene of
    /// the same name
    pub fn save_scene(&self, name: &str) -> Result<()> {
        let scene = {
            let state = self.state.lock();
            Scene::capture(name, &state.buffer, state.fixture)?
        };
        self.scenes.put(scene)?;

        tracing::info!("Scene '{}' saved", name);
        self.sink.emit(EngineEvent::SceneSaved {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Replace the live buffer with a stored scene. A scene captured under
    /// an incompatible patch is rejected and nothing changes.
    pub fn load_scene(&self, name: &str) -> Result<()> {
        let scene = self.scenes.get(name)?;

        let resolved = {
            let mut state = self.state.lock();
            scene
                .resolve(&state.buffer, &state.fixture)
                .map(|buffer| state.buffer = buffer)
        };

        match resolved {
            Ok(()) => {
                tracing::info!("Scene '{}' loaded", name);
                self.sink.emit(EngineEvent::SceneLoaded {
                    name: name.to_string(),
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Scene '{}' not loaded: {}", name, e);
                if let ControlError::Configuration(reason) = &e {
                    self.sink.emit(EngineEvent::InvalidConfiguration {
                        reason: reason.clone(),
                    });
                }
                Err(e)
            }
        }
    }

    pub fn list_scenes(&self) -> Result<Vec<String>> {
        self.scenes.list()
    }

    pub fn delete_scene(&self, name: &str) -> Result<()> {
        self.scenes.delete(name)?;
        tracing::info!("Scene '{}' deleted", name);
        Ok(())
    }

    // ===== Readers =====

    /// Consistent copy of the whole universe
    pub fn snapshot(&self) -> [u8; UNIVERSE_SIZE] {
        self.state.lock().buffer.snapshot()
    }

    pub fn status(&self) -> EngineStatus {
        let state = self.state.lock();
        EngineStatus {
            fixture: state.fixture,
            effect: state.effect.as_ref().map(Effect::kind),
            sequencer: state.sequencer.state(),
            sequence_step: state.sequencer.current_step(),
        }
    }

    // ===== Driver =====

    /// Advance the active effect or sequence by `dt` and apply its writes
    pub fn tick(&self, dt: Duration) {
        let mut events = Vec::new();
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let audio_sample = state.pending_audio.take();

            if let Some(effect) = state.effect.as_mut() {
                let ctx = EffectContext {
                    fixture: &state.fixture,
                    audio_sample,
                    audio_timeout: self.audio_timeout,
                };
                let writes = effect.tick(dt, &ctx);
                state.buffer.apply(&writes);

                let stale = effect.audio_stale();
                if stale && !state.audio_stale_reported {
                    events.push(EngineEvent::AudioStale);
                }
                state.audio_stale_reported = stale;
            } else if state.sequencer.is_running() {
                let step = state.sequencer.tick(dt);
                state.buffer.apply(&step.writes);
                if step.finished {
                    events.push(EngineEvent::SequenceFinished);
                }
            }
        }

        if events.contains(&EngineEvent::SequenceFinished) {
            tracing::info!("Sequence finished");
        }
        self.emit_all(events);
    }

    /// Dispatch a collaborator request
    pub fn handle(&self, event: ControlEvent) -> Result<()> {
        match event {
            ControlEvent::ManualValue {
                head,
                channel,
                value,
            } => self.set_channel(head, channel, value),
            ControlEvent::DmxValue { channel, value } => self.set_dmx_channel(channel, value),
            ControlEvent::Color(color) => {
                self.set_color(color);
                Ok(())
            }
            ControlEvent::StartEffect(effect) => self.start_effect(effect).map(|_| ()),
            ControlEvent::StopEffect => {
                self.stop_effect();
                Ok(())
            }
            ControlEvent::EffectSpeed { percent } => self.set_effect_speed_percent(percent),
            ControlEvent::AudioLevel(level) => {
                self.submit_audio_level(level);
                Ok(())
            }
            ControlEvent::IrTriggered => {
                tracing::info!("IR trigger, starting color chase");
                self.start_effect(Effect::default_for(EffectKind::ColorChase))
                    .map(|_| ())
            }
            ControlEvent::Blackout => {
                self.blackout();
                Ok(())
            }
            ControlEvent::SaveScene { name } => self.save_scene(&name),
            ControlEvent::LoadScene { name } => self.load_scene(&name),
            ControlEvent::PlaySequence(sequence) => {
                self.play_sequence(sequence);
                Ok(())
            }
            ControlEvent::StopSequence => {
                self.stop_sequence();
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for CommandSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSurface")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmx::FixtureMode;
    use crate::effects::{AudioReactivity, Strobe};
    use crate::events::ChannelSink;
    use crate::scene::MemorySceneStore;
    use crate::sequencer::SequenceStep;
    use crossbeam_channel::Receiver;

    fn surface() -> (CommandSurface, Receiver<EngineEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let surface = CommandSurface::new(
            FixtureConfig::default(),
            Arc::new(MemorySceneStore::new()),
            Arc::new(ChannelSink::new(tx)),
        )
        .unwrap();
        (surface, rx)
    }

    fn drain(rx: &Receiver<EngineEvent>) -> Vec<EngineEvent> {
        rx.try_iter().collect()
    }

    fn alternating(looping: bool) -> Sequence {
        Sequence::new(
            vec![
                SequenceStep::new(&[(1, 255)], Duration::from_millis(100)).unwrap(),
                SequenceStep::new(&[(1, 0)], Duration::from_millis(100)).unwrap(),
            ],
            looping,
        )
        .unwrap()
    }

    #[test]
    fn test_set_channel_offsets_and_clamps() {
        let (surface, _rx) = surface();
        surface.set_channel(1, 2, 300).unwrap();
        surface.set_channel(0, 0, -5).unwrap();

        let frame = surface.snapshot();
        assert_eq!(frame[9 + 2], 255);
        assert_eq!(frame[0], 0);

        assert!(matches!(
            surface.set_channel(2, 0, 10),
            Err(ControlError::Validation(_))
        ));
        assert!(matches!(
            surface.set_channel(0, 9, 10),
            Err(ControlError::Validation(_))
        ));
    }

    #[test]
    fn test_set_dmx_channel_bounds() {
        let (surface, _rx) = surface();
        surface.set_dmx_channel(512, 77).unwrap();
        assert_eq!(surface.snapshot()[511], 77);
        assert!(surface.set_dmx_channel(0, 1).is_err());
        assert!(surface.set_dmx_channel(513, 1).is_err());
    }

    #[test]
    fn test_set_color_every_head() {
        let (surface, _rx) = surface();
        surface.set_color(Rgb::new(10, 20, 30));
        let frame = surface.snapshot();
        assert_eq!(&frame[3..6], &[10, 20, 30]);
        assert_eq!(&frame[12..15], &[10, 20, 30]);
    }

    #[test]
    fn test_blackout_keeps_driver() {
        let (surface, rx) = surface();
        surface.set_dmx_channel(400, 9).unwrap();
        surface
            .start_effect(Effect::Strobe(Strobe::new(1.0)))
            .unwrap();
        surface.blackout();

        assert!(surface.snapshot().iter().all(|&v| v == 0));
        assert_eq!(surface.active_effect(), Some(EffectKind::Strobe));
        assert!(drain(&rx).contains(&EngineEvent::Blackout));
    }

    #[test]
    fn test_configure_rejects_without_change() {
        let (surface, rx) = surface();
        let bad = FixtureConfig {
            mode: FixtureMode::FourteenChannel,
            start_address: 500,
            head_count: 2,
        };
        assert!(matches!(
            surface.configure(bad),
            Err(ControlError::Configuration(_))
        ));
        assert_eq!(surface.fixture(), FixtureConfig::default());
        assert!(matches!(
            drain(&rx).as_slice(),
            [EngineEvent::InvalidConfiguration { .. }]
        ));

        let good = FixtureConfig::new(FixtureMode::FourteenChannel, 1, 4).unwrap();
        surface.configure(good).unwrap();
        assert_eq!(surface.fixture(), good);
    }

    #[test]
    fn test_starting_effect_replaces_previous() {
        let (surface, rx) = surface();
        assert_eq!(
            surface
                .start_effect(Effect::default_for(EffectKind::Rainbow))
                .unwrap(),
            None
        );
        let previous = surface
            .start_effect(Effect::default_for(EffectKind::Strobe))
            .unwrap();
        assert_eq!(previous, Some(EffectKind::Rainbow));
        assert_eq!(surface.active_effect(), Some(EffectKind::Strobe));

        let events = drain(&rx);
        assert_eq!(
            events,
            vec![
                EngineEvent::EffectStarted {
                    kind: EffectKind::Rainbow
                },
                EngineEvent::EffectStopped {
                    kind: EffectKind::Rainbow
                },
                EngineEvent::EffectStarted {
                    kind: EffectKind::Strobe
                },
            ]
        );
    }

    #[test]
    fn test_invalid_effect_keeps_running_one() {
        let (surface, _rx) = surface();
        surface
            .start_effect(Effect::default_for(EffectKind::Rainbow))
            .unwrap();
        assert!(surface
            .start_effect(Effect::Strobe(Strobe::new(0.0)))
            .is_err());
        assert_eq!(surface.active_effect(), Some(EffectKind::Rainbow));
    }

    #[test]
    fn test_stop_effect_leaves_last_frame() {
        let (surface, _rx) = surface();
        surface
            .start_effect(Effect::Strobe(Strobe::new(1.0)))
            .unwrap();
        surface.tick(Duration::from_millis(10));
        assert_eq!(surface.snapshot()[2], 255);

        assert_eq!(surface.stop_effect(), Some(EffectKind::Strobe));
        surface.tick(Duration::from_millis(600));
        assert_eq!(surface.snapshot()[2], 255);
        assert_eq!(surface.stop_effect(), None);
    }

    #[test]
    fn test_manual_write_over_effect_is_overwritten_next_tick() {
        let (surface, _rx) = surface();
        surface
            .start_effect(Effect::Strobe(Strobe::new(1.0)))
            .unwrap();
        surface.set_channel(0, 2, 17).unwrap();
        assert_eq!(surface.snapshot()[2], 17);
        surface.tick(Duration::from_millis(10));
        assert_eq!(surface.snapshot()[2], 255);
    }

    #[test]
    fn test_effect_speed_needs_running_effect() {
        let (surface, _rx) = surface();
        assert!(matches!(
            surface.set_effect_speed_percent(50),
            Err(ControlError::NotFound(_))
        ));
        surface
            .start_effect(Effect::default_for(EffectKind::GoboPattern))
            .unwrap();
        surface.set_effect_speed_percent(100).unwrap();
        let speed = surface.effect().and_then(|e| e.speed()).unwrap();
        assert!((speed - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_configured_audio_timeout_applies_to_any_start() {
        let (surface, rx) = surface();
        let surface = surface.with_audio_timeout(Duration::from_millis(30));

        // As a remote collaborator would send it: no per-effect timeout
        let effect: Effect =
            serde_json::from_str(r#"{"effect":"AudioReactivity","gain":1.0}"#).unwrap();
        surface.handle(ControlEvent::StartEffect(effect)).unwrap();
        surface.submit_audio_level(0.5);
        surface.tick(Duration::from_millis(10));

        surface.tick(Duration::from_millis(20));
        assert!(!drain(&rx).contains(&EngineEvent::AudioStale));
        surface.tick(Duration::from_millis(20));
        assert!(drain(&rx).contains(&EngineEvent::AudioStale));
    }

    #[test]
    fn test_audio_level_drives_dimmers() {
        let (surface, rx) = surface();
        let audio = AudioReactivity::new(1.0).with_timeout(Duration::from_millis(50));
        surface.start_effect(Effect::AudioReactivity(audio)).unwrap();

        surface.submit_audio_level(1.0);
        surface.tick(Duration::from_millis(10));
        assert_eq!(surface.snapshot()[2], 255);

        for _ in 0..10 {
            surface.tick(Duration::from_millis(10));
        }
        assert_eq!(surface.snapshot()[2], 255);
        let stale_events = drain(&rx)
            .into_iter()
            .filter(|e| *e == EngineEvent::AudioStale)
            .count();
        assert_eq!(stale_events, 1);
    }

    #[test]
    fn test_sequence_alternates_and_stops_effect() {
        let (surface, rx) = surface();
        surface
            .start_effect(Effect::default_for(EffectKind::Rainbow))
            .unwrap();
        surface.play_sequence(alternating(true));
        assert_eq!(surface.active_effect(), None);
        assert_eq!(surface.snapshot()[0], 255);

        surface.tick(Duration::from_millis(100));
        assert_eq!(surface.snapshot()[0], 0);
        surface.tick(Duration::from_millis(100));
        assert_eq!(surface.snapshot()[0], 255);

        assert!(surface.stop_sequence());
        surface.tick(Duration::from_millis(100));
        assert_eq!(surface.snapshot()[0], 255);
        assert_eq!(surface.sequencer_state(), SequencerState::Stopped);

        let events = drain(&rx);
        assert!(events.contains(&EngineEvent::EffectStopped {
            kind: EffectKind::Rainbow
        }));
        assert!(events.contains(&EngineEvent::SequenceStopped));
    }

    #[test]
    fn test_sequence_finishes_on_last_step() {
        let (surface, rx) = surface();
        surface.play_sequence(alternating(false));
        surface.tick(Duration::from_millis(250));

        assert_eq!(surface.sequencer_state(), SequencerState::Idle);
        assert_eq!(surface.snapshot()[0], 0);
        assert!(drain(&rx).contains(&EngineEvent::SequenceFinished));
    }

    #[test]
    fn test_invalid_sequence_def_leaves_buffer() {
        let (surface, _rx) = surface();
        surface.set_dmx_channel(1, 42).unwrap();
        let def = SequenceDef::from_json(
            r#"{"loop":false,"steps":[{"channels":{"1":255},"duration_ms":-100}]}"#,
        )
        .unwrap();

        assert!(matches!(
            surface.play_sequence_def(&def),
            Err(ControlError::Validation(_))
        ));
        assert_eq!(surface.snapshot()[0], 42);
        assert_eq!(surface.sequencer_state(), SequencerState::Idle);
    }

    #[test]
    fn test_scene_roundtrip() {
        let (surface, _rx) = surface();
        surface.set_channel(0, 3, 200).unwrap();
        surface.set_dmx_channel(300, 5).unwrap();
        let before = surface.snapshot();

        surface.save_scene("scene1").unwrap();
        surface.blackout();
        surface.set_dmx_channel(7, 99).unwrap();
        surface.load_scene("scene1").unwrap();

        assert_eq!(surface.snapshot(), before);
        assert_eq!(surface.list_scenes().unwrap(), vec!["scene1".to_string()]);
        assert!(matches!(
            surface.load_scene("missing"),
            Err(ControlError::NotFound(_))
        ));
    }

    #[test]
    fn test_incompatible_scene_rejected() {
        let (surface, _rx) = surface();
        surface.set_dmx_channel(1, 10).unwrap();
        surface.save_scene("nine").unwrap();

        surface
            .configure(FixtureConfig::new(FixtureMode::FourteenChannel, 1, 2).unwrap())
            .unwrap();
        surface.set_dmx_channel(1, 20).unwrap();

        assert!(matches!(
            surface.load_scene("nine"),
            Err(ControlError::Configuration(_))
        ));
        assert_eq!(surface.snapshot()[0], 20);
    }

    #[test]
    fn test_handle_dispatch() {
        let (surface, _rx) = surface();
        surface.handle(ControlEvent::IrTriggered).unwrap();
        assert_eq!(surface.active_effect(), Some(EffectKind::ColorChase));

        surface
            .handle(ControlEvent::DmxValue {
                channel: 100,
                value: 12,
            })
            .unwrap();
        assert_eq!(surface.snapshot()[99], 12);

        surface.handle(ControlEvent::StopEffect).unwrap();
        assert_eq!(surface.active_effect(), None);

        assert!(surface
            .handle(ControlEvent::EffectSpeed { percent: 10 })
            .is_err());
    }
}
