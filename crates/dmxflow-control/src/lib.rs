//! DmxFlow Control - DMX512 frame engine for moving heads
//!
//! This crate drives a patch of identical moving heads over one DMX512 universe:
//! - **Universe**: 512-slot channel buffer with a 9CH / 14CH fixture map
//! - **Transmission**: break, MAB, start code and 512 slots over a serial line
//! - **Effects**: color chase, strobe, rainbow, gobo cycling, audio reactivity
//! - **Sequencer**: timed step playback, optionally looping
//! - **Scenes**: named universe snapshots, JSON on disk
//!
//! ## Feature Flags
//!
//! - `serial` (default): serial port transport (requires `serialport`)
//!
//! ## Quick Start
//!
//! ```rust
//! use dmxflow_control::{
//!     DmxEngine, EffectKind, Effect, EngineConfig, MemorySceneStore, NullSink, NullTransport,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> dmxflow_control::Result<()> {
//! let engine = DmxEngine::start(
//!     &EngineConfig::default(),
//!     Box::new(NullTransport),
//!     Arc::new(MemorySceneStore::new()),
//!     Arc::new(NullSink),
//! )?;
//!
//! let surface = engine.surface();
//! surface.set_channel(0, 2, 255)?; // head 0 dimmer
//! surface.start_effect(Effect::default_for(EffectKind::Rainbow))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`dmx`] - Channel buffer, fixture map, frames and transports
//! - [`effects`] - Effect generators
//! - [`sequencer`] - Step sequences and playback
//! - [`scene`] - Scene snapshots and stores
//! - [`command`] - Synchronized command surface
//! - [`engine`] - Timing threads
//! - [`events`] - Status events and sinks
//! - [`config`] - Engine configuration
//! - [`logging`] - Log output settings
//! - [`error`] - Error types

#![allow(missing_docs)]

// Core modules
/// Error types
pub mod error;
/// Engine configuration
pub mod config;
/// Log output settings
pub mod logging;

/// DMX universe and output
pub mod dmx;
/// Effect generators
pub mod effects;
/// Step sequences
pub mod sequencer;
/// Scene snapshots
pub mod scene;

/// Status events
pub mod events;
/// Command surface
pub mod command;
/// Timing threads
pub mod engine;

// Re-exports
pub use error::{ControlError, Result};

pub use command::{CommandSurface, ControlEvent, EngineStatus};
pub use config::EngineConfig;
pub use dmx::{
    ChannelBuffer, ChannelType, DmxFrame, DmxTransport, FixtureConfig, FixtureMode, FrameTiming,
    NullTransport, TransmitStats,
};
#[cfg(feature = "serial")]
pub use dmx::SerialTransport;
pub use effects::{Effect, EffectKind, Rgb};
pub use engine::DmxEngine;
pub use events::{ChannelSink, EngineEvent, EventSink, NullSink, StatusLight, TracingSink};
pub use logging::LogConfig;
pub use scene::{JsonSceneStore, MemorySceneStore, NullSceneStore, Scene, SceneStore};
pub use sequencer::{Sequence, SequenceDef, SequenceStep, Sequencer, SequencerState};
