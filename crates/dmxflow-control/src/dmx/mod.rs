//! DMX512 output
//!
//! This module holds the universe and everything needed to put it on the
//! wire.
//!
//! ## Universe
//!
//! [`ChannelBuffer`] is the 512-slot universe. Heads are patched into it
//! with a [`FixtureConfig`]:
//! - 9CH or 14CH mode per head
//! - 1 to 10 identical heads from a 1-based start address
//! - offset = start_address - 1 + head * channels_per_head + channel
//!
//! ## Wire format
//!
//! Each frame is a break, a mark-after-break, start code 0x00 and 512
//! channel bytes at 250 kbaud, 8N2. [`FrameTiming`] carries the break and
//! MAB lengths; [`DmxTransport`] implementations put frames on the line.
//!
//! ## Example Usage
//!
//! ```rust
//! use dmxflow_control::dmx::{ChannelBuffer, ChannelType, DmxFrame, FixtureConfig, FixtureMode};
//!
//! # fn main() -> dmxflow_control::Result<()> {
//! // Two 14-channel heads from DMX address 101
//! let patch = FixtureConfig::new(FixtureMode::FourteenChannel, 101, 2)?;
//!
//! let mut universe = ChannelBuffer::new();
//! let red = patch.role_offset(1, ChannelType::Red).unwrap_or_default();
//! universe.set(red, 255)?;
//!
//! let frame = DmxFrame::from_channels(&universe.snapshot());
//! assert_eq!(frame.as_bytes().len(), 513);
//! assert_eq!(frame.channels()[100 + 14 + 6], 255);
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod fixtures;
pub mod frame;
pub mod transmitter;
pub mod transport;

pub use buffer::{clamp_dmx, level_to_dmx, ChannelBuffer, ChannelWrite, UNIVERSE_SIZE};
pub use fixtures::{ChannelType, FixtureConfig, FixtureMode, MAX_HEADS};
pub use frame::{DmxFrame, FrameTiming, DMX_BAUD_RATE, FRAME_SIZE};
pub use transmitter::{TransmitStats, Transmitter};
#[cfg(feature = "serial")]
pub use transport::SerialTransport;
pub use transport::{DmxTransport, NullTransport};
