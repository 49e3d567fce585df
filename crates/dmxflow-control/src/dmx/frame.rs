//! DMX512 wire framing
//!
//! A frame on the line is: break, mark-after-break, the NULL start code and
//! 512 slots, each slot sent as 8N2 at 250 kbaud (11 bit times per slot).

use std::time::Duration;

use super::buffer::UNIVERSE_SIZE;
use crate::{error::ControlError, Result};

/// Start code for dimmer data
pub const NULL_START_CODE: u8 = 0x00;
/// Start code + 512 slots
pub const FRAME_SIZE: usize = UNIVERSE_SIZE + 1;
/// DMX512 line rate
pub const DMX_BAUD_RATE: u32 = 250_000;
/// Start bit + 8 data bits + 2 stop bits
pub const BITS_PER_SLOT: u32 = 11;
/// Protocol minimum break length
pub const MIN_BREAK: Duration = Duration::from_micros(88);
/// Protocol minimum mark-after-break length
pub const MIN_MARK_AFTER_BREAK: Duration = Duration::from_micros(8);
/// Longest allowed gap between breaks
pub const MAX_BREAK_TO_BREAK: Duration = Duration::from_millis(1250);

/// Line timing used for each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    pub break_time: Duration,
    pub mark_after_break: Duration,
    pub baud_rate: u32,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self {
            break_time: Duration::from_micros(200),
            mark_after_break: Duration::from_micros(48),
            baud_rate: DMX_BAUD_RATE,
        }
    }
}

impl FrameTiming {
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(ControlError::Configuration(
                "Baud rate must be non-zero".to_string(),
            ));
        }
        if self.break_time < MIN_BREAK {
            return Err(ControlError::Configuration(format!(
                "Break of {:?} is shorter than the DMX minimum {:?}",
                self.break_time, MIN_BREAK
            )));
        }
        if self.mark_after_break < MIN_MARK_AFTER_BREAK {
            return Err(ControlError::Configuration(format!(
                "Mark-after-break of {:?} is shorter than the DMX minimum {:?}",
                self.mark_after_break, MIN_MARK_AFTER_BREAK
            )));
        }
        Ok(())
    }

    /// Time the slots of one full frame occupy on the wire
    pub fn payload_time(&self) -> Duration {
        let micros = FRAME_SIZE as u64 * BITS_PER_SLOT as u64 * 1_000_000 / self.baud_rate.max(1) as u64;
        Duration::from_micros(micros)
    }

    /// Shortest possible break-to-break interval with this timing
    pub fn min_frame_interval(&self) -> Duration {
        self.break_time + self.mark_after_break + self.payload_time()
    }
}

/// Wire-ready frame: start code followed by the 512 slots.
/// Built fresh for every transmission tick.
#[derive(Clone, PartialEq, Eq)]
pub struct DmxFrame {
    bytes: [u8; FRAME_SIZE],
}

impl DmxFrame {
    /// Build a frame from a universe snapshot
    pub fn from_channels(channels: &[u8; UNIVERSE_SIZE]) -> Self {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[0] = NULL_START_CODE;
        bytes[1..].copy_from_slice(channels);
        Self { bytes }
    }

    /// Bytes written after the mark-after-break
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn start_code(&self) -> u8 {
        self.bytes[0]
    }

    /// Slot values (slot 1 at index 0)
    pub fn channels(&self) -> &[u8] {
        &self.bytes[1..]
    }
}

impl std::fmt::Debug for DmxFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmxFrame")
            .field("start_code", &self.bytes[0])
            .field("len", &self.bytes.len())
            .finish()
    }
}
