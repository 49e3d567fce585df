//! DMX universe channel buffer

use std::fmt;
use std::ops::Range;

use crate::{error::ControlError, Result};

/// Number of channel slots in a DMX512 universe
pub const UNIVERSE_SIZE: usize = 512;

/// A single channel mutation (0-based buffer offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelWrite {
    pub offset: usize,
    pub value: u8,
}

impl ChannelWrite {
    pub fn new(offset: usize, value: u8) -> Self {
        Self { offset, value }
    }
}

/// Fixed-size universe state. Never resized after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct ChannelBuffer {
    data: [u8; UNIVERSE_SIZE],
}

impl ChannelBuffer {
    /// Create a dark universe
    pub fn new() -> Self {
        Self {
            data: [0u8; UNIVERSE_SIZE],
        }
    }

    /// Build a buffer from up to 512 values; missing trailing slots are 0
    pub fn from_slice(values: &[u8]) -> Result<Self> {
        if values.len() > UNIVERSE_SIZE {
            return Err(ControlError::Validation(format!(
                "Snapshot has {} channels (max {})",
                values.len(),
                UNIVERSE_SIZE
            )));
        }
        let mut buffer = Self::new();
        buffer.data[..values.len()].copy_from_slice(values);
        Ok(buffer)
    }

    /// Read a slot
    pub fn get(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    /// Write a slot
    pub fn set(&mut self, offset: usize, value: u8) -> Result<()> {
        let slot = self.data.get_mut(offset).ok_or_else(|| {
            ControlError::Validation(format!(
                "Offset {} outside universe (0-{})",
                offset,
                UNIVERSE_SIZE - 1
            ))
        })?;
        *slot = value;
        Ok(())
    }

    /// Apply a batch of writes in order. Out-of-universe offsets are skipped.
    pub fn apply(&mut self, writes: &[ChannelWrite]) {
        for write in writes {
            match self.data.get_mut(write.offset) {
                Some(slot) => *slot = write.value,
                None => tracing::debug!("Dropping write to offset {}", write.offset),
            }
        }
    }

    /// Set every slot in `range` to `value`
    pub fn fill_range(&mut self, range: Range<usize>, value: u8) {
        let end = range.end.min(UNIVERSE_SIZE);
        let start = range.start.min(end);
        self.data[start..end].fill(value);
    }

    /// Zero the whole universe
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Copy `src_range` of another buffer to this buffer starting at `dst_start`
    pub fn copy_block_from(&mut self, src: &ChannelBuffer, src_range: Range<usize>, dst_start: usize) {
        let len = src_range.len();
        if src_range.end > UNIVERSE_SIZE || dst_start + len > UNIVERSE_SIZE {
            tracing::debug!(
                "Ignoring block copy {:?} -> {} (outside universe)",
                src_range,
                dst_start
            );
            return;
        }
        self.data[dst_start..dst_start + len].copy_from_slice(&src.data[src_range]);
    }

    /// All slot values
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Copy of all slot values
    pub fn snapshot(&self) -> [u8; UNIVERSE_SIZE] {
        self.data
    }

    /// True if every slot is 0
    pub fn is_dark(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }
}

impl Default for ChannelBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChannelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lit = self.data.iter().filter(|&&v| v != 0).count();
        f.debug_struct("ChannelBuffer")
            .field("lit_channels", &lit)
            .finish()
    }
}

/// Clamp an integer control value into the DMX range
pub fn clamp_dmx(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

/// Convert a 0.0-1.0 level to a DMX value
pub fn level_to_dmx(level: f32) -> u8 {
    if level.is_nan() {
        return 0;
    }
    (level.clamp(0.0, 1.0) * 255.0).round() as u8
}
