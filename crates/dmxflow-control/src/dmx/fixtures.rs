//! Moving head fixture addressing
//!
//! A patch is a row of identical heads, all in the same channel mode,
//! occupying consecutive blocks of the universe starting at `start_address`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use super::buffer::UNIVERSE_SIZE;
use crate::{error::ControlError, Result};

/// Maximum number of heads in one patch
pub const MAX_HEADS: u16 = 10;

/// Function of a logical channel within a head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    Pan,
    PanFine,
    Tilt,
    TiltFine,
    /// Pan/tilt movement speed
    Speed,
    Dimmer,
    Red,
    Green,
    Blue,
    White,
    ColorWheel,
    Gobo,
    GoboRotation,
    /// Shutter / strobe
    Shutter,
}

const NINE_CHANNEL_LAYOUT: [ChannelType; 9] = [
    ChannelType::Pan,
    ChannelType::Tilt,
    ChannelType::Dimmer,
    ChannelType::Red,
    ChannelType::Green,
    ChannelType::Blue,
    ChannelType::Gobo,
    ChannelType::Shutter,
    ChannelType::Speed,
];

const FOURTEEN_CHANNEL_LAYOUT: [ChannelType; 14] = [
    ChannelType::Pan,
    ChannelType::PanFine,
    ChannelType::Tilt,
    ChannelType::TiltFine,
    ChannelType::Speed,
    ChannelType::Dimmer,
    ChannelType::Red,
    ChannelType::Green,
    ChannelType::Blue,
    ChannelType::White,
    ChannelType::ColorWheel,
    ChannelType::Gobo,
    ChannelType::GoboRotation,
    ChannelType::Shutter,
];

/// Channel profile a head is configured to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FixtureMode {
    #[default]
    NineChannel,
    FourteenChannel,
}

impl FixtureMode {
    /// Channel layout of one head in this mode
    pub fn channels(self) -> &'static [ChannelType] {
        match self {
            FixtureMode::NineChannel => &NINE_CHANNEL_LAYOUT,
            FixtureMode::FourteenChannel => &FOURTEEN_CHANNEL_LAYOUT,
        }
    }

    /// Number of channels one head occupies
    pub fn channel_count(self) -> usize {
        self.channels().len()
    }

    /// Logical channel index of a role, if the mode has it
    pub fn role_index(self, role: ChannelType) -> Option<usize> {
        self.channels().iter().position(|&c| c == role)
    }
}

impl fmt::Display for FixtureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureMode::NineChannel => write!(f, "9CH"),
            FixtureMode::FourteenChannel => write!(f, "14CH"),
        }
    }
}

/// Patch of identical heads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureConfig {
    pub mode: FixtureMode,
    pub start_address: u16, // 1-512
    pub head_count: u16,    // 1-10
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            mode: FixtureMode::NineChannel,
            start_address: 1,
            head_count: 2,
        }
    }
}

impl FixtureConfig {
    /// Create a validated fixture configuration
    pub fn new(mode: FixtureMode, start_address: u16, head_count: u16) -> Result<Self> {
        let config = Self {
            mode,
            start_address,
            head_count,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the whole patch fits inside one universe
    pub fn validate(&self) -> Result<()> {
        if self.start_address == 0 || self.start_address as usize > UNIVERSE_SIZE {
            return Err(ControlError::Configuration(format!(
                "Start address {} out of range (must be 1-{})",
                self.start_address, UNIVERSE_SIZE
            )));
        }
        if self.head_count == 0 || self.head_count > MAX_HEADS {
            return Err(ControlError::Configuration(format!(
                "Head count {} out of range (must be 1-{})",
                self.head_count, MAX_HEADS
            )));
        }
        let last = self.start_address as usize + self.footprint() - 1;
        if last > UNIVERSE_SIZE {
            return Err(ControlError::Configuration(format!(
                "{} x {} heads starting at {} end at channel {} (past {})",
                self.head_count, self.mode, self.start_address, last, UNIVERSE_SIZE
            )));
        }
        Ok(())
    }

    /// Channels per head
    pub fn channels_per_head(&self) -> usize {
        self.mode.channel_count()
    }

    /// Total number of channels the patch occupies
    pub fn footprint(&self) -> usize {
        self.head_count as usize * self.channels_per_head()
    }

    /// Last DMX address (1-based) used by the patch
    pub fn end_address(&self) -> u16 {
        (self.start_address as usize + self.footprint() - 1) as u16
    }

    /// Buffer offsets (0-based) occupied by the patch
    pub fn addressed_range(&self) -> Range<usize> {
        let base = self.start_address as usize - 1;
        base..base + self.footprint()
    }

    /// Buffer offsets (0-based) occupied by one head
    pub fn head_range(&self, head: u16) -> Option<Range<usize>> {
        if head >= self.head_count {
            return None;
        }
        let base = self.start_address as usize - 1 + head as usize * self.channels_per_head();
        Some(base..base + self.channels_per_head())
    }

    /// Absolute buffer offset of a head's logical channel
    pub fn offset(&self, head: u16, logical_channel: u16) -> Result<usize> {
        if head >= self.head_count {
            return Err(ControlError::Validation(format!(
                "Head {} out of range (patch has {} heads)",
                head, self.head_count
            )));
        }
        if logical_channel as usize >= self.channels_per_head() {
            return Err(ControlError::Validation(format!(
                "Channel {} out of range for {} mode",
                logical_channel, self.mode
            )));
        }
        Ok(self.start_address as usize - 1
            + head as usize * self.channels_per_head()
            + logical_channel as usize)
    }

    /// Absolute buffer offset of a role on one head
    pub fn role_offset(&self, head: u16, role: ChannelType) -> Option<usize> {
        let index = self.mode.role_index(role)?;
        self.head_range(head).map(|range| range.start + index)
    }

    /// Offsets of a role across all heads, in head order
    pub fn role_offsets(&self, role: ChannelType) -> Vec<usize> {
        (0..self.head_count)
            .filter_map(|head| self.role_offset(head, role))
            .collect()
    }

    /// Whether a snapshot captured under `other` can be moved onto this patch
    pub fn can_remap_from(&self, other: &FixtureConfig) -> bool {
        self.mode == other.mode && self.head_count == other.head_count
    }
}

impl fmt::Display for FixtureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {} @ d{:03}",
            self.head_count, self.mode, self.start_address
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_channel_counts() {
        assert_eq!(FixtureMode::NineChannel.channel_count(), 9);
        assert_eq!(FixtureMode::FourteenChannel.channel_count(), 14);
    }

    #[test]
    fn test_red_channel_position() {
        assert_eq!(FixtureMode::NineChannel.role_index(ChannelType::Red), Some(3));
        assert_eq!(
            FixtureMode::FourteenChannel.role_index(ChannelType::Red),
            Some(6)
        );
        assert_eq!(FixtureMode::NineChannel.role_index(ChannelType::White), None);
    }

    #[test]
    fn test_offset_formula() {
        let config = FixtureConfig::new(FixtureMode::NineChannel, 10, 3).unwrap();
        assert_eq!(config.offset(0, 0).unwrap(), 9);
        assert_eq!(config.offset(1, 0).unwrap(), 18);
        assert_eq!(config.offset(2, 8).unwrap(), 9 + 18 + 8);
        assert_eq!(config.end_address(), 36);
    }

    #[test]
    fn test_offset_out_of_range() {
        let config = FixtureConfig::default();
        assert!(matches!(
            config.offset(2, 0),
            Err(ControlError::Validation(_))
        ));
        assert!(matches!(
            config.offset(0, 9),
            Err(ControlError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_overflowing_patch() {
        // 10 x 14 = 140 channels, 400 + 140 - 1 = 539 > 512
        let result = FixtureConfig::new(FixtureMode::FourteenChannel, 400, 10);
        assert!(matches!(result, Err(ControlError::Configuration(_))));

        // Exactly fits
        let config = FixtureConfig::new(FixtureMode::FourteenChannel, 373, 10).unwrap();
        assert_eq!(config.end_address(), 512);
    }

    #[test]
    fn test_rejects_bad_bounds() {
        assert!(FixtureConfig::new(FixtureMode::NineChannel, 0, 1).is_err());
        assert!(FixtureConfig::new(FixtureMode::NineChannel, 513, 1).is_err());
        assert!(FixtureConfig::new(FixtureMode::NineChannel, 1, 0).is_err());
        assert!(FixtureConfig::new(FixtureMode::NineChannel, 1, 11).is_err());
    }

    #[test]
    fn test_role_offsets() {
        let config = FixtureConfig::new(FixtureMode::FourteenChannel, 1, 2).unwrap();
        assert_eq!(config.role_offsets(ChannelType::Dimmer), vec![5, 19]);
        assert_eq!(config.role_offset(1, ChannelType::Red), Some(20));
        assert_eq!(config.role_offset(2, ChannelType::Red), None);
    }

    #[test]
    fn test_display() {
        let config = FixtureConfig::new(FixtureMode::NineChannel, 7, 4).unwrap();
        assert_eq!(config.to_string(), "4 x 9CH @ d007");
    }
}
