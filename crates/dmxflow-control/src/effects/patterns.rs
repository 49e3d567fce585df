//! Phase-driven effect generators

use serde::{Deserialize, Serialize};

use super::color::Rgb;
use crate::dmx::{ChannelType, ChannelWrite, FixtureConfig};

fn write_color(writes: &mut Vec<ChannelWrite>, fixture: &FixtureConfig, head: u16, color: Rgb) {
    for (role, value) in [
        (ChannelType::Red, color.r),
        (ChannelType::Green, color.g),
        (ChannelType::Blue, color.b),
    ] {
        if let Some(offset) = fixture.role_offset(head, role) {
            writes.push(ChannelWrite::new(offset, value));
        }
    }
}

/// Advance `phase` by `speed * dt` and wrap it into `[0, modulus)`
pub(crate) fn advance_phase(phase: f32, speed: f32, dt: f32, modulus: f32) -> f32 {
    (phase + speed * dt).rem_euclid(modulus)
}

/// Steps a colour list across the heads. Head `n` shows the colour
/// `n` places ahead of head 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorChase {
    /// Colour steps per second
    pub speed: f32,
    pub colors: Vec<Rgb>,
    #[serde(skip)]
    pub(crate) phase: f32,
}

impl ColorChase {
    pub fn new(speed: f32, colors: Vec<Rgb>) -> Self {
        Self {
            speed,
            colors,
            phase: 0.0,
        }
    }

    pub(crate) fn tick(&mut self, dt: f32, fixture: &FixtureConfig) -> Vec<ChannelWrite> {
        let mut writes = Vec::new();
        if self.colors.is_empty() {
            return writes;
        }
        let len = self.colors.len();
        self.phase = advance_phase(self.phase, self.speed, dt, len as f32);

        let step = self.phase.floor() as usize;
        for head in 0..fixture.head_count {
            let color = self.colors[(step + head as usize) % len];
            write_color(&mut writes, fixture, head, color);
        }
        writes
    }
}

impl Default for ColorChase {
    fn default() -> Self {
        Self::new(1.0, vec![Rgb::RED, Rgb::GREEN, Rgb::BLUE])
    }
}

/// Dimmer full-on / full-off at a 50% duty cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strobe {
    /// Flashes per second
    pub speed: f32,
    #[serde(skip)]
    pub(crate) phase: f32,
}

impl Strobe {
    pub fn new(speed: f32) -> Self {
        Self { speed, phase: 0.0 }
    }

    /// Whether the current half-period is the lit one
    pub fn is_on(&self) -> bool {
        self.phase < 0.5
    }

    pub(crate) fn tick(&mut self, dt: f32, fixture: &FixtureConfig) -> Vec<ChannelWrite> {
        self.phase = advance_phase(self.phase, self.speed, dt, 1.0);
        let value = if self.is_on() { 255 } else { 0 };

        fixture
            .role_offsets(ChannelType::Dimmer)
            .into_iter()
            .map(|offset| ChannelWrite::new(offset, value))
            .collect()
    }
}

impl Default for Strobe {
    fn default() -> Self {
        Self::new(5.0)
    }
}

/// Hue sweep. `head_offset` is the hue distance between neighbouring
/// heads as a fraction of the colour circle; 0 colours all heads alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rainbow {
    /// Hue revolutions per second
    pub speed: f32,
    #[serde(default)]
    pub head_offset: f32,
    #[serde(skip)]
    pub(crate) phase: f32,
}

impl Rainbow {
    pub fn new(speed: f32, head_offset: f32) -> Self {
        Self {
            speed,
            head_offset,
            phase: 0.0,
        }
    }

    pub(crate) fn tick(&mut self, dt: f32, fixture: &FixtureConfig) -> Vec<ChannelWrite> {
        self.phase = advance_phase(self.phase, self.speed, dt, 1.0);

        let mut writes = Vec::new();
        for head in 0..fixture.head_count {
            let hue = (self.phase + head as f32 * self.head_offset).rem_euclid(1.0) * 360.0;
            write_color(&mut writes, fixture, head, Rgb::from_hue(hue));
        }
        writes
    }
}

impl Default for Rainbow {
    fn default() -> Self {
        Self::new(0.2, 0.1)
    }
}

/// Cycles the gobo wheel through a fixed list of gobo channel values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoboPattern {
    /// Gobo steps per second
    pub speed: f32,
    pub gobos: Vec<u8>,
    #[serde(skip)]
    pub(crate) phase: f32,
}

impl GoboPattern {
    pub fn new(speed: f32, gobos: Vec<u8>) -> Self {
        Self {
            speed,
            gobos,
            phase: 0.0,
        }
    }

    /// Gobo channel value for the current phase
    pub fn current_gobo(&self) -> Option<u8> {
        if self.gobos.is_empty() {
            return None;
        }
        Some(self.gobos[self.phase.floor() as usize % self.gobos.len()])
    }

    pub(crate) fn tick(&mut self, dt: f32, fixture: &FixtureConfig) -> Vec<ChannelWrite> {
        if self.gobos.is_empty() {
            return Vec::new();
        }
        self.phase = advance_phase(self.phase, self.speed, dt, self.gobos.len() as f32);
        let Some(value) = self.current_gobo() else {
            return Vec::new();
        };

        fixture
            .role_offsets(ChannelType::Gobo)
            .into_iter()
            .map(|offset| ChannelWrite::new(offset, value))
            .collect()
    }
}

impl Default for GoboPattern {
    fn default() -> Self {
        Self::new(0.5, vec![0, 16, 32, 48, 64, 80, 96])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmx::FixtureMode;

    fn fixture() -> FixtureConfig {
        FixtureConfig::new(FixtureMode::NineChannel, 1, 3).unwrap()
    }

    fn value_at(writes: &[ChannelWrite], offset: usize) -> Option<u8> {
        writes
            .iter()
            .rev()
            .find(|w| w.offset == offset)
            .map(|w| w.value)
    }

    #[test]
    fn test_phase_wraps() {
        assert_eq!(advance_phase(2.5, 1.0, 1.0, 3.0), 0.5);
        assert_eq!(advance_phase(0.0, 2.0, 0.25, 1.0), 0.5);
    }

    #[test]
    fn test_color_chase_offsets_heads() {
        let fixture = fixture();
        let mut chase = ColorChase::default();

        let writes = chase.tick(0.0, &fixture);
        // Red is logical channel 3 in 9CH mode
        assert_eq!(value_at(&writes, 3), Some(255)); // head 0 red
        assert_eq!(value_at(&writes, 9 + 4), Some(255)); // head 1 green
        assert_eq!(value_at(&writes, 18 + 5), Some(255)); // head 2 blue

        // One step later head 0 shows green
        let writes = chase.tick(1.0, &fixture);
        assert_eq!(value_at(&writes, 3), Some(0));
        assert_eq!(value_at(&writes, 4), Some(255));
    }

    #[test]
    fn test_color_chase_wraps_color_list() {
        let fixture = fixture();
        let mut chase = ColorChase::new(1.0, vec![Rgb::RED, Rgb::BLUE]);
        chase.tick(5.0, &fixture);
        assert!(chase.phase < 2.0);
        // 5 steps with 2 colours -> odd step -> head 0 blue
        let writes = chase.tick(0.0, &fixture);
        assert_eq!(value_at(&writes, 5), Some(255));
    }

    #[test]
    fn test_strobe_duty_cycle() {
        let fixture = fixture();
        let mut strobe = Strobe::new(2.0); // 0.5s period, 0.25s half-period

        let mut on_ticks = 0;
        let ticks = 100;
        for _ in 0..ticks {
            let writes = strobe.tick(0.01, &fixture);
            if value_at(&writes, 2) == Some(255) {
                on_ticks += 1;
            }
        }
        // 1 second at 2Hz: half the ticks lit
        assert!((48..=52).contains(&on_ticks), "on ticks: {}", on_ticks);
    }

    #[test]
    fn test_strobe_writes_every_dimmer() {
        let fixture = fixture();
        let mut strobe = Strobe::default();
        let writes = strobe.tick(0.0, &fixture);
        let offsets: Vec<usize> = writes.iter().map(|w| w.offset).collect();
        assert_eq!(offsets, vec![2, 11, 20]);
    }

    #[test]
    fn test_rainbow_uniform_and_offset() {
        let fixture = fixture();

        let mut uniform = Rainbow::new(0.25, 0.0);
        let writes = uniform.tick(0.0, &fixture);
        assert_eq!(value_at(&writes, 3), Some(255));
        assert_eq!(value_at(&writes, 12), Some(255));

        let mut spread = Rainbow::new(0.25, 1.0 / 3.0);
        let writes = spread.tick(0.0, &fixture);
        // head 1 sits at 120 degrees -> green
        assert_eq!(value_at(&writes, 9 + 4), Some(255));
        assert_eq!(value_at(&writes, 9 + 3), Some(0));
    }

    #[test]
    fn test_gobo_pattern_cycles() {
        let fixture = fixture();
        let mut gobo = GoboPattern::new(1.0, vec![10, 20, 30]);

        let writes = gobo.tick(0.0, &fixture);
        assert_eq!(value_at(&writes, 6), Some(10));
        let writes = gobo.tick(1.0, &fixture);
        assert_eq!(value_at(&writes, 6), Some(20));
        let writes = gobo.tick(2.0, &fixture);
        assert_eq!(value_at(&writes, 6), Some(10));
        assert_eq!(value_at(&writes, 9 + 6), Some(10));
    }
}
