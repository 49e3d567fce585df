//! RGB colour values and hue conversion

use palette::{FromColor, Hsv, Srgb};
use serde::{Deserialize, Serialize};

/// 8-bit RGB colour as written to a head's Red/Green/Blue channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `RRGGBB`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::new(r, g, b))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Fully saturated colour at `hue_degrees` (wrapped to 0-360)
    pub fn from_hue(hue_degrees: f32) -> Self {
        let hue = hue_degrees.rem_euclid(360.0);
        let hsv: Hsv = Hsv::new(hue, 1.0, 1.0);
        let rgb: Srgb = Srgb::from_color(hsv);

        Self {
            r: (rgb.red * 255.0).round().clamp(0.0, 255.0) as u8,
            g: (rgb.green * 255.0).round().clamp(0.0, 255.0) as u8,
            b: (rgb.blue * 255.0).round().clamp(0.0, 255.0) as u8,
        }
    }
}
