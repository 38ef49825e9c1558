//! Lamp colors.
//!
//! Colors are kept the way the inspector edits them (a `#rrggbb` string plus
//! an alpha) and converted to the normalized `red/green/blue/alpha` floats the
//! layout format stores.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Color {
    pub hex: String,
    pub alpha: f64,
}

impl Color {
    pub fn new(hex: impl Into<String>, alpha: f64) -> Self {
        Self { hex: hex.into(), alpha: alpha.clamp(0.0, 1.0) }
    }

    pub fn rgb(&self) -> [u8; 3] {
        hex_to_rgb(&self.hex)
    }

    /// Components in `[0, 1]`, rounded to the precision the file format keeps.
    pub fn to_normalized(&self) -> NormalizedColor {
        let [r, g, b] = self.rgb();
        NormalizedColor {
            red: round3(r as f64 / 255.0),
            green: round3(g as f64 / 255.0),
            blue: round3(b as f64 / 255.0),
            alpha: round3(self.alpha.clamp(0.0, 1.0)),
        }
    }

    pub fn from_normalized(c: &NormalizedColor) -> Self {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(rgb_to_hex([channel(c.red), channel(c.green), channel(c.blue)]), c.alpha)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Default for NormalizedColor {
    // The layout format treats a missing component as full intensity.
    fn default() -> Self {
        Self { red: 1.0, green: 1.0, blue: 1.0, alpha: 1.0 }
    }
}

/// Parse `#rgb` or `#rrggbb`. Short input is zero padded on the left and
/// anything that isn't a hex digit reads as zero.
pub fn hex_to_rgb(hex: &str) -> [u8; 3] {
    let digits = hex.trim().trim_start_matches('#');
    let expanded: String = if digits.chars().count() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        format!("{:0>6}", digits)
    };

    let chars: Vec<char> = expanded.chars().take(6).collect();
    let mut out = [0u8; 3];
    for (i, pair) in chars.chunks(2).enumerate() {
        let s: String = pair.iter().collect();
        out[i] = u8::from_str_radix(&s, 16).unwrap_or(0);
    }
    out
}

pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Three decimals, no trailing zeros: `0.5`, `10`, `0.333`.
pub fn format_number(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let r = round3(v);
    // Avoid printing "-0"
    let r = if r == 0.0 { 0.0 } else { r };
    format!("{}", r)
}
