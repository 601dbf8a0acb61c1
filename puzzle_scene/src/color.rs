use serde::{Deserialize, Serialize};

/// Linear-space RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb` or `#rrggbb` (leading `#` optional) and converts the
    /// sRGB value to linear space.
    pub fn from_css_hex(code: &str) -> Option<Self> {
        let digits = code.trim().trim_start_matches('#');
        let channels: Vec<u8> = match digits.len() {
            3 => digits
                .chars()
                .map(|c| c.to_digit(16).map(|v| (v * 17) as u8))
                .collect::<Option<Vec<_>>>()?,
            6 => (0..3)
                .map(|i| u8::from_str_radix(digits.get(i * 2..i * 2 + 2)?, 16).ok())
                .collect::<Option<Vec<_>>>()?,
            _ => return None,
        };
        Some(Self {
            r: srgb_to_linear(f64::from(channels[0]) / 255.0),
            g: srgb_to_linear(f64::from(channels[1]) / 255.0),
            b: srgb_to_linear(f64::from(channels[2]) / 255.0),
        })
    }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c < 0.04045 {
        c * 0.077_399_380_8
    } else {
        (c * 0.947_867_298_6 + 0.052_132_701_4).powf(2.4)
    }
}
