//! Linear RGBA color and the hardware byte conversion (§3, §9).

/// Four linear channels in `[0, 1]`. Alpha is carried through compositing but
/// hardware payloads are always 24-bit opaque RGB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r: r.clamp(0.0, 1.0), g: g.clamp(0.0, 1.0), b: b.clamp(0.0, 1.0), a: a.clamp(0.0, 1.0) }
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Parses a `#rrggbb` or `#rrggbbaa` hex string, as used in renderer color
    /// traits (§4.9). Returns `None` on malformed input rather than panicking.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        let byte = |i: usize| u8::from_str_radix(&s.get(i..i + 2)?, 16).ok();
        match s.len() {
            6 => Some(Color::rgb(
                byte(0)? as f32 / 255.0,
                byte(2)? as f32 / 255.0,
                byte(4)? as f32 / 255.0,
            )),
            8 => Some(Color::new(
                byte(0)? as f32 / 255.0,
                byte(2)? as f32 / 255.0,
                byte(4)? as f32 / 255.0,
                byte(6)? as f32 / 255.0,
            )),
            _ => None,
        }
    }

    /// Gamut-clamps each channel and rounds to nearest, ties-to-even, producing
    /// the opaque 24-bit triplet a feature report carries. Premultiplication by
    /// alpha against a background happens in [`crate::frame::FrameBuffer`]; this
    /// helper is the final, centralized unit conversion named in §9.
    pub fn to_hardware_rgb(self) -> [u8; 3] {
        [
            round_ties_even(self.r.clamp(0.0, 1.0) * 255.0),
            round_ties_even(self.g.clamp(0.0, 1.0) * 255.0),
            round_ties_even(self.b.clamp(0.0, 1.0) * 255.0),
        ]
    }

    /// Alpha-composites `self` (foreground) over `bg` using a standard "over".
    pub fn over(self, bg: Color) -> Color {
        let a = self.a + bg.a * (1.0 - self.a);
        if a <= 0.0 {
            return Color::TRANSPARENT;
        }
        let mix = |fc: f32, bc: f32| (fc * self.a + bc * bg.a * (1.0 - self.a)) / a;
        Color::new(mix(self.r, bg.r), mix(self.g, bg.g), mix(self.b, bg.b), a)
    }
}

/// Centralizes the pct-to-hardware-byte conversion used by brightness (§4.5) so
/// that every caller rounds the same way (ties-to-even, per §9).
pub fn pct_to_byte(pct: u8) -> u8 {
    round_ties_even(pct as f32 * 2.55).min(255) as u8
}

fn round_ties_even(x: f32) -> u8 {
    let floor = x.floor();
    let diff = x - floor;
    let rounded = if diff > 0.5 {
        floor + 1.0
    } else if diff < 0.5 {
        floor
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    };
    rounded.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parse_roundtrips_full_red() {
        let c = Color::from_hex("#ff0000").unwrap();
        assert_eq!(c.to_hardware_rgb(), [255, 0, 0]);
    }

    #[test]
    fn brightness_75_rounds_to_191() {
        // 75 * 2.55 = 191.25 -> 191
        assert_eq!(pct_to_byte(75), 191);
    }

    #[test]
    fn brightness_0_and_100_bound() {
        assert_eq!(pct_to_byte(0), 0);
        assert_eq!(pct_to_byte(100), 255);
    }

    #[test]
    fn over_opaque_background_ignores_alpha() {
        let fg = Color::new(1.0, 0.0, 0.0, 0.5);
        let bg = Color::BLACK;
        let out = fg.over(bg);
        assert!((out.r - 0.5).abs() < 1e-5);
        assert!((out.a - 1.0).abs() < 1e-5);
    }
}
