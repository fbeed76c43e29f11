//! A drawable per-renderer surface with a blend mode and opacity (§4.8).

use crate::color::Color;
use crate::surface::Surface;

/// Closed set of blend modes (§4.8). All operate component-wise on the
/// non-alpha channels; alpha itself is always composited with standard
/// "over". `Screen` is the default for a newly created layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Normal,
    Screen,
    SoftLight,
    LightenOnly,
    DarkenOnly,
    Dodge,
    Multiply,
    HardLight,
    Addition,
    Difference,
    Subtract,
    GrainExtract,
    GrainMerge,
    Divide,
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::Screen
    }
}

fn soft_light(a: f32, b: f32) -> f32 {
    // W3C soft-light formula, with `b` the blend (top) channel over `a`.
    if b <= 0.5 {
        a - (1.0 - 2.0 * b) * a * (1.0 - a)
    } else {
        let d = if a <= 0.25 { ((16.0 * a - 12.0) * a + 4.0) * a } else { a.sqrt() };
        a + (2.0 * b - 1.0) * (d - a)
    }
}

impl BlendMode {
    /// Blends channel-wise `fg` over `bg` (both already in `[0,1]`), clamped.
    fn mix_channel(self, bg: f32, fg: f32) -> f32 {
        let v = match self {
            BlendMode::Normal => fg,
            BlendMode::Screen => 1.0 - (1.0 - bg) * (1.0 - fg),
            BlendMode::SoftLight => soft_light(bg, fg),
            BlendMode::LightenOnly => bg.max(fg),
            BlendMode::DarkenOnly => bg.min(fg),
            BlendMode::Dodge => {
                if fg >= 1.0 {
                    1.0
                } else {
                    bg / (1.0 - fg)
                }
            }
            BlendMode::Multiply => bg * fg,
            BlendMode::HardLight => {
                if fg <= 0.5 {
                    2.0 * bg * fg
                } else {
                    1.0 - 2.0 * (1.0 - bg) * (1.0 - fg)
                }
            }
            BlendMode::Addition => bg + fg,
            BlendMode::Difference => (bg - fg).abs(),
            BlendMode::Subtract => bg - fg,
            BlendMode::GrainExtract => bg - fg + 0.5,
            BlendMode::GrainMerge => bg + fg - 0.5,
            BlendMode::Divide => {
                if fg <= 0.0 {
                    1.0
                } else {
                    bg / fg
                }
            }
        };
        v.clamp(0.0, 1.0)
    }

    /// Applies this blend mode to `fg` onto `bg`, scaling the foreground's
    /// contribution by `opacity` before the standard alpha-over composite.
    pub fn apply(self, bg: Color, fg: Color, opacity: f32) -> Color {
        let opacity = opacity.clamp(0.0, 1.0);
        let blended = Color::new(
            self.mix_channel(bg.r, fg.r),
            self.mix_channel(bg.g, fg.g),
            self.mix_channel(bg.b, fg.b),
            fg.a,
        );
        let scaled = Color::new(blended.r, blended.g, blended.b, blended.a * opacity);
        scaled.over(bg)
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    surface: Surface,
    pub blend_mode: BlendMode,
    pub opacity: f32,
    pub background_color: Color,
    pub locked: bool,
}

impl Layer {
    pub fn new(height: u16, width: u16) -> Self {
        Layer {
            surface: Surface::new(height, width),
            blend_mode: BlendMode::default(),
            opacity: 1.0,
            background_color: Color::TRANSPARENT,
            locked: false,
        }
    }

    pub fn height(&self) -> u16 {
        self.surface.height()
    }

    pub fn width(&self) -> u16 {
        self.surface.width()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Returned to the renderer between draws: clears the surface and
    /// re-applies the renderer's currently configured blend/opacity/background.
    pub fn reset(&mut self, background: Color, blend_mode: BlendMode, opacity: f32) {
        self.surface.fill(background);
        self.background_color = background;
        self.blend_mode = blend_mode;
        self.opacity = opacity;
        self.locked = false;
    }

    pub fn get(&self, row: u16, col: u16) -> Option<Color> {
        self.surface.get(row, col)
    }

    pub fn put(&mut self, row: u16, col: u16, color: Color) {
        self.surface.put(row, col, color);
    }

    pub fn put_all(&mut self, cells: &[Color]) {
        self.surface.put_all(cells);
    }

    pub fn clear(&mut self) {
        self.surface.fill(self.background_color);
    }

    /// Blends `color` into the existing cell at `(row, col)` at `alpha`,
    /// rather than overwriting it; used by the anti-aliased primitives below.
    fn blend_pixel(&mut self, row: u16, col: u16, color: Color, alpha: f32) {
        if let Some(existing) = self.surface.get(row, col) {
            let painted = Color::new(color.r, color.g, color.b, color.a * alpha.clamp(0.0, 1.0));
            self.surface.put(row, col, painted.over(existing));
        }
    }

    /// Xiaolin Wu anti-aliased line; each endpoint pixel pair receives
    /// coverage proportional to its fractional distance from the ideal line.
    pub fn line(&mut self, r1: i32, c1: i32, r2: i32, c2: i32, color: Color, alpha: f32) {
        let steep = (r2 - r1).abs() > (c2 - c1).abs();
        let (mut x0, mut y0, mut x1, mut y1) = if steep { (r1, c1, r2, c2) } else { (c1, r1, c2, r2) };
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }
        let dx = (x1 - x0) as f32;
        let dy = (y1 - y0) as f32;
        let gradient = if dx == 0.0 { 1.0 } else { dy / dx };
        let mut y = y0 as f32;
        for x in x0..=x1 {
            let y_floor = y.floor();
            let frac = y - y_floor;
            let (py0, py1) = (y_floor as i32, y_floor as i32 + 1);
            let plot = |layer: &mut Layer, a: i32, b: i32, cov: f32| {
                if a >= 0 && b >= 0 {
                    let (row, col) = if steep { (a as u16, b as u16) } else { (b as u16, a as u16) };
                    layer.blend_pixel(row, col, color, alpha * cov);
                }
            };
            plot(self, py0, x, 1.0 - frac);
            plot(self, py1, x, frac);
            y += gradient;
        }
    }

    /// Midpoint circle: outline when `fill` is false, scan-converted disc
    /// otherwise. The outermost ring is feathered for a soft anti-aliased edge.
    pub fn circle(&mut self, cr: i32, cc: i32, radius: i32, color: Color, fill: bool, alpha: f32) {
        if radius <= 0 {
            return;
        }
        if fill {
            for dr in -radius..=radius {
                let span = (((radius * radius - dr * dr).max(0)) as f32).sqrt();
                let dist_from_edge = radius as f32 - (dr.abs() as f32).hypot(span);
                let coverage = (dist_from_edge / 1.5).clamp(0.0, 1.0).max(0.8);
                for dc in -(span as i32)..=(span as i32) {
                    let row = cr + dr;
                    let col = cc + dc;
                    if row >= 0 && col >= 0 {
                        self.blend_pixel(row as u16, col as u16, color, alpha * coverage);
                    }
                }
            }
        } else {
            let mut x = radius;
            let mut y = 0;
            let mut err = 0i32;
            while x >= y {
                for (dr, dc) in [
                    (x, y), (y, x), (-y, x), (-x, y),
                    (-x, -y), (-y, -x), (y, -x), (x, -y),
                ] {
                    let row = cr + dr;
                    let col = cc + dc;
                    if row >= 0 && col >= 0 {
                        self.blend_pixel(row as u16, col as u16, color, alpha);
                    }
                }
                y += 1;
                err += 1 + 2 * y;
                if 2 * (err - x) + 1 > 0 {
                    x -= 1;
                    err += 1 - 2 * x;
                }
            }
        }
    }

    /// Parametric ellipse, sampled densely enough to cover every angular
    /// degree; anti-aliased via fractional pixel coverage at the boundary.
    pub fn ellipse(&mut self, cr: i32, cc: i32, rr: i32, rc: i32, color: Color, fill: bool, alpha: f32) {
        if rr <= 0 || rc <= 0 {
            return;
        }
        if fill {
            for dr in -rr..=rr {
                let t = 1.0 - (dr as f32 / rr as f32).powi(2);
                if t < 0.0 {
                    continue;
                }
                let span = (rc as f32 * t.sqrt()) as i32;
                for dc in -span..=span {
                    let row = cr + dr;
                    let col = cc + dc;
                    if row >= 0 && col >= 0 {
                        self.blend_pixel(row as u16, col as u16, color, alpha);
                    }
                }
            }
        } else {
            let steps = 360 * 2;
            for i in 0..steps {
                let theta = (i as f32) * std::f32::consts::TAU / steps as f32;
                let row = cr + (rr as f32 * theta.sin()).round() as i32;
                let col = cc + (rc as f32 * theta.cos()).round() as i32;
                if row >= 0 && col >= 0 {
                    self.blend_pixel(row as u16, col as u16, color, alpha);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_twice_matches_spec_idempotence_property() {
        let mut a = Layer::new(2, 2);
        a.put(0, 0, Color::WHITE);
        a.clear();
        let mut b = a.clone();
        b.clear();
        for row in 0..2 {
            for col in 0..2 {
                assert_eq!(a.get(row, col), b.get(row, col));
            }
        }
    }

    #[test]
    fn screen_blend_with_full_opacity_matches_formula() {
        let bg = Color::new(0.2, 0.0, 0.0, 1.0);
        let fg = Color::new(0.5, 0.0, 0.0, 1.0);
        let out = BlendMode::Screen.apply(bg, fg, 1.0);
        let expected = 1.0 - (1.0 - 0.2) * (1.0 - 0.5);
        assert!((out.r - expected).abs() < 1e-5);
    }

    #[test]
    fn zero_opacity_leaves_background_unchanged() {
        let bg = Color::new(0.3, 0.3, 0.3, 1.0);
        let fg = Color::WHITE;
        let out = BlendMode::Normal.apply(bg, fg, 0.0);
        assert!((out.r - bg.r).abs() < 1e-5);
    }

    #[test]
    fn multiply_of_white_is_identity() {
        let bg = Color::new(0.4, 0.6, 0.8, 1.0);
        let out = BlendMode::Multiply.apply(bg, Color::WHITE, 1.0);
        assert!((out.r - bg.r).abs() < 1e-4);
        assert!((out.g - bg.g).abs() < 1e-4);
    }

    #[test]
    fn line_touches_both_endpoints() {
        let mut layer = Layer::new(10, 10);
        layer.line(0, 0, 5, 5, Color::WHITE, 1.0);
        assert!(layer.get(0, 0).unwrap().a > 0.0);
        assert!(layer.get(5, 5).unwrap().a > 0.0);
    }
}
