//! The per-device composited surface and its on-wire row encoding (§4.7).

use crate::color::Color;
use crate::layer::{BlendMode, Layer};
use crate::surface::Surface;

/// Standard class segments carry up to 24 LEDs; `custom_frame_alt` devices
/// (§6) may carry up to 26 RGB triplets per segment.
pub const STANDARD_SEGMENT_COLS: usize = 24;
pub const CUSTOM_FRAME_ALT_SEGMENT_COLS: usize = 26;

/// One row's worth of matrix-frame segments, ready to hand to
/// [`crate::device::DeviceDriver::commit_matrix`]: `(row, start_col, end_col, rgb_bytes)`.
pub type RowSegment = (u16, u16, Vec<u8>);

pub struct FrameBuffer {
    surface: Surface,
    background: Color,
    max_segment_cols: usize,
}

impl FrameBuffer {
    pub fn new(height: u16, width: u16, custom_frame_alt: bool) -> Self {
        FrameBuffer {
            surface: Surface::new(height, width),
            background: Color::BLACK,
            max_segment_cols: if custom_frame_alt { CUSTOM_FRAME_ALT_SEGMENT_COLS } else { STANDARD_SEGMENT_COLS },
        }
    }

    pub fn height(&self) -> u16 {
        self.surface.height()
    }

    pub fn width(&self) -> u16 {
        self.surface.width()
    }

    pub fn clear(&mut self) {
        self.surface.fill(self.background);
    }

    /// Row-major snapshot of the composited surface, pre-hardware-conversion
    /// (§6: `get_current_frame`).
    pub fn cells(&self) -> Vec<Color> {
        self.surface.iter().map(|(_, c)| c).collect()
    }

    /// Composites `layer` onto the frame in place, using the layer's own
    /// blend mode and opacity (§4.7, §4.8).
    pub fn blit(&mut self, layer: &Layer) {
        let (h, w) = (self.surface.height().min(layer.height()), self.surface.width().min(layer.width()));
        for row in 0..h {
            for col in 0..w {
                let bg = self.surface.get(row, col).unwrap();
                let fg = layer.get(row, col).unwrap_or(Color::TRANSPARENT);
                self.surface.put(row, col, layer.blend_mode.apply(bg, fg, layer.opacity));
            }
        }
    }

    /// Also exposed directly for callers compositing a bare blend mode
    /// outside of a full `Layer` (present for API symmetry with §4.7's
    /// description of `blit(layer, blend, opacity)`).
    pub fn blit_with(&mut self, layer: &Layer, blend_mode: BlendMode, opacity: f32) {
        let (h, w) = (self.surface.height().min(layer.height()), self.surface.width().min(layer.width()));
        for row in 0..h {
            for col in 0..w {
                let bg = self.surface.get(row, col).unwrap();
                let fg = layer.get(row, col).unwrap_or(Color::TRANSPARENT);
                self.surface.put(row, col, blend_mode.apply(bg, fg, opacity));
            }
        }
    }

    /// Encodes the current contents into per-row, column-budgeted segments
    /// in left-to-right order (§4.7, §6). Premultiplies every cell against
    /// the frame's opaque background before converting to hardware bytes.
    pub fn encode_rows(&self) -> Vec<(u16, Vec<RowSegment>)> {
        let mut rows = Vec::with_capacity(self.surface.height() as usize);
        for row in 0..self.surface.height() {
            let mut segments = Vec::new();
            let mut col = 0u16;
            while col < self.surface.width() {
                let end_col = (col + self.max_segment_cols as u16 - 1).min(self.surface.width() - 1);
                let mut rgb = Vec::with_capacity((end_col - col + 1) as usize * 3);
                for c in col..=end_col {
                    let cell = self.surface.get(row, c).unwrap();
                    let composited = cell.over(self.background);
                    rgb.extend_from_slice(&composited.to_hardware_rgb());
                }
                segments.push((col, end_col, rgb));
                col = end_col + 1;
            }
            rows.push((row, segments));
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_row_splits_into_budgeted_segments() {
        let frame = FrameBuffer::new(1, 30, false);
        let rows = frame.encode_rows();
        let (_, segments) = &rows[0];
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].0, 0);
        assert_eq!(segments[0].1, 23);
        assert_eq!(segments[1].0, 24);
        assert_eq!(segments[1].1, 29);
    }

    #[test]
    fn custom_frame_alt_widens_segment_budget() {
        let frame = FrameBuffer::new(1, 30, true);
        let rows = frame.encode_rows();
        let (_, segments) = &rows[0];
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].1, 25);
    }

    #[test]
    fn blit_white_layer_over_black_background_is_white() {
        let mut frame = FrameBuffer::new(2, 2, false);
        frame.clear();
        let mut layer = Layer::new(2, 2);
        layer.blend_mode = BlendMode::Normal;
        layer.opacity = 1.0;
        layer.put(0, 0, Color::WHITE);
        frame.blit(&layer);
        let rows = frame.encode_rows();
        assert_eq!(rows[0].1[0].2[0..3], [255, 255, 255]);
    }
}
