//! `ripple`: draws an expanding ring at each key press (§8 scenario 3).

use std::time::{Duration, Instant};

use crate::color::Color;
use crate::input::KeyInputEvent;
use crate::layer::Layer;
use crate::renderer::{Renderer, RendererMeta, TraitValue};

struct ActiveRing {
    row: u16,
    col: u16,
    started_at: Instant,
}

const RING_LIFETIME: Duration = Duration::from_millis(600);
const RING_SPEED_ROWS_PER_SEC: f32 = 6.0;

pub struct RippleRenderer {
    color: Color,
    rings: Vec<ActiveRing>,
}

impl RippleRenderer {
    pub fn new() -> Self {
        RippleRenderer { color: Color::rgb(0.0, 1.0, 1.0), rings: Vec::new() }
    }
}

impl Renderer for RippleRenderer {
    fn meta(&self) -> RendererMeta {
        RendererMeta { name: "ripple", description: "Expanding ring at each keypress", author: "core", version: "1.0" }
    }

    fn requires_key_input(&self) -> bool {
        true
    }

    fn traits(&self) -> Vec<(&'static str, TraitValue)> {
        vec![("color", TraitValue::SingleColor { value: self.color })]
    }

    fn set_trait(&mut self, name: &str, value: TraitValue) -> Result<(), String> {
        match (name, value) {
            ("color", TraitValue::SingleColor { value }) => {
                self.color = value;
                Ok(())
            }
            (other, _) => Err(format!("ripple has no trait '{other}'")),
        }
    }

    fn declared_fps(&self) -> u8 {
        30
    }

    fn init(&mut self, _height: u16, _width: u16) -> bool {
        true
    }

    /// Returns `false` (skip this tick) when no key events have arrived and
    /// no ring is still animating, matching the "writes no pixels" half of
    /// the scenario; once a key event lands, bright ring cells are written
    /// and the frame is submitted until the ring fades out.
    fn draw(&mut self, layer: &mut Layer, timestamp: Instant, input: &[KeyInputEvent]) -> bool {
        for event in input {
            for point in &event.coords {
                self.rings.push(ActiveRing { row: point.row, col: point.col, started_at: timestamp });
            }
        }
        self.rings.retain(|r| timestamp.saturating_duration_since(r.started_at) < RING_LIFETIME);
        if self.rings.is_empty() {
            return false;
        }
        for ring in &self.rings {
            let age = timestamp.saturating_duration_since(ring.started_at).as_secs_f32();
            let radius = (age * RING_SPEED_ROWS_PER_SEC) as i32;
            let fade = 1.0 - age / RING_LIFETIME.as_secs_f32();
            layer.circle(ring.row as i32, ring.col as i32, radius.max(1), self.color, false, fade);
        }
        true
    }
}
