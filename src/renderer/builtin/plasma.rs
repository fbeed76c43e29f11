//! `plasma`: a continuously animated sine-field gradient (§8 scenario 3).

use std::time::Instant;

use crate::color::Color;
use crate::input::KeyInputEvent;
use crate::layer::Layer;
use crate::renderer::{Renderer, RendererMeta, TraitValue};

pub struct PlasmaRenderer {
    speed: f32,
    started_at: Option<Instant>,
}

impl PlasmaRenderer {
    pub fn new() -> Self {
        PlasmaRenderer { speed: 1.0, started_at: None }
    }
}

impl Renderer for PlasmaRenderer {
    fn meta(&self) -> RendererMeta {
        RendererMeta { name: "plasma", description: "Animated sine-field gradient", author: "core", version: "1.0" }
    }

    fn traits(&self) -> Vec<(&'static str, TraitValue)> {
        vec![("speed", TraitValue::BoundedFloat { min: 0.1, max: 5.0, value: self.speed })]
    }

    fn set_trait(&mut self, name: &str, value: TraitValue) -> Result<(), String> {
        match (name, value) {
            ("speed", TraitValue::BoundedFloat { value, .. }) => {
                if !(0.1..=5.0).contains(&value) {
                    return Err(format!("speed {value} out of range [0.1,5.0]"));
                }
                self.speed = value;
                Ok(())
            }
            (other, _) => Err(format!("plasma has no trait '{other}'")),
        }
    }

    fn declared_fps(&self) -> u8 {
        30
    }

    fn init(&mut self, _height: u16, _width: u16) -> bool {
        self.started_at = Some(Instant::now());
        true
    }

    fn draw(&mut self, layer: &mut Layer, timestamp: Instant, _input: &[KeyInputEvent]) -> bool {
        let Some(start) = self.started_at else { return false };
        let t = timestamp.saturating_duration_since(start).as_secs_f32() * self.speed;
        let (h, w) = (layer.height(), layer.width());
        for row in 0..h {
            for col in 0..w {
                let x = col as f32 / w.max(1) as f32;
                let y = row as f32 / h.max(1) as f32;
                let v = ((x * 6.0 + t).sin() + (y * 6.0 - t * 1.3).sin() + (x + y).sin()) / 3.0;
                let hue = (v + 1.0) / 2.0;
                layer.put(row, col, Color::rgb(hue, 1.0 - hue, (hue * 2.0 - 1.0).abs()));
            }
        }
        true
    }
}
