//! `sparkle`: randomly lit cells that fade out, a host-side renderer distinct
//! from the hardware `starlight` effect (§4.2) of the same visual family.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::color::Color;
use crate::input::KeyInputEvent;
use crate::layer::Layer;
use crate::renderer::{Renderer, RendererMeta, TraitValue};

struct Spark {
    row: u16,
    col: u16,
    born: Instant,
}

const SPARK_LIFETIME: Duration = Duration::from_millis(800);

pub struct SparkleRenderer {
    color: Color,
    density: f32,
    sparks: Vec<Spark>,
    dims: (u16, u16),
}

impl SparkleRenderer {
    pub fn new() -> Self {
        SparkleRenderer { color: Color::WHITE, density: 0.05, sparks: Vec::new(), dims: (1, 1) }
    }
}

impl Renderer for SparkleRenderer {
    fn meta(&self) -> RendererMeta {
        RendererMeta {
            name: "sparkle",
            description: "Randomly lit cells that fade out",
            author: "core",
            version: "1.0",
        }
    }

    fn traits(&self) -> Vec<(&'static str, TraitValue)> {
        vec![
            ("color", TraitValue::SingleColor { value: self.color }),
            ("density", TraitValue::BoundedFloat { min: 0.0, max: 1.0, value: self.density }),
        ]
    }

    fn set_trait(&mut self, name: &str, value: TraitValue) -> Result<(), String> {
        match (name, value) {
            ("color", TraitValue::SingleColor { value }) => {
                self.color = value;
                Ok(())
            }
            ("density", TraitValue::BoundedFloat { value, .. }) => {
                if !(0.0..=1.0).contains(&value) {
                    return Err(format!("density {value} out of range [0,1]"));
                }
                self.density = value;
                Ok(())
            }
            (other, _) => Err(format!("sparkle has no trait '{other}'")),
        }
    }

    fn declared_fps(&self) -> u8 {
        20
    }

    fn init(&mut self, height: u16, width: u16) -> bool {
        self.dims = (height, width);
        true
    }

    fn draw(&mut self, layer: &mut Layer, timestamp: Instant, _input: &[KeyInputEvent]) -> bool {
        let (h, w) = self.dims;
        let mut rng = rand::thread_rng();
        let budget = (h as f32 * w as f32 * self.density).round() as usize;
        for _ in 0..budget {
            if rng.gen_bool(0.5) {
                self.sparks.push(Spark { row: rng.gen_range(0..h), col: rng.gen_range(0..w), born: timestamp });
            }
        }
        self.sparks.retain(|s| timestamp.saturating_duration_since(s.born) < SPARK_LIFETIME);
        if self.sparks.is_empty() {
            return false;
        }
        for spark in &self.sparks {
            let age = timestamp.saturating_duration_since(spark.born).as_secs_f32();
            let fade = 1.0 - age / SPARK_LIFETIME.as_secs_f32();
            layer.put(spark.row, spark.col, Color::new(self.color.r, self.color.g, self.color.b, fade));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_density_out_of_range() {
        let mut r = SparkleRenderer::new();
        let result = r.set_trait("density", TraitValue::BoundedFloat { min: 0.0, max: 1.0, value: 1.5 });
        assert!(result.is_err());
        assert_eq!(r.density, 0.05);
    }

    #[test]
    fn sparks_are_pruned_once_past_their_lifetime() {
        let mut r = SparkleRenderer::new();
        r.init(6, 22);
        let t0 = Instant::now();
        r.sparks.push(Spark { row: 0, col: 0, born: t0 });
        let later = t0 + SPARK_LIFETIME + Duration::from_millis(1);
        r.draw(&mut Layer::new(6, 22), later, &[]);
        assert!(r.sparks.iter().all(|s| s.born != t0));
    }

    #[test]
    fn a_fresh_spark_is_submitted_before_it_expires() {
        let mut r = SparkleRenderer::new();
        r.init(6, 22);
        let t0 = Instant::now();
        r.sparks.push(Spark { row: 2, col: 3, born: t0 });
        let mut layer = Layer::new(6, 22);
        let submitted = r.draw(&mut layer, t0, &[]);
        assert!(submitted);
        assert!(layer.get(2, 3).unwrap().a > 0.0);
    }
}
