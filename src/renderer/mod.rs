//! Trait-configurable animation units (§4.9).

pub mod builtin;

use std::time::{Duration, Instant};

use crate::color::Color;
use crate::input::{KeyInputEvent, KeyStateMask};
use crate::layer::Layer;

#[derive(Debug, Clone)]
pub struct RendererMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub author: &'static str,
    pub version: &'static str,
}

/// The closed union of configurable trait shapes a renderer may declare
/// (§4.9). Each variant carries its current value alongside its constraint.
#[derive(Debug, Clone)]
pub enum TraitValue {
    BoundedFloat { min: f32, max: f32, value: f32 },
    BoundedInt { min: i64, max: i64, value: i64 },
    Bool { value: bool },
    EnumString { choices: Vec<String>, value: String },
    UnboundedString { value: String },
    SingleColor { value: Color },
    ColorList { min_len: usize, value: Vec<Color> },
    /// A named preset whose values are themselves color lists.
    Preset { choices: Vec<(String, Vec<Color>)>, selected: usize },
}

impl TraitValue {
    /// Validates and applies `new_value`, leaving `self` untouched if it
    /// violates the trait's declared constraint (§4.9).
    pub fn try_set(&mut self, new_value: TraitValue) -> Result<(), String> {
        match (&*self, &new_value) {
            (TraitValue::BoundedFloat { min, max, .. }, TraitValue::BoundedFloat { value, .. }) => {
                if *value < *min || *value > *max {
                    return Err(format!("{value} out of range [{min},{max}]"));
                }
            }
            (TraitValue::BoundedInt { min, max, .. }, TraitValue::BoundedInt { value, .. }) => {
                if *value < *min || *value > *max {
                    return Err(format!("{value} out of range [{min},{max}]"));
                }
            }
            (TraitValue::ColorList { min_len, .. }, TraitValue::ColorList { value, .. }) => {
                if value.len() < *min_len {
                    return Err(format!("color list shorter than minimum length {min_len}"));
                }
            }
            (TraitValue::EnumString { choices, .. }, TraitValue::EnumString { value, .. }) => {
                if !choices.contains(value) {
                    return Err(format!("'{value}' is not one of {choices:?}"));
                }
            }
            _ => {}
        }
        *self = new_value;
        Ok(())
    }
}

/// Contract every built-in renderer implements (§4.9). Instances are not
/// `Clone`; the compositor owns exactly one per active slot.
pub trait Renderer: Send {
    fn meta(&self) -> RendererMeta;

    /// Named configurable traits and their current values/constraints.
    fn traits(&self) -> Vec<(&'static str, TraitValue)>;

    fn set_trait(&mut self, name: &str, value: TraitValue) -> Result<(), String>;

    /// Renderers that read the keyboard intake must declare it so the
    /// compositor can refuse to start them without `key_input` (§4.9).
    fn requires_key_input(&self) -> bool {
        false
    }

    /// How long a key event stays valid for this renderer's own view of the
    /// intake, counted from arrival (§3 `KeyInputEvent`, §4.11). Zero means
    /// "consume on first read": the event carries no `expire_at` and is
    /// dropped from this renderer's view the instant it's delivered, even if
    /// other renderers haven't seen it yet.
    fn key_expire_time(&self) -> Duration {
        Duration::from_millis(500)
    }

    /// Which key states this renderer's intake view is subscribed to
    /// (§4.11).
    fn key_state_mask(&self) -> KeyStateMask {
        KeyStateMask::DOWN | KeyStateMask::HOLD
    }

    /// Declared frames-per-second before the [1,30] clamp (§4.9).
    fn declared_fps(&self) -> u8;

    fn blend_mode(&self) -> crate::layer::BlendMode {
        crate::layer::BlendMode::default()
    }

    fn opacity(&self) -> f32 {
        1.0
    }

    /// Prepares internal state from the frame's dimensions. Returning
    /// `false` aborts activation (§4.9).
    fn init(&mut self, height: u16, width: u16) -> bool;

    /// Produces one frame into `layer`. `true` submits it to the compositor;
    /// `false` skips this tick.
    fn draw(&mut self, layer: &mut Layer, timestamp: Instant, input: &[KeyInputEvent]) -> bool;

    fn finish(&mut self) {}
}

/// Clamps a renderer-declared FPS into the documented [1,30] band (§4.9).
pub fn clamp_fps(fps: u8) -> u8 {
    fps.clamp(1, 30)
}
