//! Hardware descriptor store (§3, §4.3).

pub mod loader;

use std::collections::{HashMap, HashSet};

use crate::protocol::ProfileId;
use crate::surface::Point;

/// Closed set of device kinds (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Keyboard,
    Mouse,
    Mousepad,
    Headset,
    Keypad,
    Laptop,
}

/// Closed set of capability flags (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityFlag {
    Wireless,
    Hyperpolling,
    NoLed,
    SingleLed,
    ExtendedFx,
    LogoLedBrightness,
    ScrollWheelBrightness,
    CustomFrameAlt,
    SoftwareEffectsOnly,
    CrcSkipOnOk,
    KeyInput,
    SystemControl,
}

/// Matrix dimensions in rows/columns, absent for non-matrix devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct Dimensions {
    pub rows: u16,
    pub cols: u16,
}

/// Per-model fan/power limits used by the thermal safety overlay (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct FanLimits {
    pub min_manual_rpm: u16,
    pub max_rpm: u16,
}

impl Default for FanLimits {
    fn default() -> Self {
        FanLimits { min_manual_rpm: 2000, max_rpm: 5000 }
    }
}

/// Immutable record describing one supported device model (§3). Loaded once
/// at startup from a [`loader::DescriptorSource`]; never mutated afterward.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DeviceDescriptor {
    pub name: String,
    pub kind: DeviceKind,
    pub vendor_id: u16,
    pub product_id: u16,
    pub dimensions: Option<Dimensions>,
    pub supported_leds: HashSet<u8>,
    pub supported_effects: HashSet<String>,
    pub capabilities: HashSet<CapabilityFlag>,
    #[serde(default)]
    pub key_map: HashMap<String, Vec<(u16, u16)>>,
    pub protocol_profile: ProfileId,
    #[serde(default)]
    pub fan_limits: FanLimits,
}

impl DeviceDescriptor {
    pub fn has_capability(&self, flag: CapabilityFlag) -> bool {
        self.capabilities.contains(&flag)
    }

    pub fn supports_led(&self, led_id: u8) -> bool {
        self.supported_leds.contains(&led_id)
    }

    pub fn supports_effect(&self, name: &str) -> bool {
        self.supported_effects.iter().any(|e| e == name)
    }

    /// Resolves a symbolic keycode to matrix points via the descriptor's key
    /// map. An unmapped keycode yields an empty list (§4.11).
    pub fn coords_of(&self, keycode: &str) -> Vec<Point> {
        self.key_map
            .get(keycode)
            .map(|pts| pts.iter().map(|&(row, col)| Point::new(row, col)).collect())
            .unwrap_or_default()
    }
}

/// Keyed on `(vendor_id, product_id)`. Queried on every hotplug event; never
/// mutates runtime state (§4.3).
#[derive(Debug, Default)]
pub struct DescriptorStore {
    by_ids: HashMap<(u16, u16), DeviceDescriptor>,
}

impl DescriptorStore {
    pub fn from_descriptors(descriptors: Vec<DeviceDescriptor>) -> Self {
        let mut by_ids = HashMap::new();
        for d in descriptors {
            by_ids.insert((d.vendor_id, d.product_id), d);
        }
        DescriptorStore { by_ids }
    }

    pub fn lookup(&self, vendor_id: u16, product_id: u16) -> Option<&DeviceDescriptor> {
        self.by_ids.get(&(vendor_id, product_id))
    }

    pub fn len(&self) -> usize {
        self.by_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeviceDescriptor {
        DeviceDescriptor {
            name: "BlackWidow V4".into(),
            kind: DeviceKind::Keyboard,
            vendor_id: 0x1532,
            product_id: 0x0293,
            dimensions: Some(Dimensions { rows: 6, cols: 22 }),
            supported_leds: [0x05].into_iter().collect(),
            supported_effects: ["static".to_string(), "wave".to_string()].into_iter().collect(),
            capabilities: [CapabilityFlag::KeyInput].into_iter().collect(),
            key_map: HashMap::new(),
            protocol_profile: ProfileId::Legacy,
            fan_limits: FanLimits::default(),
        }
    }

    #[test]
    fn lookup_hits_on_matching_ids() {
        let store = DescriptorStore::from_descriptors(vec![sample()]);
        assert!(store.lookup(0x1532, 0x0293).is_some());
    }

    #[test]
    fn lookup_misses_gracefully() {
        let store = DescriptorStore::from_descriptors(vec![sample()]);
        assert!(store.lookup(0x1532, 0xFFFF).is_none());
    }

    #[test]
    fn unmapped_keycode_yields_empty_coords() {
        let d = sample();
        assert!(d.coords_of("KEY_Q").is_empty());
    }
}
