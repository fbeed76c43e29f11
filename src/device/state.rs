//! Mutable device state (§3: `DeviceDriver` state fields).

use std::collections::HashMap;

use crate::color::Color;

#[derive(Debug, Clone, Default)]
pub struct LedState {
    pub color: Option<Color>,
    pub on: bool,
    pub brightness: u8,
    pub mode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EffectState {
    pub name: String,
    pub args: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct WirelessTelemetry {
    pub battery: Option<u8>,
    pub charging: Option<bool>,
    /// Set when the last read failed and this value is a stale cache (§4.12).
    pub stale: bool,
}

#[derive(Debug, Clone)]
pub struct DeviceState {
    pub brightness: u8,
    pub suspended: bool,
    pub led_states: HashMap<u8, LedState>,
    pub current_effect: Option<EffectState>,
    pub wireless: WirelessTelemetry,
    pub offline: bool,
    pub consecutive_commit_failures: u8,
    /// Set when the thermal overlay trips at 95°C; held until a reading
    /// below 90°C clears it, regardless of intervening readings in the
    /// 90-95°C band (§4.6).
    pub thermal_locked_out: bool,
    pub firmware: Option<(u8, u8)>,
    pub serial: Option<String>,
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState {
            brightness: 100,
            suspended: false,
            led_states: HashMap::new(),
            current_effect: None,
            wireless: WirelessTelemetry::default(),
            offline: false,
            consecutive_commit_failures: 0,
            thermal_locked_out: false,
            firmware: None,
            serial: None,
        }
    }
}
