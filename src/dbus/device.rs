//! Per-device object, `org.razer.Daemon.Device` at
//! `/org/razer/Daemon/device/<id>` (§6).

use std::collections::HashMap;

use calloop::channel::Sender;
use tokio::sync::oneshot;
use zbus::interface;

use crate::color::Color;
use crate::renderer::TraitValue;

use super::DaemonCommand;

pub struct DeviceInterface {
    id: u32,
    core_tx: Sender<DaemonCommand>,
}

impl DeviceInterface {
    pub fn new(id: u32, core_tx: Sender<DaemonCommand>) -> Self {
        DeviceInterface { id, core_tx }
    }
}

/// Round-trips one `DaemonCommand` through the core loop and maps its
/// `CoreResult` onto a D-Bus result.
macro_rules! roundtrip {
    ($self:expr, $variant:ident { $($field:ident : $value:expr),* $(,)? }) => {{
        let (reply, rx) = oneshot::channel();
        $self
            .core_tx
            .send(DaemonCommand::$variant { id: $self.id, $($field: $value,)* reply })
            .map_err(|e| zbus::fdo::Error::Failed(format!("core channel closed: {e}")))?;
        rx.await
            .map_err(|e| zbus::fdo::Error::Failed(format!("core reply dropped: {e}")))?
            .map_err(zbus::fdo::Error::from)
    }};
}

#[interface(name = "org.razer.Daemon.Device")]
impl DeviceInterface {
    async fn get_info(&self) -> zbus::fdo::Result<(String, String, u8, bool, Vec<String>, Vec<u32>)> {
        let info = roundtrip!(self, GetDeviceInfo {})?;
        Ok((
            info.name,
            info.current_effect.unwrap_or_default(),
            info.brightness,
            info.suspended,
            info.available_effects,
            info.active_layers,
        ))
    }

    async fn set_brightness(&self, pct: u8) -> zbus::fdo::Result<()> {
        roundtrip!(self, SetBrightness { pct: pct })
    }

    async fn set_suspend(&self, suspended: bool) -> zbus::fdo::Result<()> {
        roundtrip!(self, SetSuspend { suspended: suspended })
    }

    async fn reset(&self) -> zbus::fdo::Result<()> {
        roundtrip!(self, Reset {})
    }

    /// `color` is an optional `#rrggbb` hex string; empty string means "leave
    /// unchanged".
    async fn set_led(&self, led_id: u8, color: String, on: Option<bool>, brightness: Option<u8>) -> zbus::fdo::Result<()> {
        let props = crate::device::LedProps {
            color: if color.is_empty() { None } else { Color::from_hex(&color) },
            on,
            brightness,
            mode: None,
        };
        roundtrip!(self, SetLed { led_id: led_id, props: props })
    }

    async fn set_effect(&self, name: String, args: HashMap<String, String>) -> zbus::fdo::Result<()> {
        roundtrip!(self, SetEffect { name: name, args: args })
    }

    async fn list_available_renderers(&self) -> zbus::fdo::Result<Vec<String>> {
        let names = roundtrip!(self, ListAvailableRenderers {})?;
        Ok(names.into_iter().map(str::to_string).collect())
    }

    /// `z` of `-1` requests auto-assignment (D-Bus has no nullable `u32`
    /// without a variant wrapper; this keeps the wire signature simple).
    async fn add_renderer(&self, name: String, z: i64, float_traits: HashMap<String, f64>) -> zbus::fdo::Result<u32> {
        let z = if z < 0 { None } else { Some(z as u32) };
        let traits = float_traits
            .into_iter()
            .map(|(k, v)| (k, TraitValue::BoundedFloat { min: f32::MIN, max: f32::MAX, value: v as f32 }))
            .collect();
        roundtrip!(self, AddRenderer { name: name, z: z, traits: traits })
    }

    async fn set_layer_float_trait(&self, z: u32, name: String, value: f64) -> zbus::fdo::Result<()> {
        let trait_value = TraitValue::BoundedFloat { min: f32::MIN, max: f32::MAX, value: value as f32 };
        roundtrip!(self, SetLayerTraits { z: z, name: name, value: trait_value })
    }

    async fn remove_renderer(&self, z: u32) -> zbus::fdo::Result<()> {
        roundtrip!(self, RemoveRenderer { z: z })
    }

    async fn pause_animation(&self) -> zbus::fdo::Result<()> {
        roundtrip!(self, PauseAnimation {})
    }

    async fn resume_animation(&self) -> zbus::fdo::Result<()> {
        roundtrip!(self, ResumeAnimation {})
    }

    async fn stop_animation(&self) -> zbus::fdo::Result<()> {
        roundtrip!(self, StopAnimation {})
    }

    /// Returns the current frame as a flat row-major list of `0xRRGGBB`
    /// values (§6: `get_current_frame`).
    async fn get_current_frame(&self) -> zbus::fdo::Result<Vec<u32>> {
        let cells: Vec<Color> = roundtrip!(self, GetCurrentFrame {})?;
        Ok(cells
            .into_iter()
            .map(|c| {
                let [r, g, b] = c.to_hardware_rgb();
                (r as u32) << 16 | (g as u32) << 8 | b as u32
            })
            .collect())
    }

    async fn set_fan_auto(&self) -> zbus::fdo::Result<()> {
        roundtrip!(self, SetFanAuto {})
    }

    async fn set_fan_rpm(&self, rpm1: u16, rpm2: u16) -> zbus::fdo::Result<String> {
        let rpm2 = if rpm2 == 0 { None } else { Some(rpm2) };
        let reason: &'static str = roundtrip!(self, SetFanRpm { rpm1: rpm1, rpm2: rpm2 })?;
        Ok(reason.to_string())
    }

    async fn get_fan_rpm(&self) -> zbus::fdo::Result<(u16, u16)> {
        let (f1, f2) = roundtrip!(self, GetFanRpm {})?;
        Ok((f1, f2.unwrap_or(0)))
    }

    async fn set_power_mode(&self, mode: u8) -> zbus::fdo::Result<()> {
        roundtrip!(self, SetPowerMode { mode: mode })
    }

    async fn set_boost(&self, value: u8) -> zbus::fdo::Result<()> {
        roundtrip!(self, SetBoost { value: value })
    }

    async fn get_temperatures(&self) -> zbus::fdo::Result<Vec<f32>> {
        roundtrip!(self, GetTemperatures {})
    }
}
