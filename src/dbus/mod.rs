//! Bridges the synchronous device-manager core to zbus's async runtime
//! (§6). A `calloop::channel::Sender<DaemonCommand>` carries fire-and-forget
//! or request/response (via `tokio::sync::oneshot`) messages from the D-Bus
//! interface objects into the core loop.

pub mod daemon;
pub mod device;

use std::collections::HashMap;

use tokio::sync::oneshot;

use crate::color::Color;
use crate::descriptor::{CapabilityFlag, DeviceKind, Dimensions};
use crate::device::LedProps;
use crate::error::CoreResult;
use crate::renderer::TraitValue;

pub type Reply<T> = oneshot::Sender<CoreResult<T>>;

/// Static, non-runtime facts about a device, suitable for `list_devices`
/// without round-tripping into the device's own object (§6).
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub id: u32,
    pub name: String,
    pub kind: DeviceKind,
}

/// Full snapshot of one device's readable state (§6 property list).
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub kind: DeviceKind,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial: String,
    pub firmware: String,
    pub dimensions: Option<Dimensions>,
    pub supported_leds: Vec<u8>,
    pub supported_renderers: Vec<&'static str>,
    pub capabilities: Vec<CapabilityFlag>,
    pub brightness: u8,
    pub suspended: bool,
    pub current_effect: Option<String>,
    pub available_effects: Vec<String>,
    pub active_layers: Vec<u32>,
    pub battery: Option<u8>,
    pub charging: Option<bool>,
}

/// Commands accepted by the device manager's core loop, one per D-Bus
/// operation (§6). Every request/response pair rides a `oneshot` channel;
/// notifications the core needs no answer to are fire-and-forget.
pub enum DaemonCommand {
    ListDevices { reply: oneshot::Sender<Vec<DeviceSummary>> },
    GetDeviceInfo { id: u32, reply: Reply<DeviceInfo> },
    SetBrightness { id: u32, pct: u8, reply: Reply<()> },
    SetSuspend { id: u32, suspended: bool, reply: Reply<()> },
    Reset { id: u32, reply: Reply<()> },
    SetLed { id: u32, led_id: u8, props: LedProps, reply: Reply<()> },
    SetEffect { id: u32, name: String, args: HashMap<String, String>, reply: Reply<()> },
    ListAvailableRenderers { id: u32, reply: Reply<Vec<&'static str>> },
    AddRenderer { id: u32, name: String, z: Option<u32>, traits: Vec<(String, TraitValue)>, reply: Reply<u32> },
    SetLayerTraits { id: u32, z: u32, name: String, value: TraitValue, reply: Reply<()> },
    RemoveRenderer { id: u32, z: u32, reply: Reply<()> },
    PauseAnimation { id: u32, reply: Reply<()> },
    ResumeAnimation { id: u32, reply: Reply<()> },
    StopAnimation { id: u32, reply: Reply<()> },
    GetCurrentFrame { id: u32, reply: Reply<Vec<Color>> },
    SetFanAuto { id: u32, reply: Reply<()> },
    SetFanRpm { id: u32, rpm1: u16, rpm2: Option<u16>, reply: Reply<&'static str> },
    GetFanRpm { id: u32, reply: Reply<(u16, Option<u16>)> },
    SetPowerMode { id: u32, mode: u8, reply: Reply<()> },
    SetBoost { id: u32, value: u8, reply: Reply<()> },
    GetTemperatures { id: u32, reply: Reply<Vec<f32>> },
}
