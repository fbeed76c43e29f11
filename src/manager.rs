//! USB hotplug discovery, descriptor resolution, and device lifecycle
//! (§4.12).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::compositor::Compositor;
use crate::descriptor::{CapabilityFlag, DescriptorStore};
use crate::device::{DeviceDriver, ThermalSource};
use crate::error::{CoreError, CoreResult};
use crate::frame::FrameBuffer;
use crate::input::KeySource;
use crate::transport::{HidApiTransport, HidTransport};

/// Heartbeat window for wireless devices (§4.12).
pub const WIRELESS_OFFLINE_TIMEOUT: Duration = Duration::from_secs(30);
const HOTPLUG_OPEN_RETRY_DELAY: Duration = Duration::from_millis(250);
const UNRESPONSIVE_TIMEOUT: Duration = Duration::from_millis(500);

/// Published to the D-Bus side of the daemon (§6: `device_added`/`device_removed`).
#[derive(Debug, Clone)]
pub enum DaemonEvent {
    DeviceAdded { id: u32, name: String },
    DeviceRemoved { id: u32 },
}

/// Raw udev hotplug notification, forwarded from the blocking monitor thread
/// (see [`spawn_udev_monitor_thread`]) into the core loop's calloop channel.
#[derive(Debug, Clone)]
pub enum HotplugEvent {
    Add { devnode: String, vendor_id: u16, product_id: u16 },
    Remove { devnode: String },
}

/// Runs `udev::MonitorSocket`'s blocking iterator on a dedicated thread and
/// forwards `hidraw` add/remove events onto `tx`, since calloop has no
/// built-in udev source and the monitor socket's `poll`-based API is easiest
/// to drive from a thread rather than hand-integrated into the cooperative
/// loop (§4.12).
pub fn spawn_udev_monitor_thread(tx: calloop::channel::Sender<HotplugEvent>) -> std::io::Result<()> {
    let socket = udev::MonitorBuilder::new()?.match_subsystem("hidraw")?.listen()?;
    std::thread::Builder::new().name("udev-monitor".into()).spawn(move || {
        for event in socket.iter() {
            let Some(devnode) = event.devnode().and_then(|p| p.to_str()).map(str::to_string) else { continue };
            match event.event_type() {
                udev::EventType::Add => {
                    if let Some((vendor_id, product_id)) = usb_ids_of(event.device()) {
                        let _ = tx.send(HotplugEvent::Add { devnode, vendor_id, product_id });
                    }
                }
                udev::EventType::Remove => {
                    let _ = tx.send(HotplugEvent::Remove { devnode });
                }
                _ => {}
            }
        }
    })?;
    Ok(())
}

pub struct DeviceEntry {
    pub driver: Arc<Mutex<DeviceDriver>>,
    pub compositor: Compositor,
    pub wireless: bool,
    pub last_seen: Instant,
    key_source: Option<Box<dyn KeySource>>,
}

/// Locates the `/dev/input/eventN` node belonging to the same physical USB
/// device as `vendor_id`/`product_id`, by matching udev's `ID_VENDOR_ID`/
/// `ID_MODEL_ID` properties on the `input` subsystem (mirrors [`usb_ids_of`]'s
/// walk up to the owning `usb_device`, just starting from the other side).
#[cfg(feature = "key-input")]
fn evdev_node_for(vendor_id: u16, product_id: u16) -> Option<std::path::PathBuf> {
    let mut enumerator = udev::Enumerator::new().ok()?;
    enumerator.match_subsystem("input").ok()?;
    for device in enumerator.scan_devices().ok()? {
        let devnode = device.devnode()?;
        if !devnode.to_str()?.contains("event") {
            continue;
        }
        let vid = device.property_value("ID_VENDOR_ID")?.to_str()?;
        let pid = device.property_value("ID_MODEL_ID")?.to_str()?;
        if u16::from_str_radix(vid, 16).ok()? == vendor_id && u16::from_str_radix(pid, 16).ok()? == product_id {
            return Some(devnode.to_path_buf());
        }
    }
    None
}

fn open_key_source(vendor_id: u16, product_id: u16) -> Option<Box<dyn KeySource>> {
    #[cfg(feature = "key-input")]
    {
        let path = evdev_node_for(vendor_id, product_id)?;
        match crate::input::EvdevKeySource::open(&path) {
            Ok(source) => Some(Box::new(source)),
            Err(e) => {
                warn!(vendor_id, product_id, error = %e, "failed to open evdev key source");
                None
            }
        }
    }
    #[cfg(not(feature = "key-input"))]
    {
        let _ = (vendor_id, product_id);
        None
    }
}

pub struct DeviceManager {
    descriptors: DescriptorStore,
    vendor_id: u16,
    devices: HashMap<u32, DeviceEntry>,
    by_devnode: HashMap<String, u32>,
    next_id: u32,
    events: UnboundedSender<DaemonEvent>,
    thermal_factory: Box<dyn Fn() -> Arc<dyn ThermalSource> + Send>,
}

impl DeviceManager {
    pub fn new(
        descriptors: DescriptorStore,
        vendor_id: u16,
        events: UnboundedSender<DaemonEvent>,
        thermal_factory: Box<dyn Fn() -> Arc<dyn ThermalSource> + Send>,
    ) -> Self {
        DeviceManager {
            descriptors,
            vendor_id,
            devices: HashMap::new(),
            by_devnode: HashMap::new(),
            next_id: 0,
            events,
            thermal_factory,
        }
    }

    /// Dispatches one notification from [`spawn_udev_monitor_thread`].
    pub fn handle_hotplug(&mut self, event: HotplugEvent) {
        match event {
            HotplugEvent::Add { devnode, vendor_id, product_id } => {
                if vendor_id != self.vendor_id {
                    return;
                }
                match self.handle_add(vendor_id, product_id) {
                    Ok(Some(id)) => {
                        self.by_devnode.insert(devnode, id);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(vendor_id, product_id, error = %e, "failed to initialize hotplugged device"),
                }
            }
            HotplugEvent::Remove { devnode } => {
                if let Some(id) = self.by_devnode.remove(&devnode) {
                    self.handle_remove(id);
                }
            }
        }
    }

    pub fn devices(&self) -> &HashMap<u32, DeviceEntry> {
        &self.devices
    }

    pub fn device_mut(&mut self, id: u32) -> Option<&mut DeviceEntry> {
        self.devices.get_mut(&id)
    }

    /// Enumerates already-attached hidraw devices under our vendor id at
    /// startup, as a udev `Enumerator` scan rather than waiting on hotplug.
    pub fn scan_existing(&mut self) -> CoreResult<()> {
        let mut enumerator = udev::Enumerator::new().map_err(|e| CoreError::Io(format!("udev enumerator: {e}")))?;
        enumerator.match_subsystem("hidraw").map_err(|e| CoreError::Io(e.to_string()))?;
        let devices = enumerator.scan_devices().map_err(|e| CoreError::Io(e.to_string()))?;
        for device in devices {
            if let Some((vendor_id, product_id)) = usb_ids_of(&device) {
                if vendor_id == self.vendor_id {
                    if let Err(e) = self.handle_add(vendor_id, product_id) {
                        warn!(vendor_id, product_id, error = %e, "failed to initialize pre-attached device");
                    }
                }
            }
        }
        Ok(())
    }

    /// Handles one hotplug "add" (§4.12 steps 1-5). Returns the newly
    /// assigned device id, or `None` if no descriptor matched (and the
    /// device was silently ignored).
    pub fn handle_add(&mut self, vendor_id: u16, product_id: u16) -> CoreResult<Option<u32>> {
        let Some(descriptor) = self.descriptors.lookup(vendor_id, product_id) else {
            info!(vendor_id, product_id, "no descriptor for this device, ignoring");
            return Ok(None);
        };
        let descriptor = Arc::new(descriptor.clone());

        let api = hidapi::HidApi::new().map_err(CoreError::from)?;
        let delay = crate::protocol::ProtocolProfile::by_id(descriptor.protocol_profile).inter_command_delay;
        let transport = match HidApiTransport::open(&api, vendor_id, product_id, delay) {
            Ok(t) => t,
            Err(first_err) => {
                warn!(vendor_id, product_id, error = %first_err, "HID open failed, retrying once");
                std::thread::sleep(HOTPLUG_OPEN_RETRY_DELAY);
                HidApiTransport::open(&api, vendor_id, product_id, delay)?
            }
        };
        let transport: Arc<dyn HidTransport> = Arc::new(transport);

        let thermal = (self.thermal_factory)();
        let mut driver = DeviceDriver::new(descriptor.clone(), transport, thermal);

        let opened_at = Instant::now();
        let mut offline = false;
        match driver.get_firmware().and_then(|fw| driver.get_serial().map(|serial| (fw, serial))) {
            Ok((firmware, serial)) => {
                driver.state.firmware = Some(firmware);
                driver.state.serial = Some(serial);
            }
            Err(e) => {
                if opened_at.elapsed() >= UNRESPONSIVE_TIMEOUT {
                    warn!(vendor_id, product_id, error = %e, "device unresponsive at startup, deferring");
                    offline = true;
                    driver.state.offline = true;
                } else {
                    return Err(e);
                }
            }
        }

        let driver = Arc::new(Mutex::new(driver));
        let (rows, cols) = descriptor.dimensions.map(|d| (d.rows, d.cols)).unwrap_or((1, 1));
        let frame = FrameBuffer::new(rows, cols, descriptor.has_capability(CapabilityFlag::CustomFrameAlt));
        let compositor = Compositor::new(driver.clone(), descriptor.clone(), frame);

        let key_source =
            if descriptor.has_capability(CapabilityFlag::KeyInput) { open_key_source(vendor_id, product_id) } else { None };

        let id = self.next_id;
        self.next_id += 1;
        let wireless = descriptor.has_capability(CapabilityFlag::Wireless);
        self.devices.insert(id, DeviceEntry { driver, compositor, wireless, last_seen: Instant::now(), key_source });

        if !offline {
            let _ = self.events.send(DaemonEvent::DeviceAdded { id, name: descriptor.name.clone() });
        }
        Ok(Some(id))
    }

    /// Handles one hotplug "remove": publish, cancel the compositor, destroy
    /// the driver (§4.12).
    pub fn handle_remove(&mut self, id: u32) {
        if let Some(mut entry) = self.devices.remove(&id) {
            let _ = entry.compositor.stop_all();
            let _ = self.events.send(DaemonEvent::DeviceRemoved { id });
        }
    }

    /// Advances every active compositor by one tick and checks wireless
    /// heartbeat timeouts. Called from the core event loop's periodic timer.
    pub fn tick_all(&mut self, now: Instant) {
        for (id, entry) in self.devices.iter_mut() {
            if let Some(source) = entry.key_source.as_deref_mut() {
                while let Some(raw) = source.try_recv() {
                    entry.compositor.push_key_event(now, raw);
                }
            }
            if let Err(e) = entry.compositor.tick(now) {
                warn!(id, error = %e, "compositor tick failed");
            }
            if entry.wireless && now.duration_since(entry.last_seen) >= WIRELESS_OFFLINE_TIMEOUT {
                let mut driver = entry.driver.lock();
                if !driver.state.offline {
                    debug!(id, "wireless heartbeat lost, marking offline");
                    driver.state.offline = true;
                }
            }
        }
    }

    /// Records a successful heartbeat/response from a device, clearing any
    /// offline mark accrued by the wireless timeout (reconnection, §4.12).
    pub fn mark_seen(&mut self, id: u32) {
        if let Some(entry) = self.devices.get_mut(&id) {
            entry.last_seen = Instant::now();
            entry.driver.lock().state.offline = false;
        }
    }

    /// Executes one [`crate::dbus::DaemonCommand`] against the matching
    /// device and answers its reply channel.
    pub fn dispatch(&mut self, cmd: crate::dbus::DaemonCommand) {
        use crate::dbus::{DaemonCommand as C, DeviceInfo, DeviceSummary};

        fn not_found() -> CoreError {
            CoreError::DeviceOffline("no such device id".to_string())
        }

        match cmd {
            C::ListDevices { reply } => {
                let summaries = self
                    .devices
                    .iter()
                    .map(|(&id, entry)| DeviceSummary {
                        id,
                        name: entry.driver.lock().descriptor.name.clone(),
                        kind: entry.driver.lock().descriptor.kind,
                    })
                    .collect();
                let _ = reply.send(summaries);
            }
            C::GetDeviceInfo { id, reply } => {
                let result = self.devices.get(&id).ok_or_else(not_found).map(|entry| {
                    let driver = entry.driver.lock();
                    let d = &driver.descriptor;
                    DeviceInfo {
                        name: d.name.clone(),
                        kind: d.kind,
                        vendor_id: d.vendor_id,
                        product_id: d.product_id,
                        serial: driver.state.serial.clone().unwrap_or_default(),
                        firmware: driver
                            .state
                            .firmware
                            .map(|(major, minor)| format!("{major}.{minor}"))
                            .unwrap_or_default(),
                        dimensions: d.dimensions,
                        supported_leds: d.supported_leds.iter().copied().collect(),
                        supported_renderers: crate::renderer::builtin::BUILTIN_RENDERERS.iter().map(|(n, _)| *n).collect(),
                        capabilities: d.capabilities.iter().copied().collect(),
                        brightness: driver.state.brightness,
                        suspended: driver.state.suspended,
                        current_effect: driver.state.current_effect.as_ref().map(|e| e.name.clone()),
                        available_effects: d.supported_effects.iter().cloned().collect(),
                        active_layers: Vec::new(),
                        battery: driver.state.wireless.battery,
                        charging: driver.state.wireless.charging,
                    }
                });
                let _ = reply.send(result);
            }
            C::SetBrightness { id, pct, reply } => {
                let result = self.with_driver(id, |d| d.set_brightness(pct));
                let _ = reply.send(result);
            }
            C::SetSuspend { id, suspended, reply } => {
                let result = self.with_driver(id, |d| {
                    d.state.suspended = suspended;
                    if suspended {
                        d.reset()?;
                    }
                    Ok(())
                });
                let _ = reply.send(result);
            }
            C::Reset { id, reply } => {
                let result = self.with_driver(id, |d| d.reset());
                let _ = reply.send(result);
            }
            C::SetLed { id, led_id, props, reply } => {
                let result = self.with_driver(id, |d| d.set_led(led_id, props));
                let _ = reply.send(result);
            }
            C::SetEffect { id, name, args, reply } => {
                let result = self.with_driver(id, |d| d.set_effect(&name, args));
                let _ = reply.send(result);
            }
            C::ListAvailableRenderers { reply, .. } => {
                let _ = reply.send(Ok(crate::renderer::builtin::BUILTIN_RENDERERS.iter().map(|(n, _)| *n).collect()));
            }
            C::AddRenderer { id, name, z, traits, reply } => {
                let result = self
                    .devices
                    .get_mut(&id)
                    .ok_or_else(not_found)
                    .and_then(|entry| entry.compositor.add_renderer(&name, z, traits));
                let _ = reply.send(result);
            }
            C::SetLayerTraits { id, z, name, value, reply } => {
                let result = self
                    .devices
                    .get_mut(&id)
                    .ok_or_else(not_found)
                    .and_then(|entry| entry.compositor.set_trait(z, &name, value));
                let _ = reply.send(result);
            }
            C::RemoveRenderer { id, z, reply } => {
                let result = self
                    .devices
                    .get_mut(&id)
                    .ok_or_else(not_found)
                    .and_then(|entry| entry.compositor.remove_renderer(z));
                let _ = reply.send(result);
            }
            C::PauseAnimation { id, reply } => {
                let result = self.devices.get_mut(&id).ok_or_else(not_found).map(|entry| entry.compositor.pause());
                let _ = reply.send(result);
            }
            C::ResumeAnimation { id, reply } => {
                let result = self.devices.get_mut(&id).ok_or_else(not_found).map(|entry| entry.compositor.resume());
                let _ = reply.send(result);
            }
            C::StopAnimation { id, reply } => {
                let result = self
                    .devices
                    .get_mut(&id)
                    .ok_or_else(not_found)
                    .and_then(|entry| entry.compositor.stop_all());
                let _ = reply.send(result);
            }
            C::GetCurrentFrame { id, reply } => {
                let result = self.devices.get(&id).ok_or_else(not_found).map(|entry| entry.compositor.current_frame());
                let _ = reply.send(result);
            }
            C::SetFanAuto { id, reply } => {
                let result = self.with_driver(id, |d| d.set_fan_auto());
                let _ = reply.send(result);
            }
            C::SetFanRpm { id, rpm1, rpm2, reply } => {
                let result = self.with_driver(id, |d| d.set_fan_rpm(rpm1, rpm2));
                let _ = reply.send(result);
            }
            C::GetFanRpm { id, reply } => {
                let result = self.with_driver(id, |d| d.get_fan_rpm());
                let _ = reply.send(result);
            }
            C::SetPowerMode { id, mode, reply } => {
                let modes = ["balanced", "gaming", "creator", "custom"];
                let result = modes
                    .get(mode as usize)
                    .copied()
                    .ok_or_else(|| CoreError::InvalidArgument(format!("unknown power mode id {mode}")))
                    .and_then(|m| self.with_driver(id, |d| d.set_power_mode(m)));
                let _ = reply.send(result);
            }
            C::SetBoost { id, value, reply } => {
                let result = self.with_driver(id, |d| d.set_boost("cpu", value));
                let _ = reply.send(result);
            }
            C::GetTemperatures { id, reply } => {
                let result = self.with_driver(id, |d| d.get_temperatures());
                let _ = reply.send(result);
            }
        }
    }

    fn with_driver<T>(&self, id: u32, f: impl FnOnce(&mut DeviceDriver) -> CoreResult<T>) -> CoreResult<T> {
        let entry = self.devices.get(&id).ok_or_else(|| CoreError::DeviceOffline("no such device id".to_string()))?;
        f(&mut entry.driver.lock())
    }
}

fn usb_ids_of(device: &udev::Device) -> Option<(u16, u16)> {
    let mut candidate = Some(device.clone());
    while let Some(dev) = candidate {
        if dev.subsystem().and_then(|s| s.to_str()) == Some("usb") && dev.devtype().and_then(|d| d.to_str()) == Some("usb_device") {
            let vendor_id = dev.attribute_value("idVendor")?.to_str()?;
            let product_id = dev.attribute_value("idProduct")?.to_str()?;
            return Some((u16::from_str_radix(vendor_id, 16).ok()?, u16::from_str_radix(product_id, 16).ok()?));
        }
        candidate = dev.parent();
    }
    None
}
