//! A live device: state, and the command dispatch state machine (§4.5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::color::{pct_to_byte, Color};
use crate::descriptor::{CapabilityFlag, DeviceDescriptor};
use crate::device::state::{DeviceState, EffectState, LedState};
use crate::device::thermal::{self, ThermalSource};
use crate::error::{CoreError, CoreResult};
use crate::protocol::{pack, unpack, Command, EffectName, ProfileId, ProtocolProfile, Request, Response, Status};
use crate::transport::HidTransport;

const RETRY_INTERVALS_MS: [u64; 3] = [7, 14, 28];
const MAX_BUSY_RETRIES: u8 = 3;

/// Properties a caller may set on one LED (§4.5 `set_led`).
#[derive(Debug, Clone, Default)]
pub struct LedProps {
    pub color: Option<Color>,
    pub on: Option<bool>,
    pub brightness: Option<u8>,
    pub mode: Option<String>,
}

fn byte_to_pct(byte: u8) -> u8 {
    ((byte as f32 / 2.55).round() as i32).clamp(0, 100) as u8
}

pub struct DeviceDriver {
    pub descriptor: Arc<DeviceDescriptor>,
    transport: Arc<dyn HidTransport>,
    thermal: Arc<dyn ThermalSource>,
    profile: ProtocolProfile,
    pub state: DeviceState,
}

impl DeviceDriver {
    pub fn new(
        descriptor: Arc<DeviceDescriptor>,
        transport: Arc<dyn HidTransport>,
        thermal: Arc<dyn ThermalSource>,
    ) -> Self {
        let profile = ProtocolProfile::by_id(descriptor.protocol_profile);
        DeviceDriver { descriptor, transport, thermal, profile, state: DeviceState::default() }
    }

    fn default_led_id(&self) -> u8 {
        self.descriptor.supported_leds.iter().min().copied().unwrap_or(0x05)
    }

    /// Runs the full request/response state machine of §4.5 for one logical
    /// command: send, await, retry on BUSY (bounded) and TIMEOUT (once),
    /// raise everything else. The transport's device lock is held for the
    /// entire sequence, as required by §4.5's last line.
    fn execute(&self, command: Command, args: Vec<u8>) -> CoreResult<Response> {
        let def = command.def();
        if !command.allowed_on(self.profile.id) {
            return Err(CoreError::Unsupported(format!(
                "{command:?} is not available on protocol profile {:?}",
                self.profile.id
            )));
        }
        // `fixed_data_size` is the report's `data_size` header field, not
        // necessarily the length of `args`: a query command (e.g.
        // `get_firmware`) sends no argument bytes but still declares the
        // response size it expects back.
        let data_size = def.fixed_data_size.unwrap_or(args.len() as u8);
        let req = Request {
            transaction_id: self.profile.transaction_id,
            remaining_packets: 0,
            data_size,
            command_class: def.command_class,
            command_id: def.command_id,
            args,
        };
        self.transport.with_device(|| self.run_transaction(&req))
    }

    fn run_transaction(&self, req: &Request) -> CoreResult<Response> {
        let mut busy_retries: u8 = 0;
        let mut timeout_retried = false;
        loop {
            let buf = pack(req);
            self.transport.send_feature(&buf)?;
            let resp_buf = match self.transport.read_feature() {
                Ok(b) => b,
                Err(CoreError::Timeout) => {
                    if !timeout_retried {
                        timeout_retried = true;
                        continue;
                    }
                    return Err(CoreError::Timeout);
                }
                Err(e) => return Err(e),
            };
            let resp = unpack(resp_buf, self.profile.crc_skip_on_ok);
            if !resp.crc_ok {
                return Err(CoreError::ProtocolError("CRC mismatch on response".into()));
            }
            match resp.status {
                Status::Ok => return Ok(resp),
                Status::Busy => {
                    if busy_retries >= MAX_BUSY_RETRIES {
                        return Err(CoreError::DeviceBusy(MAX_BUSY_RETRIES));
                    }
                    std::thread::sleep(Duration::from_millis(RETRY_INTERVALS_MS[busy_retries as usize]));
                    busy_retries += 1;
                    continue;
                }
                Status::Timeout => {
                    if !timeout_retried {
                        timeout_retried = true;
                        continue;
                    }
                    return Err(CoreError::Timeout);
                }
                Status::Fail => return Err(CoreError::Io("device returned FAIL".into())),
                Status::Unsupported => {
                    return Err(CoreError::Unsupported("device reports command unsupported".into()))
                }
                Status::Unknown => return Err(CoreError::Io("device returned an unknown status".into())),
            }
        }
    }

    pub fn get_firmware(&mut self) -> CoreResult<(u8, u8)> {
        let resp = self.execute(Command::GetFirmware, vec![])?;
        let a = resp.args();
        Ok((a[0], a[1]))
    }

    pub fn get_serial(&mut self) -> CoreResult<String> {
        let resp = self.execute(Command::GetSerial, vec![])?;
        let a = resp.args();
        let end = a.iter().position(|&b| b == 0).unwrap_or(a.len());
        Ok(String::from_utf8_lossy(&a[..end]).into_owned())
    }

    pub fn set_brightness(&mut self, pct: u8) -> CoreResult<()> {
        if pct > 100 {
            return Err(CoreError::InvalidArgument(format!("brightness {pct} out of range [0,100]")));
        }
        let led = self.default_led_id();
        let byte = pct_to_byte(pct);
        self.execute(Command::SetLedBrightness, vec![led, byte])?;
        self.state.brightness = pct;
        Ok(())
    }

    pub fn get_brightness(&mut self) -> CoreResult<u8> {
        let led = self.default_led_id();
        let resp = self.execute(Command::GetLedBrightness, vec![led])?;
        let pct = byte_to_pct(resp.args()[0]);
        self.state.brightness = pct;
        Ok(pct)
    }

    /// Fails with `Unsupported` without sending a report if `led_id` is not
    /// in the descriptor's supported set (§8).
    pub fn set_led(&mut self, led_id: u8, props: LedProps) -> CoreResult<()> {
        if !self.descriptor.supports_led(led_id) {
            return Err(CoreError::Unsupported(format!("LED 0x{led_id:02X} is not supported by this device")));
        }
        let entry = self.state.led_states.entry(led_id).or_insert_with(LedState::default);

        if let Some(color) = props.color {
            let [r, g, b] = color.to_hardware_rgb();
            self.execute(Command::SetLedColor, vec![led_id, r, g, b, 0x00])?;
            entry.color = Some(color);
        }
        if let Some(on) = props.on {
            self.execute(Command::SetLedState, vec![led_id, on as u8, 0x00])?;
            entry.on = on;
        }
        if let Some(brightness) = props.brightness {
            self.execute(Command::SetLedBrightness, vec![led_id, pct_to_byte(brightness)])?;
            entry.brightness = brightness;
        }
        if let Some(mode) = props.mode {
            entry.mode = Some(mode);
        }
        Ok(())
    }

    /// Resolves `effect_name` through the effect table and builds the
    /// argument block for the active profile's column (§4.2, §8).
    pub fn set_effect(&mut self, effect_name: &str, args: HashMap<String, String>) -> CoreResult<()> {
        let effect = EffectName::from_name(effect_name)
            .ok_or_else(|| CoreError::Unsupported(format!("unknown effect '{effect_name}'")))?;
        let id = effect
            .id_for(self.profile.uses_extended_effect_class)
            .ok_or_else(|| CoreError::Unsupported(format!("effect '{effect_name}' has no mapping for this profile")))?;

        let color = args.get("color").and_then(|s| Color::from_hex(s));
        let mut payload = Vec::new();
        if self.profile.uses_extended_effect_class {
            payload.push(0x01); // varstore
            payload.push(self.default_led_id());
            payload.push(id);
            if let Some(c) = color {
                payload.extend_from_slice(&c.to_hardware_rgb());
            }
            self.execute(Command::SetEffectExtended, payload)?;
        } else {
            payload.push(id);
            if let Some(c) = color {
                payload.extend_from_slice(&c.to_hardware_rgb());
            } else {
                payload.extend_from_slice(&[0, 0, 0]);
            }
            self.execute(Command::SetEffectStandard, payload)?;
        }

        self.state.current_effect = Some(EffectState { name: effect_name.to_string(), args });
        Ok(())
    }

    /// Issues one or more matrix-frame reports per row, then latches with a
    /// `custom_frame` effect command (§4.5, §6).
    pub fn commit_matrix(&mut self, row_segments: &[(u16, Vec<(u16, u16, Vec<u8>)>)]) -> CoreResult<()> {
        let total_segments: usize = row_segments.iter().map(|(_, segs)| segs.len()).sum();
        let mut remaining = total_segments;
        for (row, segments) in row_segments {
            for (start_col, end_col, rgb) in segments {
                remaining -= 1;
                let mut args = vec![(*row & 0xFF) as u8, (*start_col & 0xFF) as u8, (*end_col & 0xFF) as u8];
                args.extend_from_slice(rgb);
                let command = if self.profile.uses_extended_effect_class {
                    Command::SetFrameMatrixExtended
                } else {
                    Command::SetFrameMatrixStandard
                };
                let def = command.def();
                if !command.allowed_on(self.profile.id) {
                    return Err(CoreError::Unsupported("matrix frame command unavailable on this profile".into()));
                }
                let req = Request {
                    transaction_id: self.profile.transaction_id,
                    remaining_packets: remaining as u16,
                    data_size: args.len() as u8,
                    command_class: def.command_class,
                    command_id: def.command_id,
                    args,
                };
                self.transport.with_device(|| self.run_transaction(&req))?;
            }
        }
        self.set_effect("custom_frame", HashMap::new())
    }

    pub fn reset(&mut self) -> CoreResult<()> {
        self.set_effect("disable", HashMap::new())?;
        self.set_brightness(100)?;
        Ok(())
    }

    fn require_capability(&self, flag: CapabilityFlag, what: &str) -> CoreResult<()> {
        if self.descriptor.has_capability(flag) {
            Ok(())
        } else {
            Err(CoreError::Unsupported(format!("{what} requires capability {flag:?}")))
        }
    }

    pub fn get_battery(&mut self) -> CoreResult<u8> {
        self.require_capability(CapabilityFlag::Wireless, "get_battery")?;
        match self.execute(Command::GetBattery, vec![]) {
            Ok(resp) => {
                let pct = (resp.args()[1] as f32 / 255.0 * 100.0).round() as u8;
                self.state.wireless.battery = Some(pct);
                self.state.wireless.stale = false;
                Ok(pct)
            }
            Err(e) => {
                self.state.wireless.stale = true;
                Err(e)
            }
        }
    }

    pub fn get_charging(&mut self) -> CoreResult<bool> {
        self.require_capability(CapabilityFlag::Wireless, "get_charging")?;
        match self.execute(Command::GetCharging, vec![]) {
            Ok(resp) => {
                let charging = resp.args()[1] > 0;
                self.state.wireless.charging = Some(charging);
                self.state.wireless.stale = false;
                Ok(charging)
            }
            Err(e) => {
                self.state.wireless.stale = true;
                Err(e)
            }
        }
    }

    pub fn set_idle_time(&mut self, secs: u16) -> CoreResult<()> {
        self.require_capability(CapabilityFlag::Wireless, "set_idle_time")?;
        if !(60..=900).contains(&secs) {
            return Err(CoreError::InvalidArgument(format!("idle time {secs} out of range [60,900]")));
        }
        self.execute(Command::SetIdleTime, vec![(secs >> 8) as u8, (secs & 0xFF) as u8])?;
        Ok(())
    }

    pub fn get_idle_time(&mut self) -> CoreResult<u16> {
        self.require_capability(CapabilityFlag::Wireless, "get_idle_time")?;
        let resp = self.execute(Command::GetIdleTime, vec![])?;
        let a = resp.args();
        Ok(u16::from_be_bytes([a[0], a[1]]))
    }

    pub fn get_fan_rpm(&mut self) -> CoreResult<(u16, Option<u16>)> {
        self.require_capability(CapabilityFlag::SystemControl, "get_fan_rpm")?;
        let resp = self.execute(Command::GetFanRpm, vec![])?;
        let a = resp.args();
        let f1 = u16::from_be_bytes([a[0], a[1]]);
        let f2 = u16::from_be_bytes([a[2], a[3]]);
        Ok((f1, if f2 == 0 { None } else { Some(f2) }))
    }

    pub fn set_fan_auto(&mut self) -> CoreResult<()> {
        self.require_capability(CapabilityFlag::SystemControl, "set_fan_auto")?;
        self.execute(Command::SetFanAuto, vec![0x01])?;
        Ok(())
    }

    /// Enforces the thermal safety overlay (§4.6): overheating forces auto
    /// mode and latches a lockout that blocks manual requests until
    /// temperatures fall below the clear point, not merely until they drop
    /// back under the trip point.
    pub fn set_fan_rpm(&mut self, rpm1: u16, rpm2: Option<u16>) -> CoreResult<&'static str> {
        self.require_capability(CapabilityFlag::SystemControl, "set_fan_rpm")?;

        let temps = self.thermal.read_temperatures()?;
        if thermal::exceeds_trip(&temps) {
            self.state.thermal_locked_out = true;
        }
        if self.state.thermal_locked_out {
            if thermal::below_clear(&temps) {
                self.state.thermal_locked_out = false;
            } else {
                self.set_fan_auto()?;
                warn!(?temps, "thermal override: forcing fan auto mode");
                return Ok("thermal override active");
            }
        }

        let limits = self.descriptor.fan_limits;
        for rpm in [Some(rpm1), rpm2].into_iter().flatten() {
            if rpm < limits.min_manual_rpm || rpm > limits.max_rpm {
                return Err(CoreError::InvalidArgument(format!(
                    "rpm {rpm} out of range [{}, {}]",
                    limits.min_manual_rpm, limits.max_rpm
                )));
            }
        }

        let mut args = vec![(rpm1 >> 8) as u8, (rpm1 & 0xFF) as u8];
        let rpm2v = rpm2.unwrap_or(0);
        args.extend_from_slice(&[(rpm2v >> 8) as u8, (rpm2v & 0xFF) as u8]);
        self.execute(Command::SetFanRpm, args)?;
        debug!(rpm1, ?rpm2, "fan rpm set");
        Ok("ok")
    }

    /// Exposes the injected [`ThermalSource`]'s readings directly for the
    /// remote interface's `get_temperatures` (§6, §4.6).
    pub fn get_temperatures(&self) -> CoreResult<Vec<f32>> {
        self.require_capability(CapabilityFlag::SystemControl, "get_temperatures")?;
        Ok(self.thermal.read_temperatures()?.into_values().collect())
    }

    pub fn set_power_mode(&mut self, mode: &str) -> CoreResult<()> {
        self.require_capability(CapabilityFlag::SystemControl, "set_power_mode")?;
        let id = match mode {
            "balanced" => 0,
            "gaming" => 1,
            "creator" => 2,
            "custom" => 3,
            other => return Err(CoreError::InvalidArgument(format!("unknown power mode '{other}'"))),
        };
        self.execute(Command::SetPowerMode, vec![id, 0x00])?;
        Ok(())
    }

    pub fn set_boost(&mut self, target: &str, level: u8) -> CoreResult<()> {
        self.require_capability(CapabilityFlag::SystemControl, "set_boost")?;
        let target_byte = match target {
            "cpu" => 0,
            "gpu" => 1,
            other => return Err(CoreError::InvalidArgument(format!("unknown boost target '{other}'"))),
        };
        self.execute(Command::SetBoost, vec![target_byte, level])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DeviceKind, Dimensions, FanLimits};
    use crate::device::thermal::FakeThermalSource;
    use crate::protocol::{pack, unpack, REPORT_LEN};
    use crate::transport::FakeTransport;
    use std::collections::HashSet;

    fn descriptor(profile: ProfileId, caps: &[CapabilityFlag]) -> Arc<DeviceDescriptor> {
        Arc::new(DeviceDescriptor {
            name: "Test Keyboard".into(),
            kind: DeviceKind::Keyboard,
            vendor_id: 0x1532,
            product_id: 0x0000,
            dimensions: Some(Dimensions { rows: 6, cols: 22 }),
            supported_leds: [0x05].into_iter().collect(),
            supported_effects: ["static".into(), "wave".into(), "disable".into(), "custom_frame".into()]
                .into_iter()
                .collect::<HashSet<_>>(),
            capabilities: caps.iter().copied().collect(),
            key_map: HashMap::new(),
            protocol_profile: profile,
            fan_limits: FanLimits::default(),
        })
    }

    fn ok_response(command_class: u8, command_id: u8, args: &[u8]) -> [u8; REPORT_LEN] {
        let req = Request {
            transaction_id: 0,
            remaining_packets: 0,
            data_size: args.len() as u8,
            command_class,
            command_id,
            args: args.to_vec(),
        };
        let mut buf = pack(&req);
        buf[0] = Status::Ok.to_byte();
        buf[88] = buf[1..87].iter().fold(0u8, |a, b| a ^ b);
        buf
    }

    #[test]
    fn set_effect_static_matches_scenario_1_byte_layout() {
        let descriptor = descriptor(ProfileId::Legacy, &[]);
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(0)));
        transport.push_response(Ok(ok_response(0x03, 0x0A, &[0x06, 0xFF, 0x00, 0x00])));
        let mut driver = DeviceDriver::new(descriptor, transport.clone(), Arc::new(FakeThermalSource(HashMap::new())));

        let mut args = HashMap::new();
        args.insert("color".to_string(), "#ff0000".to_string());
        driver.set_effect("static", args).unwrap();

        let sent = transport.sent();
        let buf = sent[0];
        assert_eq!(buf[1], 0xFF); // transaction id, Legacy profile
        assert_eq!(buf[4], 0x00);
        assert_eq!(buf[5], 0x04); // data size
        assert_eq!(buf[6], 0x03); // command class
        assert_eq!(buf[7], 0x0A); // command id
        assert_eq!(buf[8], 0x06); // effect id = static
        assert_eq!(buf[9], 0xFF);
        assert_eq!(buf[10], 0x00);
        assert_eq!(buf[11], 0x00);
        assert_eq!(driver.state.current_effect.as_ref().unwrap().name, "static");
    }

    #[test]
    fn set_brightness_75_matches_scenario_2_byte_layout() {
        let descriptor = descriptor(ProfileId::WirelessKeyboard, &[CapabilityFlag::Wireless]);
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(0)));
        transport.push_response(Ok(ok_response(0x03, 0x03, &[0x05, 0xBF])));
        let mut driver = DeviceDriver::new(descriptor, transport.clone(), Arc::new(FakeThermalSource(HashMap::new())));

        driver.set_brightness(75).unwrap();

        let buf = transport.sent()[0];
        assert_eq!(buf[1], 0x9F);
        assert_eq!(buf[6], 0x03);
        assert_eq!(buf[7], 0x03);
        assert_eq!(buf[8], 0x05); // default LED id
        assert_eq!(buf[9], 0xBF); // round(75 * 2.55)
    }

    #[test]
    fn set_led_rejects_unsupported_led_without_sending() {
        let descriptor = descriptor(ProfileId::Legacy, &[]);
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(0)));
        let mut driver = DeviceDriver::new(descriptor, transport.clone(), Arc::new(FakeThermalSource(HashMap::new())));

        let result = driver.set_led(0x09, LedProps { on: Some(true), ..Default::default() });
        assert!(matches!(result, Err(CoreError::Unsupported(_))));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn busy_then_ok_retries_and_succeeds() {
        let descriptor = descriptor(ProfileId::Legacy, &[]);
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(0)));
        let mut busy = [0u8; REPORT_LEN];
        busy[0] = Status::Busy.to_byte();
        busy[88] = busy[1..87].iter().fold(0u8, |a, b| a ^ b);
        transport.push_response(Ok(busy));
        transport.push_response(Ok(ok_response(0x00, 0x81, &[1, 2])));
        let mut driver = DeviceDriver::new(descriptor, transport, Arc::new(FakeThermalSource(HashMap::new())));

        let (major, minor) = driver.get_firmware().unwrap();
        assert_eq!((major, minor), (1, 2));
    }

    #[test]
    fn three_consecutive_busy_raises_device_busy() {
        let descriptor = descriptor(ProfileId::Legacy, &[]);
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(0)));
        for _ in 0..4 {
            let mut busy = [0u8; REPORT_LEN];
            busy[0] = Status::Busy.to_byte();
            busy[88] = busy[1..87].iter().fold(0u8, |a, b| a ^ b);
            transport.push_response(Ok(busy));
        }
        let mut driver = DeviceDriver::new(descriptor, transport, Arc::new(FakeThermalSource(HashMap::new())));
        let result = driver.get_firmware();
        assert!(matches!(result, Err(CoreError::DeviceBusy(3))));
    }

    #[test]
    fn fan_rpm_below_minimum_is_rejected() {
        let descriptor = descriptor(ProfileId::Modern, &[CapabilityFlag::SystemControl]);
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(0)));
        let mut driver = DeviceDriver::new(descriptor, transport, Arc::new(FakeThermalSource(HashMap::new())));
        let result = driver.set_fan_rpm(100, None);
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn fan_rpm_overridden_at_96_degrees() {
        let descriptor = descriptor(ProfileId::Modern, &[CapabilityFlag::SystemControl]);
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(0)));
        transport.push_response(Ok(ok_response(0x0D, 0x02, &[])));
        let mut temps = HashMap::new();
        temps.insert("cpu".to_string(), 96.0);
        let mut driver = DeviceDriver::new(descriptor, transport, Arc::new(FakeThermalSource(temps)));

        let reason = driver.set_fan_rpm(3500, None).unwrap();
        assert_eq!(reason, "thermal override active");
    }

    /// A thermal source whose reading can be changed between calls, for
    /// exercising the hysteresis band a fixed [`FakeThermalSource`] can't.
    struct MutableThermalSource(std::sync::Mutex<HashMap<String, f32>>);

    impl ThermalSource for MutableThermalSource {
        fn read_temperatures(&self) -> CoreResult<HashMap<String, f32>> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    impl MutableThermalSource {
        fn set(&self, temp: f32) {
            self.0.lock().unwrap().insert("cpu".to_string(), temp);
        }
    }

    #[test]
    fn thermal_lockout_persists_between_95_and_90_degrees() {
        let descriptor = descriptor(ProfileId::Modern, &[CapabilityFlag::SystemControl]);
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(0)));
        transport.push_response(Ok(ok_response(0x0D, 0x02, &[]))); // set_fan_auto at 96C
        transport.push_response(Ok(ok_response(0x0D, 0x02, &[]))); // set_fan_auto again at 92C
        transport.push_response(Ok(ok_response(0x0D, 0x03, &[]))); // manual rpm once cleared

        let thermal = Arc::new(MutableThermalSource(std::sync::Mutex::new(HashMap::new())));
        thermal.set(96.0);
        let mut driver = DeviceDriver::new(descriptor, transport, thermal.clone());

        let reason = driver.set_fan_rpm(3500, None).unwrap();
        assert_eq!(reason, "thermal override active");
        assert!(driver.state.thermal_locked_out);

        // Still in the 90-95C hysteresis band: remains locked out even
        // though this single reading no longer exceeds the 95C trip point.
        thermal.set(92.0);
        let reason = driver.set_fan_rpm(3500, None).unwrap();
        assert_eq!(reason, "thermal override active");
        assert!(driver.state.thermal_locked_out);

        // Below the 90C clear point: lockout releases and the manual
        // request proceeds.
        thermal.set(88.0);
        let reason = driver.set_fan_rpm(3500, None).unwrap();
        assert_eq!(reason, "ok");
        assert!(!driver.state.thermal_locked_out);
    }

    #[test]
    fn battery_timeout_marks_telemetry_stale() {
        let descriptor = descriptor(ProfileId::WirelessKeyboard, &[CapabilityFlag::Wireless]);
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(0)));
        // No responses queued at all -> every read times out.
        let mut driver = DeviceDriver::new(descriptor, transport, Arc::new(FakeThermalSource(HashMap::new())));
        let result = driver.get_battery();
        assert!(matches!(result, Err(CoreError::Timeout)));
        assert!(driver.state.wireless.stale);
    }
}
