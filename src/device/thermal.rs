//! Thermal/safety overlay for laptop fan control (§4.6).

use std::collections::HashMap;
use std::fs;

use crate::error::CoreError;

/// Injected collaborator reading OS temperature sensors. A single method,
/// per spec.md §4.6's "treat as an injected collaborator."
pub trait ThermalSource: Send + Sync {
    fn read_temperatures(&self) -> Result<HashMap<String, f32>, CoreError>;
}

pub const OVERRIDE_TRIP_C: f32 = 95.0;
pub const OVERRIDE_CLEAR_C: f32 = 90.0;

/// Reads `/sys/class/thermal/thermal_zone*/temp`, the Linux default.
pub struct SysfsThermalSource;

impl ThermalSource for SysfsThermalSource {
    fn read_temperatures(&self) -> Result<HashMap<String, f32>, CoreError> {
        let mut out = HashMap::new();
        let entries = fs::read_dir("/sys/class/thermal")
            .map_err(|e| CoreError::Io(format!("reading thermal zones: {e}")))?;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) if n.starts_with("thermal_zone") => n.to_string(),
                _ => continue,
            };
            let Ok(raw) = fs::read_to_string(path.join("temp")) else { continue };
            let Ok(millideg) = raw.trim().parse::<i64>() else { continue };
            out.insert(name, millideg as f32 / 1000.0);
        }
        Ok(out)
    }
}

/// A fixed-reading source used by tests (§8 scenario 6).
pub struct FakeThermalSource(pub HashMap<String, f32>);

impl ThermalSource for FakeThermalSource {
    fn read_temperatures(&self) -> Result<HashMap<String, f32>, CoreError> {
        Ok(self.0.clone())
    }
}

/// Returns `true` if any reading is at or above the override trip point
/// (§4.6). Forcing `set_fan_auto()` and refusing manual control is the
/// caller's responsibility ([`crate::device::driver::DeviceDriver::set_fan_rpm`]);
/// this helper only answers the safety question.
pub fn exceeds_trip(temps: &HashMap<String, f32>) -> bool {
    temps.values().any(|&t| t >= OVERRIDE_TRIP_C)
}

pub fn below_clear(temps: &HashMap<String, f32>) -> bool {
    temps.values().all(|&t| t < OVERRIDE_CLEAR_C)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_at_95_degrees() {
        let mut temps = HashMap::new();
        temps.insert("cpu".to_string(), 96.0);
        assert!(exceeds_trip(&temps));
    }

    #[test]
    fn does_not_trip_below_95() {
        let mut temps = HashMap::new();
        temps.insert("cpu".to_string(), 94.9);
        assert!(!exceeds_trip(&temps));
    }

    #[test]
    fn clears_below_90() {
        let mut temps = HashMap::new();
        temps.insert("cpu".to_string(), 88.0);
        assert!(below_clear(&temps));
    }
}
