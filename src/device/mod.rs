//! One physical device: protocol dispatch, cached state, and the thermal
//! safety overlay (§4.5, §4.6).

pub mod driver;
pub mod state;
pub mod thermal;

pub use driver::{DeviceDriver, LedProps};
pub use state::{DeviceState, EffectState, LedState, WirelessTelemetry};
pub use thermal::ThermalSource;
