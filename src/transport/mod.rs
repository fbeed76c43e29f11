//! USB HID transport (§4.4).

pub mod hid;

pub use hid::{FakeTransport, HidApiTransport, HidTransport};
