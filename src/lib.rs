//! Core library for `razerd`: wire protocol, device driver, animation
//! compositor, and device lifecycle manager.

pub mod color;
pub mod compositor;
pub mod config;
pub mod dbus;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod frame;
pub mod input;
pub mod layer;
pub mod manager;
pub mod protocol;
pub mod renderer;
pub mod surface;
pub mod transport;

pub use error::{CoreError, CoreResult};
