//! Crate-wide error taxonomy (§7).
//!
//! Every public operation on a [`crate::device::DeviceDriver`], the compositor, or
//! the remote object interface surfaces one of these variants. The set is closed:
//! new failure modes should be mapped onto an existing variant rather than grown
//! ad hoc, since `CoreError` crosses the D-Bus boundary as a typed
//! `zbus::fdo::Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("operation not supported on this device: {0}")]
    Unsupported(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("device busy after {0} retries")]
    DeviceBusy(u8),

    #[error("device offline: {0}")]
    DeviceOffline(String),

    #[error("timed out waiting for device response")]
    Timeout,

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("renderer '{0}' failed: {1}")]
    RendererFailed(String, String),

    #[error("z-index {0} is already occupied")]
    Conflict(u32),

    #[error("operation exceeded its deadline")]
    Deadline,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport I/O error: {0}")]
    Io(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Io(e.to_string())
    }
}

impl From<hidapi::HidError> for CoreError {
    fn from(e: hidapi::HidError) -> Self {
        CoreError::Io(e.to_string())
    }
}

/// Bridges [`CoreError`] onto the wire as a D-Bus error: maps internal errors
/// to `zbus::fdo::Error::Failed` with a short, human-readable reason rather
/// than ever panicking across the bus.
impl From<CoreError> for zbus::fdo::Error {
    fn from(e: CoreError) -> Self {
        zbus::fdo::Error::Failed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_message_contains_context() {
        let e = CoreError::Unsupported("led 0x09 not in descriptor".into());
        assert!(e.to_string().contains("led 0x09"));
    }

    #[test]
    fn converts_to_dbus_error() {
        let e = CoreError::Timeout;
        let dbus_err: zbus::fdo::Error = e.into();
        assert!(matches!(dbus_err, zbus::fdo::Error::Failed(_)));
    }
}
