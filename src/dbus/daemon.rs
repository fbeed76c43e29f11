//! The daemon root object, `org.razer.Daemon` at `/org/razer/Daemon` (§6).

use calloop::channel::Sender;
use tokio::sync::oneshot;
use tracing::{debug, info};
use zbus::object_server::SignalEmitter;
use zbus::{interface, Connection};

use super::device::DeviceInterface;
use super::DaemonCommand;

pub struct DaemonInterface {
    core_tx: Sender<DaemonCommand>,
    connection: Connection,
}

impl DaemonInterface {
    pub fn new(core_tx: Sender<DaemonCommand>, connection: Connection) -> Self {
        DaemonInterface { core_tx, connection }
    }
}

#[interface(name = "org.razer.Daemon")]
impl DaemonInterface {
    /// Returns `(id, name, kind)` for every currently attached device (§6).
    async fn list_devices(&self) -> zbus::fdo::Result<Vec<(u32, String, String)>> {
        let (tx, rx) = oneshot::channel();
        self.core_tx
            .send(DaemonCommand::ListDevices { reply: tx })
            .map_err(|e| zbus::fdo::Error::Failed(format!("core channel closed: {e}")))?;
        let devices = rx.await.map_err(|e| zbus::fdo::Error::Failed(format!("core reply dropped: {e}")))?;
        Ok(devices.into_iter().map(|d| (d.id, d.name, format!("{:?}", d.kind).to_lowercase())).collect())
    }

    /// Registers a per-device object at `/org/razer/Daemon/device/<id>` the
    /// first time it is seen.
    pub async fn register_device(&self, id: u32) -> zbus::Result<()> {
        let path = format!("/org/razer/Daemon/device/{id}");
        debug!(id, %path, "registering device object");
        let iface = DeviceInterface::new(id, self.core_tx.clone());
        self.connection.object_server().at(path, iface).await?;
        Ok(())
    }

    pub async fn unregister_device(&self, id: u32) -> zbus::Result<()> {
        let path = format!("/org/razer/Daemon/device/{id}");
        self.connection.object_server().remove::<DeviceInterface, _>(path).await?;
        Ok(())
    }

    #[zbus(signal)]
    pub async fn device_added(signal_emitter: &SignalEmitter<'_>, id: u32, name: String) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn device_removed(signal_emitter: &SignalEmitter<'_>, id: u32) -> zbus::Result<()>;
}

/// Starts the D-Bus service on the system bus (device control is a
/// system-wide concern rather than a per-session one) and drives forwarding
/// of [`super::super::manager::DaemonEvent`]s into D-Bus signals until the
/// process exits.
pub async fn run(
    core_tx: Sender<DaemonCommand>,
    mut manager_events: tokio::sync::mpsc::UnboundedReceiver<crate::manager::DaemonEvent>,
) -> zbus::Result<()> {
    let connection = Connection::system().await?;

    let daemon = DaemonInterface::new(core_tx.clone(), connection.clone());
    connection.object_server().at("/org/razer/Daemon", daemon).await?;
    connection.request_name("org.razer.Daemon").await?;
    info!("D-Bus service started at org.razer.Daemon");

    while let Some(event) = manager_events.recv().await {
        let iface_ref = connection
            .object_server()
            .interface::<_, DaemonInterface>("/org/razer/Daemon")
            .await?;
        match event {
            crate::manager::DaemonEvent::DeviceAdded { id, name } => {
                if let Err(e) = iface_ref.get().register_device(id).await {
                    tracing::warn!(id, error = %e, "failed to register device object");
                }
                let emitter = iface_ref.signal_emitter();
                let _ = DaemonInterface::device_added(emitter, id, name).await;
            }
            crate::manager::DaemonEvent::DeviceRemoved { id } => {
                if let Err(e) = iface_ref.get().unregister_device(id).await {
                    tracing::warn!(id, error = %e, "failed to unregister device object");
                }
                let emitter = iface_ref.signal_emitter();
                let _ = DaemonInterface::device_removed(emitter, id).await;
            }
        }
    }

    Ok(())
}
