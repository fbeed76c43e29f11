use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use calloop::channel::Event as ChannelEvent;
use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use clap::Parser;
use tracing::{error, info, warn};

use razerd_core::config::{Cli, Config};
use razerd_core::descriptor::loader::{DescriptorSource, YamlDescriptorSource};
use razerd_core::descriptor::DescriptorStore;
use razerd_core::device::thermal::SysfsThermalSource;
use razerd_core::device::ThermalSource;
use razerd_core::manager::{spawn_udev_monitor_thread, DeviceManager, HotplugEvent};

const TICK_PERIOD: Duration = Duration::from_millis(33); // ~30 Hz, the global cap (§4.10)

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref(), &cli);

    if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    } else {
        let level = config.log_level.parse().unwrap_or(tracing::Level::INFO);
        tracing_subscriber::fmt().with_max_level(level).init();
    }

    info!(vendor_id = format_args!("0x{:04x}", config.vendor_id), dev_mode = config.dev_mode, "starting razerd");

    let descriptors = match YamlDescriptorSource::new(&config.config_dir).load() {
        Ok(list) => {
            info!(count = list.len(), dir = %config.config_dir.display(), "loaded device descriptors");
            DescriptorStore::from_descriptors(list)
        }
        Err(e) => {
            warn!(error = %e, dir = %config.config_dir.display(), "failed to load device descriptors, starting with none known");
            DescriptorStore::from_descriptors(Vec::new())
        }
    };

    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
    let thermal_factory: Box<dyn Fn() -> Arc<dyn ThermalSource> + Send> = Box::new(|| Arc::new(SysfsThermalSource));
    let mut manager = DeviceManager::new(descriptors, config.vendor_id, event_tx, thermal_factory);

    if !config.dev_mode {
        if let Err(e) = manager.scan_existing() {
            warn!(error = %e, "initial udev scan failed");
        }
    }

    let mut event_loop: EventLoop<()> = EventLoop::try_new().context("creating event loop")?;
    let manager = Rc::new(RefCell::new(manager));

    let (hotplug_tx, hotplug_src) = calloop::channel::channel::<HotplugEvent>();
    if !config.dev_mode {
        if let Err(e) = spawn_udev_monitor_thread(hotplug_tx) {
            error!(error = %e, "failed to start udev monitor thread, hotplug disabled");
        }
    }
    {
        let manager = manager.clone();
        event_loop
            .handle()
            .insert_source(hotplug_src, move |event, _, _| {
                if let ChannelEvent::Msg(hotplug) = event {
                    manager.borrow_mut().handle_hotplug(hotplug);
                }
            })
            .map_err(|e| anyhow::anyhow!("registering hotplug source: {e}"))?;
    }

    let (cmd_tx, cmd_src) = calloop::channel::channel::<razerd_core::dbus::DaemonCommand>();
    {
        let manager = manager.clone();
        event_loop
            .handle()
            .insert_source(cmd_src, move |event, _, _| {
                if let ChannelEvent::Msg(cmd) = event {
                    manager.borrow_mut().dispatch(cmd);
                }
            })
            .map_err(|e| anyhow::anyhow!("registering command source: {e}"))?;
    }

    {
        let manager = manager.clone();
        let timer = Timer::immediate();
        event_loop
            .handle()
            .insert_source(timer, move |_deadline, _, _| {
                manager.borrow_mut().tick_all(Instant::now());
                TimeoutAction::ToDuration(TICK_PERIOD)
            })
            .map_err(|e| anyhow::anyhow!("registering tick timer: {e}"))?;
    }

    // zbus's async interface objects run on their own multi-thread tokio
    // runtime, talking back into this cooperative loop purely through the
    // two channels above.
    std::thread::Builder::new().name("dbus".into()).spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                error!(error = %e, "failed to start tokio runtime for D-Bus service");
                return;
            }
        };
        if let Err(e) = runtime.block_on(razerd_core::dbus::daemon::run(cmd_tx, event_rx)) {
            error!(error = %e, "D-Bus service exited");
        }
    })
    .context("spawning D-Bus service thread")?;

    event_loop.run(None, &mut (), |_| {}).context("running core event loop")?;
    Ok(())
}
