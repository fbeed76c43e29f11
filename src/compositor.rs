//! Orchestrates a device's renderers: z-ordering, composition, and the
//! global frame cap (§4.10).

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::warn;

use crate::color::Color;
use crate::descriptor::{CapabilityFlag, DeviceDescriptor};
use crate::device::DeviceDriver;
use crate::error::{CoreError, CoreResult};
use crate::frame::FrameBuffer;
use crate::input::{InputIntake, IntakeCursor, KeyInputEvent};
use crate::layer::Layer;
use crate::renderer::{builtin, clamp_fps, Renderer, TraitValue};

const RING_CAPACITY: usize = 2;
const MAX_COMMIT_FAILURES: u8 = 3;

struct RendererSlot {
    renderer: Box<dyn Renderer>,
    fps: u8,
    avail_q: VecDeque<Layer>,
    active_q: VecDeque<Layer>,
    sticky: Option<Layer>,
    last_tick: Option<Instant>,
    /// This renderer's own read position into the shared [`InputIntake`]
    /// log, per-renderer mask/TTL being renderer properties (§3, §4.9,
    /// §4.11).
    input_cursor: IntakeCursor,
}

pub struct Compositor {
    driver: Arc<Mutex<DeviceDriver>>,
    descriptor: Arc<DeviceDescriptor>,
    frame: FrameBuffer,
    slots: BTreeMap<u32, RendererSlot>,
    paused: bool,
    intake: InputIntake,
}

impl Compositor {
    pub fn new(driver: Arc<Mutex<DeviceDriver>>, descriptor: Arc<DeviceDescriptor>, frame: FrameBuffer) -> Self {
        Compositor {
            driver,
            descriptor,
            frame,
            slots: BTreeMap::new(),
            paused: false,
            intake: InputIntake::new(),
        }
    }

    pub fn intake_mut(&mut self) -> &mut InputIntake {
        &mut self.intake
    }

    /// Resolves and enqueues one raw OS key event from this device's
    /// [`crate::input::KeySource`] (§4.11).
    pub fn push_key_event(&mut self, now: Instant, raw: crate::input::RawKeyEvent) {
        self.intake.push(&self.descriptor, now, raw);
    }

    /// Validates traits, initializes, and allocates two layers before the
    /// renderer is admitted into the z-ordered list (§4.10).
    pub fn add_renderer(
        &mut self,
        name: &str,
        z: Option<u32>,
        traits: Vec<(String, TraitValue)>,
    ) -> CoreResult<u32> {
        let mut renderer =
            builtin::by_name(name).ok_or_else(|| CoreError::Unsupported(format!("no renderer named '{name}'")))?;

        if renderer.requires_key_input() && !self.descriptor.has_capability(CapabilityFlag::KeyInput) {
            return Err(CoreError::Unsupported(format!(
                "renderer '{name}' requires key_input, which this device lacks"
            )));
        }

        for (trait_name, value) in traits {
            renderer
                .set_trait(&trait_name, value)
                .map_err(|e| CoreError::InvalidArgument(format!("{name}.{trait_name}: {e}")))?;
        }

        if !renderer.init(self.frame.height(), self.frame.width()) {
            return Err(CoreError::RendererFailed(name.to_string(), "init returned false".to_string()));
        }

        let z = z.unwrap_or_else(|| self.slots.keys().max().map(|m| m + 1).unwrap_or(0));
        if self.slots.contains_key(&z) {
            renderer.finish();
            return Err(CoreError::Conflict(z));
        }

        let mut avail_q = VecDeque::with_capacity(RING_CAPACITY);
        for _ in 0..RING_CAPACITY {
            avail_q.push_back(Layer::new(self.frame.height(), self.frame.width()));
        }

        let fps = clamp_fps(renderer.declared_fps());
        self.intake.ensure_retention(renderer.key_expire_time());
        self.slots.insert(
            z,
            RendererSlot {
                renderer,
                fps,
                avail_q,
                active_q: VecDeque::with_capacity(RING_CAPACITY),
                sticky: None,
                last_tick: None,
                input_cursor: IntakeCursor::default(),
            },
        );
        Ok(z)
    }

    /// Cancels the renderer, drains both of its queues, calls `finish`, and
    /// frees its layers (§4.10).
    pub fn remove_renderer(&mut self, z: u32) -> CoreResult<()> {
        let mut slot = self.slots.remove(&z).ok_or_else(|| CoreError::Unsupported(format!("no renderer at z={z}")))?;
        slot.avail_q.clear();
        slot.active_q.clear();
        slot.renderer.finish();
        Ok(())
    }

    pub fn set_trait(&mut self, z: u32, name: &str, value: TraitValue) -> CoreResult<()> {
        let slot = self.slots.get_mut(&z).ok_or_else(|| CoreError::Unsupported(format!("no renderer at z={z}")))?;
        slot.renderer.set_trait(name, value).map_err(CoreError::InvalidArgument)
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Removes every renderer, then resets the device to its quiescent
    /// state (§4.10).
    pub fn stop_all(&mut self) -> CoreResult<()> {
        let zs: Vec<u32> = self.slots.keys().copied().collect();
        for z in zs {
            self.remove_renderer(z)?;
        }
        self.driver.lock().reset()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Row-major snapshot of the last committed (or about-to-commit) frame
    /// (§6: `get_current_frame`).
    pub fn current_frame(&self) -> Vec<Color> {
        self.frame.cells()
    }

    /// Runs one compositor tick (§4.10). Returns `true` if a frame was
    /// committed to hardware this tick.
    pub fn tick(&mut self, now: Instant) -> CoreResult<bool> {
        if self.paused {
            return Ok(false);
        }

        for slot in self.slots.values_mut() {
            let period = Duration::from_secs_f64(1.0 / slot.fps as f64);
            let due = slot.last_tick.map(|t| now.duration_since(t) >= period).unwrap_or(true);
            if !due {
                continue;
            }
            let Some(mut layer) = slot.avail_q.pop_front() else {
                continue; // backpressure: renderer is outpacing the compositor
            };
            layer.reset(Color::TRANSPARENT, slot.renderer.blend_mode(), slot.renderer.opacity());
            // Each renderer reads the shared intake log through its own
            // cursor, mask, and TTL (§3, §4.9, §4.11), so a renderer ticking
            // less often than another never loses an event the other has
            // already read.
            let events: Vec<KeyInputEvent> = if slot.renderer.requires_key_input() {
                self.intake.pop_for(&mut slot.input_cursor, slot.renderer.key_state_mask(), slot.renderer.key_expire_time(), now)
            } else {
                Vec::new()
            };
            let submit = slot.renderer.draw(&mut layer, now, &events);
            slot.last_tick = Some(now);
            if submit {
                layer.locked = true;
                slot.active_q.push_back(layer);
            } else {
                slot.avail_q.push_front(layer);
            }
        }

        let mut snapshot: Vec<(u32, Layer)> = Vec::new();
        for (&z, slot) in self.slots.iter_mut() {
            if let Some(layer) = slot.active_q.pop_front() {
                snapshot.push((z, layer));
            }
        }
        if snapshot.is_empty() {
            return Ok(false);
        }

        self.frame.clear();
        for (&z, slot) in self.slots.iter() {
            if let Some((_, layer)) = snapshot.iter().find(|(sz, _)| *sz == z) {
                self.frame.blit(layer);
            } else if let Some(sticky) = &slot.sticky {
                self.frame.blit(sticky);
            }
        }

        let rows = self.frame.encode_rows();
        let commit_result = self.driver.lock().commit_matrix(&rows);

        let mut driver = self.driver.lock();
        match &commit_result {
            Ok(()) => driver.state.consecutive_commit_failures = 0,
            Err(e) => {
                driver.state.consecutive_commit_failures += 1;
                warn!(error = %e, failures = driver.state.consecutive_commit_failures, "commit_matrix failed");
                if driver.state.consecutive_commit_failures >= MAX_COMMIT_FAILURES {
                    driver.state.offline = true;
                }
            }
        }
        drop(driver);

        for (z, mut layer) in snapshot {
            layer.locked = false;
            if let Some(slot) = self.slots.get_mut(&z) {
                slot.sticky = Some(layer.clone());
                slot.avail_q.push_back(layer);
            }
        }

        commit_result?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DeviceKind, Dimensions, FanLimits};
    use crate::device::thermal::FakeThermalSource;
    use crate::protocol::ProfileId;
    use crate::transport::FakeTransport;
    use std::collections::{HashMap, HashSet};

    fn descriptor(caps: &[CapabilityFlag]) -> Arc<DeviceDescriptor> {
        let mut key_map = HashMap::new();
        key_map.insert("KEY_A".to_string(), vec![(3, 5)]);
        Arc::new(DeviceDescriptor {
            name: "Test".into(),
            kind: DeviceKind::Keyboard,
            vendor_id: 0x1532,
            product_id: 0x0000,
            dimensions: Some(Dimensions { rows: 6, cols: 22 }),
            supported_leds: [0x05].into_iter().collect(),
            supported_effects: ["disable".into(), "custom_frame".into()].into_iter().collect::<HashSet<_>>(),
            capabilities: caps.iter().copied().collect(),
            key_map,
            protocol_profile: ProfileId::Legacy,
            fan_limits: FanLimits::default(),
        })
    }

    fn push_ok_responses(transport: &FakeTransport, n: usize) {
        use crate::protocol::{Status, REPORT_LEN};
        for _ in 0..n {
            let mut buf = [0u8; REPORT_LEN];
            buf[0] = Status::Ok.to_byte();
            transport.push_response(Ok(buf));
        }
    }

    fn compositor(caps: &[CapabilityFlag]) -> (Compositor, Arc<FakeTransport>) {
        let descriptor = descriptor(caps);
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(0)));
        let driver = Arc::new(Mutex::new(DeviceDriver::new(
            descriptor.clone(),
            transport.clone(),
            Arc::new(FakeThermalSource(HashMap::new())),
        )));
        let frame = FrameBuffer::new(6, 22, false);
        (Compositor::new(driver, descriptor, frame), transport)
    }

    #[test]
    fn adding_at_same_z_index_conflicts() {
        let (mut c, _transport) = compositor(&[]);
        c.add_renderer("plasma", Some(0), vec![]).unwrap();
        let result = c.add_renderer("plasma", Some(0), vec![]);
        assert!(matches!(result, Err(CoreError::Conflict(0))));
    }

    #[test]
    fn auto_assigned_z_index_increments() {
        let (mut c, _transport) = compositor(&[]);
        let z0 = c.add_renderer("plasma", None, vec![]).unwrap();
        let z1 = c.add_renderer("plasma", None, vec![]).unwrap();
        assert_eq!(z0, 0);
        assert_eq!(z1, 1);
    }

    #[test]
    fn ripple_rejected_without_key_input_capability() {
        let (mut c, _transport) = compositor(&[]);
        let result = c.add_renderer("ripple", None, vec![]);
        assert!(matches!(result, Err(CoreError::Unsupported(_))));
    }

    #[test]
    fn ripple_accepted_with_key_input_capability() {
        let (mut c, _transport) = compositor(&[CapabilityFlag::KeyInput]);
        assert!(c.add_renderer("ripple", None, vec![]).is_ok());
    }

    #[test]
    fn key_event_still_reaches_renderer_through_its_own_cursor() {
        let (mut c, transport) = compositor(&[CapabilityFlag::KeyInput]);
        c.add_renderer("ripple", Some(0), vec![]).unwrap();
        let now = Instant::now();
        c.push_key_event(
            now,
            crate::input::RawKeyEvent { keycode: "KEY_A".into(), scancode: 30, state: crate::input::KeyState::Down },
        );
        // 6 matrix-row segments + 1 effect latch once ripple draws a ring.
        push_ok_responses(&transport, 7);
        let committed = c.tick(now).unwrap();
        assert!(committed, "ripple should have drawn a ring from the queued key event");
    }

    #[test]
    fn plasma_alone_produces_a_frame_on_first_due_tick() {
        let (mut c, transport) = compositor(&[]);
        c.add_renderer("plasma", Some(0), vec![]).unwrap();
        // 6 matrix-row segments (one per row at width 22) + 1 effect latch.
        push_ok_responses(&transport, 7);
        let committed = c.tick(Instant::now()).unwrap();
        assert!(committed);
    }

    #[test]
    fn paused_compositor_never_commits() {
        let (mut c, _transport) = compositor(&[]);
        c.add_renderer("plasma", Some(0), vec![]).unwrap();
        c.pause();
        assert!(!c.tick(Instant::now()).unwrap());
    }
}
