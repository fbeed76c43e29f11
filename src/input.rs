//! Per-device keyboard event intake (§4.11).

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use bitflags::bitflags;

use crate::descriptor::DeviceDescriptor;
use crate::surface::Point;

bitflags! {
    /// Which key states a renderer's intake is subscribed to (§4.11).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyStateMask: u8 {
        const DOWN = 0b001;
        const UP   = 0b010;
        const HOLD = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Down,
    Up,
    Hold,
}

impl KeyState {
    fn mask_bit(self) -> KeyStateMask {
        match self {
            KeyState::Down => KeyStateMask::DOWN,
            KeyState::Up => KeyStateMask::UP,
            KeyState::Hold => KeyStateMask::HOLD,
        }
    }
}

/// Raw event as produced by the OS keyboard source, before TTL/coords
/// resolution (§4.11's injected `KeySource` seam).
#[derive(Debug, Clone)]
pub struct RawKeyEvent {
    pub keycode: String,
    pub scancode: u32,
    pub state: KeyState,
}

pub trait KeySource: Send {
    fn try_recv(&mut self) -> Option<RawKeyEvent>;
}

/// Reads raw `EV_KEY` events off a `/dev/input/eventN` node, gated behind the
/// `key-input` feature since most Chroma peripherals only ever speak the
/// feature-report protocol and never need a keyboard key source (§4.11).
///
/// The blocking `read(2)` loop runs on its own thread and forwards decoded
/// events over a channel, the same shape as
/// [`crate::manager::spawn_udev_monitor_thread`]'s hotplug monitor.
#[cfg(feature = "key-input")]
pub struct EvdevKeySource {
    rx: std::sync::mpsc::Receiver<RawKeyEvent>,
}

#[cfg(feature = "key-input")]
impl EvdevKeySource {
    pub fn open(path: &std::path::Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let handle = input_linux::evdev::EvdevHandle::new(file);
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::Builder::new().name("evdev-key-source".into()).spawn(move || {
            let mut buf = [input_linux::sys::input_event {
                time: input_linux::sys::timeval { tv_sec: 0, tv_usec: 0 },
                type_: 0,
                code: 0,
                value: 0,
            }; 16];
            loop {
                let n = match handle.read(&mut buf) {
                    Ok(n) => n,
                    Err(_) => return,
                };
                for raw in &buf[..n] {
                    if raw.type_ != input_linux::sys::EV_KEY as u16 {
                        continue;
                    }
                    let state = match raw.value {
                        0 => KeyState::Up,
                        1 => KeyState::Down,
                        _ => KeyState::Hold,
                    };
                    let keycode = input_linux::Key::from_code(raw.code)
                        .map(|k| format!("{k:?}"))
                        .unwrap_or_else(|_| format!("KEY_CODE_{}", raw.code));
                    if tx.send(RawKeyEvent { keycode, scancode: raw.code as u32, state }).is_err() {
                        return;
                    }
                }
            }
        })?;
        Ok(EvdevKeySource { rx })
    }
}

#[cfg(feature = "key-input")]
impl KeySource for EvdevKeySource {
    fn try_recv(&mut self) -> Option<RawKeyEvent> {
        self.rx.try_recv().ok()
    }
}

/// A scripted source for tests and `dev_mode`, standing in for the real
/// evdev source the same way [`crate::device::thermal::FakeThermalSource`]
/// stands in for [`crate::device::thermal::SysfsThermalSource`].
pub struct FakeKeySource {
    events: VecDeque<RawKeyEvent>,
}

impl FakeKeySource {
    pub fn new(events: Vec<RawKeyEvent>) -> Self {
        FakeKeySource { events: events.into() }
    }
}

impl KeySource for FakeKeySource {
    fn try_recv(&mut self) -> Option<RawKeyEvent> {
        self.events.pop_front()
    }
}

#[derive(Debug, Clone)]
pub struct KeyInputEvent {
    pub timestamp: Instant,
    pub expire_at: Option<Instant>,
    pub keycode: String,
    pub scancode: u32,
    pub keystate: KeyState,
    pub coords: Vec<Point>,
    pub payload: HashMap<String, String>,
}

/// One raw event resolved to matrix coordinates and tagged with a
/// monotonic sequence number, retained independent of any one renderer's
/// mask or TTL (§3 `KeyInputEvent`, §4.11).
struct ResolvedEvent {
    seq: u64,
    timestamp: Instant,
    raw: RawKeyEvent,
    coords: Vec<Point>,
}

/// Tracks how far into the shared event log one renderer has read, so a
/// renderer ticking less often than another doesn't lose events the other
/// already consumed (§4.11, §8 boundary behavior).
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeCursor(u64);

/// Per-device log of resolved key events, shared by every renderer on the
/// device. Per spec.md §3's `KeyInputEvent` ("renderer.key_expire_time") and
/// §4.9 ("optional dependency on key input"), the TTL and state-state mask
/// that decide which events a renderer sees are properties of the renderer,
/// not the intake: each renderer reads the shared log through its own
/// [`IntakeCursor`], [`Renderer::key_state_mask`], and
/// [`Renderer::key_expire_time`], so one renderer's tick cadence never
/// starves another's view of the same keypress.
pub struct InputIntake {
    next_seq: u64,
    queue: VecDeque<ResolvedEvent>,
    retention: Duration,
}

const DEFAULT_RETENTION: Duration = Duration::from_millis(500);

impl InputIntake {
    pub fn new() -> Self {
        InputIntake { next_seq: 0, queue: VecDeque::new(), retention: DEFAULT_RETENTION }
    }

    pub fn coords_of(&self, descriptor: &DeviceDescriptor, keycode: &str) -> Vec<Point> {
        descriptor.coords_of(keycode)
    }

    /// Widens the log's retention window to cover `key_expire_time` if it is
    /// longer than what's currently kept, so a newly added renderer with a
    /// longer TTL than any existing one isn't pruned out from under it.
    /// Called whenever a renderer is added to or removed from the
    /// compositor.
    pub fn ensure_retention(&mut self, key_expire_time: Duration) {
        if key_expire_time > self.retention {
            self.retention = key_expire_time;
        }
    }

    /// Resolves and enqueues a raw OS event into the shared log. Unlike the
    /// old per-mask filtering, every event is kept here regardless of state;
    /// masking is applied per-renderer in [`InputIntake::pop_for`].
    pub fn push(&mut self, descriptor: &DeviceDescriptor, now: Instant, raw: RawKeyEvent) {
        let coords = descriptor.coords_of(&raw.keycode);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back(ResolvedEvent { seq, timestamp: now, raw, coords });
        let retention = self.retention;
        self.queue.retain(|e| now.duration_since(e.timestamp) <= retention);
    }

    /// Returns every event not yet delivered through `cursor` that matches
    /// `mask` and has not expired under `key_expire_time`, advancing
    /// `cursor` past every event considered (matched or not) so this
    /// renderer never re-examines the same event twice (§4.11). With
    /// `key_expire_time == 0` an event carries no `expire_at` and is
    /// effectively consumed by whichever renderer reads it first, per §3's
    /// "consumed on first read" rule.
    pub fn pop_for(&self, cursor: &mut IntakeCursor, mask: KeyStateMask, key_expire_time: Duration, now: Instant) -> Vec<KeyInputEvent> {
        let mut out = Vec::new();
        for event in &self.queue {
            if event.seq <= cursor.0 {
                continue;
            }
            cursor.0 = event.seq;
            if !mask.contains(event.raw.state.mask_bit()) {
                continue;
            }
            let expire_at = if key_expire_time.is_zero() { None } else { Some(event.timestamp + key_expire_time) };
            if expire_at.map(|t| t <= now).unwrap_or(false) {
                continue;
            }
            out.push(KeyInputEvent {
                timestamp: event.timestamp,
                expire_at,
                keycode: event.raw.keycode.clone(),
                scancode: event.raw.scancode,
                keystate: event.raw.state,
                coords: event.coords.clone(),
                payload: HashMap::new(),
            });
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for InputIntake {
    fn default() -> Self {
        InputIntake::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{CapabilityFlag, DeviceKind, FanLimits};
    use crate::protocol::ProfileId;
    use std::collections::{HashMap as Map, HashSet};

    fn descriptor() -> DeviceDescriptor {
        let mut key_map = Map::new();
        key_map.insert("KEY_A".to_string(), vec![(3, 5)]);
        DeviceDescriptor {
            name: "Test".into(),
            kind: DeviceKind::Keyboard,
            vendor_id: 0x1532,
            product_id: 0x0000,
            dimensions: None,
            supported_leds: HashSet::new(),
            supported_effects: HashSet::new(),
            capabilities: [CapabilityFlag::KeyInput].into_iter().collect(),
            key_map,
            protocol_profile: ProfileId::Legacy,
            fan_limits: FanLimits::default(),
        }
    }

    #[test]
    fn expired_event_never_surfaces() {
        let mut intake = InputIntake::new();
        intake.ensure_retention(Duration::from_millis(10));
        let mut cursor = IntakeCursor::default();
        let now = Instant::now();
        intake.push(&descriptor(), now, RawKeyEvent { keycode: "KEY_A".into(), scancode: 30, state: KeyState::Down });
        let later = now + Duration::from_millis(20);
        assert!(intake.pop_for(&mut cursor, KeyStateMask::DOWN, Duration::from_millis(10), later).is_empty());
    }

    #[test]
    fn unmapped_keycode_resolves_to_no_coords() {
        let mut intake = InputIntake::new();
        let mut cursor = IntakeCursor::default();
        let now = Instant::now();
        intake.push(&descriptor(), now, RawKeyEvent { keycode: "KEY_Z".into(), scancode: 44, state: KeyState::Down });
        let events = intake.pop_for(&mut cursor, KeyStateMask::DOWN, Duration::from_secs(1), now);
        assert!(events[0].coords.is_empty());
    }

    #[test]
    fn mapped_keycode_resolves_matrix_point() {
        let mut intake = InputIntake::new();
        let mut cursor = IntakeCursor::default();
        let now = Instant::now();
        intake.push(&descriptor(), now, RawKeyEvent { keycode: "KEY_A".into(), scancode: 30, state: KeyState::Down });
        let events = intake.pop_for(&mut cursor, KeyStateMask::DOWN, Duration::from_secs(1), now);
        assert_eq!(events[0].coords, vec![Point::new(3, 5)]);
    }

    #[test]
    fn state_outside_mask_is_dropped() {
        let mut intake = InputIntake::new();
        let mut cursor = IntakeCursor::default();
        let now = Instant::now();
        intake.push(&descriptor(), now, RawKeyEvent { keycode: "KEY_A".into(), scancode: 30, state: KeyState::Up });
        assert!(intake.pop_for(&mut cursor, KeyStateMask::DOWN, Duration::from_secs(1), now).is_empty());
    }

    #[test]
    fn slow_renderer_does_not_lose_events_a_faster_renderer_already_consumed() {
        // A key event arrives; a slow renderer (long period) hasn't ticked
        // yet when a fast renderer drains it. The slow renderer's own
        // cursor/TTL must still see the event on its own next tick, since
        // the shared log is not destructively drained on first read.
        let mut intake = InputIntake::new();
        intake.ensure_retention(Duration::from_millis(500));
        let now = Instant::now();
        intake.push(&descriptor(), now, RawKeyEvent { keycode: "KEY_A".into(), scancode: 30, state: KeyState::Down });

        let mut fast_cursor = IntakeCursor::default();
        let fast_events = intake.pop_for(&mut fast_cursor, KeyStateMask::DOWN, Duration::from_millis(500), now);
        assert_eq!(fast_events.len(), 1);

        let mut slow_cursor = IntakeCursor::default();
        let later = now + Duration::from_millis(200);
        let slow_events = intake.pop_for(&mut slow_cursor, KeyStateMask::DOWN, Duration::from_millis(500), later);
        assert_eq!(slow_events.len(), 1, "slow renderer's own TTL window still covers the event");
    }

    #[test]
    fn same_renderer_does_not_see_the_same_event_twice() {
        let mut intake = InputIntake::new();
        let mut cursor = IntakeCursor::default();
        let now = Instant::now();
        intake.push(&descriptor(), now, RawKeyEvent { keycode: "KEY_A".into(), scancode: 30, state: KeyState::Down });
        assert_eq!(intake.pop_for(&mut cursor, KeyStateMask::DOWN, Duration::from_secs(1), now).len(), 1);
        assert!(intake.pop_for(&mut cursor, KeyStateMask::DOWN, Duration::from_secs(1), now).is_empty());
    }

    #[test]
    fn fake_key_source_replays_events_in_order() {
        let mut source = FakeKeySource::new(vec![
            RawKeyEvent { keycode: "KEY_A".into(), scancode: 30, state: KeyState::Down },
            RawKeyEvent { keycode: "KEY_A".into(), scancode: 30, state: KeyState::Up },
        ]);
        assert_eq!(source.try_recv().unwrap().state, KeyState::Down);
        assert_eq!(source.try_recv().unwrap().state, KeyState::Up);
        assert!(source.try_recv().is_none());
    }
}
