//! Open/close a feature-report endpoint; send one report, read one report;
//! enforce the profile's inter-command delay (§4.4).
//!
//! `HidTransport` never retries — every failure (I/O error, short read, read
//! timeout) is surfaced to the caller, which is [`crate::device::DeviceDriver`]
//! and owns the retry/busy/timeout state machine (§4.5).

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::protocol::REPORT_LEN;

/// Read timeout for a single feature report (§5).
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

pub trait HidTransport: Send + Sync {
    fn send_feature(&self, report: &[u8; REPORT_LEN]) -> CoreResult<()>;
    fn read_feature(&self) -> CoreResult<[u8; REPORT_LEN]>;

    /// The minimum gap that must elapse between the end of one command and
    /// the start of the next, per the device's active profile.
    fn inter_command_delay(&self) -> Duration;

    /// Acquires exclusive access around a single logical operation so two
    /// concurrent commands cannot interleave on the same HID device, and
    /// enforces `inter_command_delay` before the closure runs. Implemented
    /// here rather than left to callers so every transport, fake or real,
    /// gets the same ordering guarantee (§4.4, §5).
    fn with_device<R>(&self, f: impl FnOnce() -> CoreResult<R>) -> CoreResult<R>;
}

struct Pacing {
    last_op_end: Option<Instant>,
}

/// Real transport backed by `hidapi`. One instance per physical device;
/// `last_op` is measured from end-of-write/end-of-read consistently, per
/// §4.4's "implementation may measure from either end, but must be
/// consistent."
pub struct HidApiTransport {
    device: hidapi::HidDevice,
    delay: Duration,
    pacing: Mutex<Pacing>,
    op_lock: Mutex<()>,
}

impl HidApiTransport {
    pub fn open(api: &hidapi::HidApi, vendor_id: u16, product_id: u16, delay: Duration) -> CoreResult<Self> {
        let device = api.open(vendor_id, product_id)?;
        Ok(HidApiTransport {
            device,
            delay,
            pacing: Mutex::new(Pacing { last_op_end: None }),
            op_lock: Mutex::new(()),
        })
    }

    fn wait_for_pacing(&self) {
        let deadline = {
            let pacing = self.pacing.lock();
            pacing.last_op_end.map(|t| t + self.delay)
        };
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }
    }

    fn mark_op_end(&self) {
        self.pacing.lock().last_op_end = Some(Instant::now());
    }
}

impl HidTransport for HidApiTransport {
    fn send_feature(&self, report: &[u8; REPORT_LEN]) -> CoreResult<()> {
        self.wait_for_pacing();
        self.device.send_feature_report(report)?;
        self.mark_op_end();
        Ok(())
    }

    fn read_feature(&self) -> CoreResult<[u8; REPORT_LEN]> {
        self.wait_for_pacing();
        let mut buf = [0u8; REPORT_LEN];
        let n = self.device.get_feature_report(&mut buf)?;
        self.mark_op_end();
        if n < REPORT_LEN {
            return Err(CoreError::Io(format!("short read: {n} of {REPORT_LEN} bytes")));
        }
        Ok(buf)
    }

    fn inter_command_delay(&self) -> Duration {
        self.delay
    }

    fn with_device<R>(&self, f: impl FnOnce() -> CoreResult<R>) -> CoreResult<R> {
        let _guard = self.op_lock.lock();
        f()
    }
}

/// An in-memory transport for unit tests: queues canned responses and
/// records every sent request, without touching real hardware.
pub struct FakeTransport {
    delay: Duration,
    sent: Mutex<Vec<[u8; REPORT_LEN]>>,
    responses: Mutex<Vec<CoreResult<[u8; REPORT_LEN]>>>,
    op_lock: Mutex<()>,
}

impl FakeTransport {
    pub fn new(delay: Duration) -> Self {
        FakeTransport {
            delay,
            sent: Mutex::new(Vec::new()),
            responses: Mutex::new(Vec::new()),
            op_lock: Mutex::new(()),
        }
    }

    pub fn push_response(&self, resp: CoreResult<[u8; REPORT_LEN]>) {
        self.responses.lock().push(resp);
    }

    pub fn sent(&self) -> Vec<[u8; REPORT_LEN]> {
        self.sent.lock().clone()
    }
}

impl HidTransport for FakeTransport {
    fn send_feature(&self, report: &[u8; REPORT_LEN]) -> CoreResult<()> {
        self.sent.lock().push(*report);
        Ok(())
    }

    fn read_feature(&self) -> CoreResult<[u8; REPORT_LEN]> {
        let mut responses = self.responses.lock();
        if responses.is_empty() {
            return Err(CoreError::Timeout);
        }
        responses.remove(0)
    }

    fn inter_command_delay(&self) -> Duration {
        self.delay
    }

    fn with_device<R>(&self, f: impl FnOnce() -> CoreResult<R>) -> CoreResult<R> {
        let _guard = self.op_lock.lock();
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_transport_records_sent_reports() {
        let t = FakeTransport::new(Duration::from_millis(0));
        let report = [0u8; REPORT_LEN];
        t.send_feature(&report).unwrap();
        assert_eq!(t.sent().len(), 1);
    }

    #[test]
    fn fake_transport_read_without_queued_response_times_out() {
        let t = FakeTransport::new(Duration::from_millis(0));
        assert!(matches!(t.read_feature(), Err(CoreError::Timeout)));
    }

    #[test]
    fn with_device_runs_closure_and_returns_its_value() {
        let t = FakeTransport::new(Duration::from_millis(0));
        let v = t.with_device(|| Ok(42)).unwrap();
        assert_eq!(v, 42);
    }
}
