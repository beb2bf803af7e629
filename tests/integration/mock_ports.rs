//! Mock ports and signal helpers for integration tests.
//!
//! The meter itself runs on the host adapters (`SimTimer`, `SimEdgeInput`,
//! `SimClock`); this file adds a recording publisher, a fixed status
//! provider and a helper that drives a square wave into the edge line.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fmunode::adapters::gpio::SimEdgeLine;
use fmunode::adapters::timer::SimTimer;
use fmunode::app::ports::{Publisher, StatusProvider};
use fmunode::{Burst, DeviceStatus, MeterConfig, PublishError};

/// Tick rate used by the tests: one tick per millisecond.
pub const TICK_HZ: u32 = 1_000;

/// Edges per window used by the tests.
pub const PULSES: u32 = 4;

/// Ticks per mains cycle at 50 Hz with [`TICK_HZ`].
pub const PERIOD_50HZ: u64 = 20;

/// Small, fast configuration with the default 49-51 Hz band.
pub fn test_config() -> MeterConfig {
    MeterConfig {
        pulses_per_measurement: PULSES,
        tick_hz: TICK_HZ,
        ..MeterConfig::default()
    }
}

// ── Publisher ─────────────────────────────────────────────────

/// Records every burst; clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    bursts: Arc<Mutex<Vec<Burst>>>,
    reject: Option<PublishError>,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publisher that refuses every burst with `err`.
    pub fn rejecting(err: PublishError) -> Self {
        Self {
            reject: Some(err),
            ..Self::default()
        }
    }

    pub fn bursts(&self) -> Vec<Burst> {
        self.bursts.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.bursts.lock().unwrap().len()
    }

    /// Poll until `n` bursts have been recorded or `timeout` expires.
    pub fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.count() >= n {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        self.count() >= n
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, burst: Burst) -> Result<(), PublishError> {
        if let Some(err) = self.reject {
            return Err(err);
        }
        self.bursts.lock().unwrap().push(burst);
        Ok(())
    }
}

// ── Status provider ───────────────────────────────────────────

pub struct FixedStatus(pub &'static str);

impl StatusProvider for FixedStatus {
    fn current_status(&mut self) -> DeviceStatus {
        let mut s = DeviceStatus::new();
        s.push_str(self.0).unwrap();
        s
    }
}

// ── Signal generator ──────────────────────────────────────────

/// Drives edges into the meter while advancing its timer.
pub struct SignalGen {
    pub timer: SimTimer,
    pub line: SimEdgeLine,
    baseline_sent: bool,
}

impl SignalGen {
    pub fn new(timer: SimTimer, line: SimEdgeLine) -> Self {
        Self {
            timer,
            line,
            baseline_sent: false,
        }
    }

    /// Emit one full window of `pulses` cycles of `period` ticks each.
    /// The very first call also emits the baseline edge.
    pub fn window(&mut self, pulses: u32, period: u64) {
        if !self.baseline_sent {
            assert!(self.line.pulse(), "edge handler not armed");
            self.baseline_sent = true;
        }
        for _ in 0..pulses {
            self.timer.advance(period);
            assert!(self.line.pulse(), "edge handler not armed");
        }
    }

    pub fn windows(&mut self, n: u32, pulses: u32, period: u64) {
        for _ in 0..n {
            self.window(pulses, period);
        }
    }
}
