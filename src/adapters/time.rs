//! Wall-clock time adapters.
//!
//! - **`target_os = "espidf"`**: [`SystemClock`] reads `gettimeofday()`,
//!   which SNTP keeps in sync once the network is up.
//! - **`not(target_os = "espidf")`**: [`SystemClock`] uses
//!   `std::time::SystemTime`; [`SimClock`] is a hand-set clock for tests.

use crate::app::ports::ClockSource;

/// Wall clock of the running system (milliseconds since the Unix epoch).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "espidf")]
impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid out-pointer; a null timezone is allowed.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        (tv.tv_sec as u64) * 1000 + (tv.tv_usec as u64) / 1000
    }
}

#[cfg(not(target_os = "espidf"))]
impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Wall-clock seconds below which SNTP has clearly not synced yet (2020-01-01).
pub const EPOCH_2020_SECS: u64 = 1_577_836_800;

/// `true` once the clock reads a plausible post-2020 date.
pub fn is_synced(clock: &impl ClockSource) -> bool {
    clock.now_ms() / 1000 >= EPOCH_2020_SECS
}

#[cfg(not(target_os = "espidf"))]
pub use sim::SimClock;

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;
    use core::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Manually driven clock; clones share the same time.
    #[derive(Debug, Clone, Default)]
    pub struct SimClock {
        now: Arc<AtomicU64>,
    }

    impl SimClock {
        pub fn at(ms: u64) -> Self {
            Self {
                now: Arc::new(AtomicU64::new(ms)),
            }
        }

        pub fn set(&self, ms: u64) {
            self.now.store(ms, Ordering::Release);
        }

        pub fn advance(&self, ms: u64) {
            self.now.fetch_add(ms, Ordering::AcqRel);
        }
    }

    impl ClockSource for SimClock {
        fn now_ms(&self) -> u64 {
            self.now.load(Ordering::Acquire)
        }
    }
}
