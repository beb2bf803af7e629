//! Runtime counters and device health reporting.
//!
//! [`CoreStats`] is shared (via `Arc`) between the edge ISR, the
//! measurement task and the burst batcher. Every field is an `AtomicU32`
//! so the ISR can bump it without locking; `u32` because the Xtensa cores
//! have no native 64-bit atomics.
//!
//! [`HealthStatus`] turns the counters into the short status string that
//! rides along with every published burst.

use core::fmt::Write as _;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::app::ports::StatusProvider;
use crate::meter::burst::DeviceStatus;

/// Counters maintained by the measurement pipeline.
#[derive(Debug, Default)]
pub struct CoreStats {
    samples_taken: AtomicU32,
    samples_dropped: AtomicU32,
    invalid_samples: AtomicU32,
    measurements: AtomicU32,
    bursts_published: AtomicU32,
    publish_failures: AtomicU32,
}

impl CoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    // ── ISR side ──────────────────────────────────────────────

    /// A window closed and its delta was offered to the sampling channel.
    #[inline]
    pub fn record_sample(&self) {
        self.samples_taken.fetch_add(1, Ordering::Relaxed);
    }

    /// The sampling channel was full; the window's delta was discarded.
    #[inline]
    pub fn record_drop(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // ── Task side ─────────────────────────────────────────────

    pub fn record_invalid(&self) {
        self.invalid_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_measurement(&self) {
        self.measurements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.bursts_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn samples_dropped(&self) -> u32 {
        self.samples_dropped.load(Ordering::Relaxed)
    }

    pub fn invalid_samples(&self) -> u32 {
        self.invalid_samples.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MeterMetrics {
        MeterMetrics {
            samples_taken: self.samples_taken.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            invalid_samples: self.invalid_samples.load(Ordering::Relaxed),
            measurements: self.measurements.load(Ordering::Relaxed),
            bursts_published: self.bursts_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CoreStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterMetrics {
    pub samples_taken: u32,
    pub samples_dropped: u32,
    pub invalid_samples: u32,
    pub measurements: u32,
    pub bursts_published: u32,
    pub publish_failures: u32,
}

// ───────────────────────────────────────────────────────────────
// Health status
// ───────────────────────────────────────────────────────────────

/// Status flag bits reported in the burst status string.
pub mod flags {
    /// Windows were dropped since the previous burst.
    pub const SAMPLES_DROPPED: u8 = 0b0000_0001;
    /// Zero-length windows were discarded since the previous burst.
    pub const INVALID_SAMPLES: u8 = 0b0000_0010;
    /// The previous burst failed to publish.
    pub const PUBLISH_FAILED: u8 = 0b0000_0100;
}

/// [`StatusProvider`] that reports what went wrong since the last burst.
///
/// `"OK 0x0"` when nothing did, otherwise `"WARN 0x<flags>"` with bits
/// from [`flags`].
pub struct HealthStatus {
    stats: Arc<CoreStats>,
    last: MeterMetrics,
}

impl HealthStatus {
    pub fn new(stats: Arc<CoreStats>) -> Self {
        let last = stats.snapshot();
        Self { stats, last }
    }

    fn fault_flags(&self, now: &MeterMetrics) -> u8 {
        let mut bits = 0;
        if now.samples_dropped > self.last.samples_dropped {
            bits |= flags::SAMPLES_DROPPED;
        }
        if now.invalid_samples > self.last.invalid_samples {
            bits |= flags::INVALID_SAMPLES;
        }
        if now.publish_failures > self.last.publish_failures {
            bits |= flags::PUBLISH_FAILED;
        }
        bits
    }
}

impl StatusProvider for HealthStatus {
    fn current_status(&mut self) -> DeviceStatus {
        let now = self.stats.snapshot();
        let bits = self.fault_flags(&now);
        self.last = now;

        let mut status = DeviceStatus::new();
        let label = if bits == 0 { "OK" } else { "WARN" };
        // Longest output is "WARN 0x7", well inside the buffer.
        let _ = write!(status, "{} 0x{:X}", label, bits);
        status
    }
}
