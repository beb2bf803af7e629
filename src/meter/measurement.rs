//! Measurement values and the tick-to-frequency conversion.

use serde::{Deserialize, Serialize};

use crate::config::MeterConfig;

/// Cumulative timer ticks since the counter started.
pub type TickCount = u64;

/// Ticks elapsed over one sampling window.
pub type ElapsedTicks = u64;

/// One frequency sample.
///
/// `valid == false` is the sentinel for "no new measurement available";
/// sentinels carry no meaningful frequency or timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Clamped frequency (Hz).
    pub frequency_hz: f32,
    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub valid: bool,
}

impl Measurement {
    pub const SENTINEL: Self = Self {
        frequency_hz: -1.0,
        timestamp_ms: 0,
        valid: false,
    };

    pub const fn new(frequency_hz: f32, timestamp_ms: u64) -> Self {
        Self {
            frequency_hz,
            timestamp_ms,
            valid: true,
        }
    }

    pub const fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Converts window deltas into band-limited frequencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyConverter {
    /// `tick_hz * pulses_per_measurement`: ticks per window at 1 Hz.
    ticks_per_hz: f64,
    min_hz: f64,
    max_hz: f64,
}

impl FrequencyConverter {
    /// `min_hz <= max_hz` is the caller's responsibility (see
    /// [`MeterConfig::validate`]).
    pub fn new(tick_hz: u32, pulses_per_measurement: u32, min_hz: f32, max_hz: f32) -> Self {
        Self {
            ticks_per_hz: f64::from(tick_hz) * f64::from(pulses_per_measurement),
            min_hz: f64::from(min_hz),
            max_hz: f64::from(max_hz),
        }
    }

    pub fn from_config(config: &MeterConfig) -> Self {
        Self::new(
            config.tick_hz,
            config.pulses_per_measurement,
            config.min_hz,
            config.max_hz,
        )
    }

    /// Unclamped frequency, or `None` for a zero-length window.
    pub fn raw_hz(&self, delta: ElapsedTicks) -> Option<f64> {
        if delta == 0 {
            return None;
        }
        Some(self.ticks_per_hz / delta as f64)
    }

    /// Frequency clamped to `[min_hz, max_hz]`, or `None` for a zero delta.
    pub fn convert(&self, delta: ElapsedTicks) -> Option<f32> {
        self.raw_hz(delta)
            .map(|hz| hz.max(self.min_hz).min(self.max_hz) as f32)
    }
}
