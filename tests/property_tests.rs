//! Property and fuzz-style tests for robustness of the measurement core.
//!
//! Runs on host (x86_64) only: proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use std::sync::Arc;

use fmunode::adapters::gpio::SimEdgeInput;
use fmunode::adapters::time::SimClock;
use fmunode::adapters::timer::SimTimer;
use fmunode::app::ports::{Publisher, StatusProvider};
use fmunode::meter::batcher::BurstBatcher;
use fmunode::meter::channel::spsc;
use fmunode::meter::measurement::{FrequencyConverter, Measurement};
use fmunode::meter::SAMPLING_DEPTH;
use fmunode::{Burst, CoreStats, DeviceStatus, FrequencyMeter, MeterConfig, PublishError};
use proptest::prelude::*;

// ── Frequency conversion ──────────────────────────────────────

proptest! {
    /// Any non-zero window converts to `tick_hz * N / delta` clamped into
    /// the band, and never leaves it.
    #[test]
    fn conversion_is_clamped_formula(
        delta in 1u64..=u64::from(u32::MAX) * 4,
        pulses in 1u32..=1000,
    ) {
        let conv = FrequencyConverter::new(40_000_000, pulses, 49.0, 51.0);
        let f = conv.convert(delta).unwrap();
        let raw = 40_000_000.0 * f64::from(pulses) / delta as f64;
        let expected = raw.clamp(49.0, 51.0) as f32;

        prop_assert!((49.0..=51.0).contains(&f));
        prop_assert_eq!(f, expected);
    }

    /// A window that is exactly N nominal cycles long reads back as the
    /// nominal frequency for any in-band nominal.
    #[test]
    fn exact_windows_read_back_nominal(period in 784_314u64..=816_326, pulses in 1u32..=400) {
        let conv = FrequencyConverter::new(40_000_000, pulses, 49.0, 51.0);
        let nominal = 40_000_000.0 / period as f64;
        let f = conv.convert(period * u64::from(pulses)).unwrap();
        prop_assert!((f64::from(f) - nominal).abs() < 1e-3);
    }
}

// ── Channel ordering ──────────────────────────────────────────

proptest! {
    /// Items come out in the order they went in; sends beyond capacity
    /// hand the item back without disturbing what is queued.
    #[test]
    fn channel_is_fifo_and_bounded(items in proptest::collection::vec(any::<u64>(), 0..16)) {
        let (tx, rx) = spsc::<u64, SAMPLING_DEPTH>();
        let mut accepted = Vec::new();
        for &item in &items {
            match tx.try_send(item) {
                Ok(()) => accepted.push(item),
                Err(back) => prop_assert_eq!(back, item),
            }
        }
        prop_assert_eq!(accepted.len(), items.len().min(SAMPLING_DEPTH));

        let mut received = Vec::new();
        while let Some(v) = rx.try_recv() {
            received.push(v);
        }
        prop_assert_eq!(received, accepted);
    }
}

// ── Burst assembly ────────────────────────────────────────────

#[derive(Default)]
struct Collect(Vec<Burst>);

impl Publisher for Collect {
    fn publish(&mut self, burst: Burst) -> Result<(), PublishError> {
        self.0.push(burst);
        Ok(())
    }
}

struct Ok0;

impl StatusProvider for Ok0 {
    fn current_status(&mut self) -> DeviceStatus {
        DeviceStatus::new()
    }
}

fn arb_measurement() -> impl Strategy<Value = Measurement> {
    prop_oneof![
        4 => (49.0f32..=51.0, any::<u64>()).prop_map(|(f, t)| Measurement::new(f, t)),
        1 => Just(Measurement::SENTINEL),
    ]
}

proptest! {
    /// Every published burst is full, sequence numbers are consecutive
    /// from 1, and the bursts hold the valid measurements in arrival order.
    #[test]
    fn bursts_are_complete_and_ordered(
        capacity in 1usize..=32,
        input in proptest::collection::vec(arb_measurement(), 0..200),
    ) {
        let mut batcher =
            BurstBatcher::new(capacity, Ok0, Collect::default(), Arc::new(CoreStats::new()));
        for m in &input {
            batcher.push(*m);
        }

        let valid: Vec<Measurement> = input.iter().copied().filter(Measurement::is_valid).collect();
        let bursts = &batcher.publisher().0;

        prop_assert_eq!(bursts.len(), valid.len() / capacity);
        prop_assert_eq!(batcher.pending_len(), valid.len() % capacity);
        for (i, b) in bursts.iter().enumerate() {
            prop_assert_eq!(b.sequence_number(), i as u32 + 1);
            prop_assert_eq!(b.len(), capacity);
        }
        let flat: Vec<Measurement> = bursts.iter().flat_map(|b| b.iter().copied()).collect();
        prop_assert_eq!(&flat[..], &valid[..flat.len()]);
    }
}

// ── Edge counting ─────────────────────────────────────────────

proptest! {
    /// After the baseline edge, every N-th edge closes a window; windows
    /// beyond the channel depth are counted as dropped.
    #[test]
    fn windows_close_every_n_edges(pulses in 1u32..=20, edges in 0u32..=200) {
        let timer = SimTimer::new();
        let mut input = SimEdgeInput::new();
        let config = MeterConfig {
            pulses_per_measurement: pulses,
            tick_hz: 1_000,
            ..MeterConfig::default()
        };
        let meter = FrequencyMeter::init(&config, timer.clone(), &mut input, SimClock::at(0)).unwrap();
        let line = input.line();

        line.pulse();
        for _ in 0..edges {
            timer.advance(20);
            line.pulse();
        }

        let windows = edges / pulses;
        let metrics = meter.metrics();
        prop_assert_eq!(metrics.samples_taken, windows);
        prop_assert_eq!(metrics.samples_dropped, windows.saturating_sub(SAMPLING_DEPTH as u32));
    }
}
