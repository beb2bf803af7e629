//! End-to-end pipeline tests: edges → deltas → measurements → bursts.

use std::time::Duration;

use fmunode::adapters::gpio::SimEdgeInput;
use fmunode::adapters::time::SimClock;
use fmunode::adapters::timer::SimTimer;
use fmunode::app::ports::StatusProvider;
use fmunode::meter::SAMPLING_DEPTH;
use fmunode::{FrequencyMeter, HealthStatus, PublishError};

use crate::mock_ports::*;

const T0_MS: u64 = 1_700_000_000_000;

fn armed_meter() -> (FrequencyMeter<SimClock>, SignalGen, SimClock) {
    let timer = SimTimer::new();
    let mut input = SimEdgeInput::new();
    let clock = SimClock::at(T0_MS);
    let meter = FrequencyMeter::init(&test_config(), timer.clone(), &mut input, clock.clone())
        .expect("init");
    (meter, SignalGen::new(timer, input.line()), clock)
}

#[test]
fn steady_fifty_hertz_yields_one_full_burst() {
    let (meter, mut sig, _clock) = armed_meter();
    let publisher = RecordingPublisher::new();
    let mut batcher = meter.batcher(FixedStatus("OK"), publisher.clone());
    let (task, rx, stats) = meter.split();
    let mut task = task.expect("task not started");

    sig.windows(5, PULSES, PERIOD_50HZ);
    assert_eq!(task.pending(), 5);

    for _ in 0..5 {
        let m = task.step().expect("valid window");
        assert_eq!(m.frequency_hz, 50.0);
        assert_eq!(m.timestamp_ms, T0_MS);
    }

    let mut handoffs = Vec::new();
    for _ in 0..5 {
        handoffs.extend(batcher.step(&rx));
    }
    assert_eq!(handoffs.len(), 1);
    assert_eq!(handoffs[0].sequence_number, 1);
    assert_eq!(handoffs[0].result, Ok(()));

    let bursts = publisher.bursts();
    assert_eq!(bursts.len(), 1);
    assert_eq!(bursts[0].sequence_number(), 1);
    assert_eq!(bursts[0].device_status(), "OK");
    assert_eq!(bursts[0].len(), 5);
    assert!(bursts[0].iter().all(|m| m.frequency_hz == 50.0 && m.is_valid()));

    let metrics = stats.snapshot();
    assert_eq!(metrics.samples_taken, 5);
    assert_eq!(metrics.samples_dropped, 0);
    assert_eq!(metrics.measurements, 5);
    assert_eq!(metrics.bursts_published, 1);
}

#[test]
fn out_of_band_windows_are_clamped() {
    let (meter, mut sig, _clock) = armed_meter();
    let (task, _rx, _stats) = meter.split();
    let mut task = task.unwrap();

    // 40 Hz then 100 Hz.
    sig.window(PULSES, 25);
    sig.window(PULSES, 10);

    assert_eq!(task.step().unwrap().frequency_hz, 49.0);
    assert_eq!(task.step().unwrap().frequency_hz, 51.0);
}

#[test]
fn slight_deviation_is_reported_unclamped() {
    let (meter, mut sig, _clock) = armed_meter();
    let (task, _rx, _stats) = meter.split();
    let mut task = task.unwrap();

    // 4 cycles over 81 ticks: 4000 / 81 = 49.382... Hz.
    sig.window(PULSES - 1, 20);
    sig.timer.advance(21);
    assert!(sig.line.pulse());

    let f = task.step().unwrap().frequency_hz;
    assert!((f - 4000.0 / 81.0).abs() < 1e-3, "got {f}");
}

#[test]
fn zero_length_window_is_counted_and_skipped() {
    let (meter, mut sig, _clock) = armed_meter();
    let (task, rx, stats) = meter.split();
    let mut task = task.unwrap();

    // Timer never advances: the window spans zero ticks.
    sig.window(PULSES, 0);
    assert!(task.step().is_none());
    assert_eq!(stats.invalid_samples(), 1);
    assert!(!rx.try_measurement().is_valid());
}

#[test]
fn full_sampling_channel_drops_newest_windows() {
    let (meter, mut sig, _clock) = armed_meter();
    let stats = meter.stats();
    let mut status = HealthStatus::new(stats.clone());
    let (task, _rx, _stats) = meter.split();
    let mut task = task.unwrap();

    sig.windows(SAMPLING_DEPTH as u32 + 2, PULSES, PERIOD_50HZ);

    assert_eq!(task.pending(), SAMPLING_DEPTH);
    assert_eq!(stats.samples_dropped(), 2);
    assert_eq!(stats.snapshot().samples_taken, SAMPLING_DEPTH as u32 + 2);
    assert_eq!(status.current_status().as_str(), "WARN 0x1");

    // The queued windows are still intact and in order.
    for _ in 0..SAMPLING_DEPTH {
        assert_eq!(task.step().unwrap().frequency_hz, 50.0);
    }
    assert_eq!(status.current_status().as_str(), "OK 0x0");
}

#[test]
fn measurements_carry_processing_time() {
    let (meter, mut sig, clock) = armed_meter();
    let (task, _rx, _stats) = meter.split();
    let mut task = task.unwrap();

    sig.windows(2, PULSES, PERIOD_50HZ);
    let first = task.step().unwrap();
    clock.advance(4_000);
    let second = task.step().unwrap();
    assert_eq!(second.timestamp_ms - first.timestamp_ms, 4_000);
}

#[test]
fn rejected_burst_is_discarded_and_sequence_advances() {
    let (meter, mut sig, _clock) = armed_meter();
    let stats = meter.stats();
    let mut batcher = meter.batcher(
        HealthStatus::new(stats.clone()),
        RecordingPublisher::rejecting(PublishError::NotConnected),
    );
    let (task, rx, _stats) = meter.split();
    let mut task = task.unwrap();

    let mut handoffs = Vec::new();
    for _ in 0..2 {
        sig.windows(5, PULSES, PERIOD_50HZ);
        for _ in 0..5 {
            task.step().unwrap();
            handoffs.extend(batcher.step(&rx));
        }
    }

    assert_eq!(handoffs.len(), 2);
    assert_eq!(handoffs[0].sequence_number, 1);
    assert_eq!(handoffs[1].sequence_number, 2);
    assert!(handoffs.iter().all(|h| h.result == Err(PublishError::NotConnected)));
    assert_eq!(batcher.pending_len(), 0);
    assert_eq!(stats.snapshot().publish_failures, 2);
}

#[test]
fn spawned_pipeline_publishes_in_background() {
    let (meter, mut sig, _clock) = armed_meter();
    let stats = meter.stats();
    let publisher = RecordingPublisher::new();
    let status = HealthStatus::new(stats.clone());
    let _handles = meter.spawn(status, publisher.clone()).expect("spawn");

    // Pace the signal so the sampling channel never overflows.
    for n in 1..=10u32 {
        sig.window(PULSES, PERIOD_50HZ);
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while stats.snapshot().measurements < n && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    assert!(publisher.wait_for(2, Duration::from_secs(5)), "bursts not published");
    let bursts = publisher.bursts();
    assert_eq!(bursts[0].sequence_number(), 1);
    assert_eq!(bursts[1].sequence_number(), 2);
    assert_eq!(bursts[0].device_status(), "OK 0x0");
    assert!(bursts.iter().all(|b| b.len() == 5));
    assert_eq!(stats.samples_dropped(), 0);
}

#[test]
fn started_task_feeds_direct_consumer() {
    let (mut meter, mut sig, _clock) = armed_meter();
    let _task = meter.start_measurement_task().expect("first start");
    assert!(meter.start_measurement_task().is_none());

    sig.window(PULSES, PERIOD_50HZ);
    let m = meter.next_measurement();
    assert_eq!(m.frequency_hz, 50.0);
    assert!(!meter.try_measurement().is_valid());
}
