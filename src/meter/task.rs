//! Measurement task: turns window deltas into timestamped frequencies.
//!
//! ```text
//!  sampling channel ──▶ MeasurementTask ──▶ output channel
//!    (ElapsedTicks)     convert · clamp       (Measurement)
//!                       timestamp
//! ```
//!
//! The task parks on the sampling channel and wakes once per delta; it
//! never polls. The timestamp is taken when the delta is processed, not
//! when the window closed in the ISR.

use std::sync::Arc;

use log::debug;

use crate::app::ports::ClockSource;
use crate::diagnostics::CoreStats;

use super::channel::{Consumer, Producer};
use super::measurement::{ElapsedTicks, FrequencyConverter, Measurement};
use super::{OUTPUT_DEPTH, SAMPLING_DEPTH};

pub struct MeasurementTask<C> {
    samples: Consumer<ElapsedTicks, SAMPLING_DEPTH>,
    output: Producer<Measurement, OUTPUT_DEPTH>,
    converter: FrequencyConverter,
    clock: C,
    stats: Arc<CoreStats>,
}

impl<C: ClockSource> MeasurementTask<C> {
    pub fn new(
        samples: Consumer<ElapsedTicks, SAMPLING_DEPTH>,
        output: Producer<Measurement, OUTPUT_DEPTH>,
        converter: FrequencyConverter,
        clock: C,
        stats: Arc<CoreStats>,
    ) -> Self {
        Self {
            samples,
            output,
            converter,
            clock,
            stats,
        }
    }

    /// Convert one delta. `None` for a zero-length window, which is
    /// counted and otherwise ignored.
    pub fn process(&self, delta: ElapsedTicks) -> Option<Measurement> {
        let Some(frequency_hz) = self.converter.convert(delta) else {
            self.stats.record_invalid();
            debug!("measurement: zero-length window skipped");
            return None;
        };
        let m = Measurement::new(frequency_hz, self.clock.now_ms());
        debug!("measurement: {:.3} Hz @ {} ms (delta={})", m.frequency_hz, m.timestamp_ms, delta);
        Some(m)
    }

    /// Wait for the next delta and forward its measurement, parking while
    /// the output channel is full. Returns what was forwarded.
    pub fn step(&mut self) -> Option<Measurement> {
        let delta = self.samples.recv();
        let m = self.process(delta)?;
        self.output.send(m);
        self.stats.record_measurement();
        Some(m)
    }

    /// Deltas waiting to be processed.
    pub fn pending(&self) -> usize {
        self.samples.len()
    }

    /// Task body: runs for the lifetime of the device.
    pub fn run(mut self) -> ! {
        loop {
            self.step();
        }
    }
}

/// Consumer side of the output channel.
pub struct MeasurementReceiver {
    inner: Consumer<Measurement, OUTPUT_DEPTH>,
}

impl MeasurementReceiver {
    pub(crate) fn new(inner: Consumer<Measurement, OUTPUT_DEPTH>) -> Self {
        Self { inner }
    }

    /// Block until the next measurement is available.
    pub fn next_measurement(&self) -> Measurement {
        self.inner.recv()
    }

    /// The next measurement, or [`Measurement::SENTINEL`] if none is queued.
    pub fn try_measurement(&self) -> Measurement {
        self.inner.try_recv().unwrap_or(Measurement::SENTINEL)
    }

    pub fn pending(&self) -> usize {
        self.inner.len()
    }
}
