//! Edge counter: the interrupt-context half of the pipeline.
//!
//! An [`EdgeCounter`] is created once at init and moved into the GPIO
//! interrupt registration, so all ISR state lives in this one struct.
//!
//! On every qualifying edge:
//!
//! 1. The very first edge reads the tick source as the baseline and opens
//!    the first window.
//! 2. Every later edge increments `edges_seen`; each time it reaches a
//!    multiple of `pulses_per_measurement` the window closes: the tick
//!    source is sampled, the delta since the previous sample is offered to
//!    the sampling channel, and the sample becomes the next baseline.
//!
//! Every window therefore spans exactly `pulses_per_measurement` edge
//! periods. A full channel drops the new delta (queued deltas are kept)
//! and bumps the drop counter. Nothing here blocks, logs or allocates.

use std::sync::Arc;

use crate::app::ports::TimerDriver;
use crate::diagnostics::CoreStats;

use super::channel::Producer;
use super::measurement::{ElapsedTicks, TickCount};
use super::tick_source::TickSource;
use super::SAMPLING_DEPTH;

pub struct EdgeCounter<T> {
    ticks: TickSource<T>,
    pulses_per_measurement: u64,
    edges_seen: u64,
    last_sample_tick: Option<TickCount>,
    samples: Producer<ElapsedTicks, SAMPLING_DEPTH>,
    stats: Arc<CoreStats>,
}

impl<T: TimerDriver> EdgeCounter<T> {
    pub fn new(
        ticks: TickSource<T>,
        pulses_per_measurement: u32,
        samples: Producer<ElapsedTicks, SAMPLING_DEPTH>,
        stats: Arc<CoreStats>,
    ) -> Self {
        Self {
            ticks,
            pulses_per_measurement: u64::from(pulses_per_measurement.max(1)),
            edges_seen: 0,
            last_sample_tick: None,
            samples,
            stats,
        }
    }

    /// Handle one qualifying edge. Interrupt context.
    #[inline]
    pub fn on_edge(&mut self) {
        let Some(last) = self.last_sample_tick else {
            self.last_sample_tick = Some(self.ticks.read_from_isr());
            return;
        };

        self.edges_seen = self.edges_seen.wrapping_add(1);
        if self.edges_seen % self.pulses_per_measurement != 0 {
            return;
        }

        let now = self.ticks.read_from_isr();
        let delta = now.wrapping_sub(last);
        self.last_sample_tick = Some(now);

        self.stats.record_sample();
        if self.samples.try_send(delta).is_err() {
            self.stats.record_drop();
        }
    }

    /// Edges counted since the baseline edge.
    pub fn edges_seen(&self) -> u64 {
        self.edges_seen
    }

    pub fn last_sample_tick(&self) -> Option<TickCount> {
        self.last_sample_tick
    }
}
