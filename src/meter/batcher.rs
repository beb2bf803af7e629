//! Burst batcher: groups measurements for the publish boundary.
//!
//! Measurements are appended in arrival order. When `capacity` of them
//! have accumulated the burst is sealed with the next sequence number and
//! the current device status, handed to the [`Publisher`], and a fresh
//! burst is started whether or not publishing succeeded. A burst that
//! never fills is held indefinitely: there is no timeout flush.

use std::sync::Arc;

use log::{info, warn};

use crate::app::ports::{Publisher, StatusProvider};
use crate::config::MAX_BURST_CAPACITY;
use crate::diagnostics::CoreStats;
use crate::error::PublishError;

use super::burst::Burst;
use super::measurement::Measurement;
use super::task::MeasurementReceiver;

/// Result of handing one sealed burst to the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handoff {
    pub sequence_number: u32,
    pub result: Result<(), PublishError>,
}

pub struct BurstBatcher<S, P> {
    capacity: usize,
    pending: heapless::Vec<Measurement, MAX_BURST_CAPACITY>,
    next_sequence: u32,
    status: S,
    publisher: P,
    stats: Arc<CoreStats>,
}

impl<S: StatusProvider, P: Publisher> BurstBatcher<S, P> {
    /// `capacity` is clamped into `1..=MAX_BURST_CAPACITY`.
    pub fn new(capacity: usize, status: S, publisher: P, stats: Arc<CoreStats>) -> Self {
        Self {
            capacity: capacity.clamp(1, MAX_BURST_CAPACITY),
            pending: heapless::Vec::new(),
            next_sequence: 1,
            status,
            publisher,
            stats,
        }
    }

    /// Append one measurement; publishes when the burst fills.
    ///
    /// Sentinels are ignored. Returns the hand-off outcome when this
    /// measurement completed a burst.
    pub fn push(&mut self, m: Measurement) -> Option<Handoff> {
        if !m.is_valid() {
            return None;
        }
        // Cannot fail: the burst is flushed as soon as it reaches capacity.
        let _ = self.pending.push(m);
        if self.pending.len() < self.capacity {
            return None;
        }
        Some(self.flush())
    }

    fn flush(&mut self) -> Handoff {
        let sequence_number = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let measurements = core::mem::take(&mut self.pending);
        let burst = Burst::seal(sequence_number, self.status.current_status(), measurements);
        let count = burst.len();

        let result = self.publisher.publish(burst);
        match result {
            Ok(()) => {
                self.stats.record_published();
                info!("batcher: burst #{} published ({} measurements)", sequence_number, count);
            }
            Err(e) => {
                self.stats.record_publish_failure();
                warn!("batcher: burst #{} publish failed: {}, discarded", sequence_number, e);
            }
        }
        Handoff {
            sequence_number,
            result,
        }
    }

    /// Block for one measurement from `input` and batch it.
    pub fn step(&mut self, input: &MeasurementReceiver) -> Option<Handoff> {
        let m = input.next_measurement();
        self.push(m)
    }

    /// Measurements waiting in the unfinished burst.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sequence number the next sealed burst will carry.
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Task body: runs for the lifetime of the device.
    pub fn run(mut self, input: MeasurementReceiver) -> ! {
        info!("batcher: started (capacity={})", self.capacity);
        loop {
            self.step(&input);
        }
    }
}
