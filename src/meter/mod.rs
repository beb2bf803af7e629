//! Frequency measurement core.
//!
//! ```text
//!  GPIO edge ──▶ EdgeCounter (ISR) ──▶ sampling ──▶ MeasurementTask ──▶ output ──▶ BurstBatcher ──▶ Publisher
//!                    │                 channel          │              channel
//!                    ▼                                  ▼
//!               TickSource                         ClockSource
//! ```
//!
//! [`FrequencyMeter::init`] wires the stages together and arms the edge
//! interrupt. From then on the ISR feeds the sampling channel; the
//! measurement task and the batcher each run on their own thread (see
//! [`FrequencyMeter::spawn`]), or a caller can pull measurements directly
//! with [`FrequencyMeter::next_measurement`].

pub mod batcher;
pub mod burst;
pub mod channel;
pub mod edge_counter;
pub mod measurement;
pub mod task;
pub mod tick_source;

use std::sync::Arc;
use std::thread::JoinHandle;

use log::info;

use crate::app::ports::{ClockSource, InterruptSource, Publisher, StatusProvider, TimerDriver};
use crate::config::MeterConfig;
use crate::diagnostics::{CoreStats, MeterMetrics};
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::error::InitError;

use batcher::BurstBatcher;
use edge_counter::EdgeCounter;
use measurement::{FrequencyConverter, Measurement};
use task::{MeasurementReceiver, MeasurementTask};
use tick_source::TickSource;

/// Depth of the ISR → task channel (deltas in flight).
pub const SAMPLING_DEPTH: usize = 5;

/// Depth of the task → consumer channel (measurements in flight).
pub const OUTPUT_DEPTH: usize = 5;

/// Measurement task: highest application priority, away from the Wi-Fi core.
const MEASUREMENT_PRIORITY: u8 = 22;
const MEASUREMENT_STACK_KB: usize = 4;

/// Batcher publishes over the network; it shares the protocol core.
const BATCHER_PRIORITY: u8 = 10;
const BATCHER_STACK_KB: usize = 8;

/// The initialised measurement pipeline.
pub struct FrequencyMeter<C> {
    config: MeterConfig,
    task: Option<MeasurementTask<C>>,
    output: MeasurementReceiver,
    stats: Arc<CoreStats>,
}

/// Join handles for the spawned pipeline threads.
pub struct MeterHandles {
    pub measurement: JoinHandle<()>,
    pub batcher: JoinHandle<()>,
}

impl<C: ClockSource> FrequencyMeter<C> {
    /// Start the tick source, configure the edge pin and arm the ISR.
    ///
    /// Order matters: the timer must be running before any edge can be
    /// handled. On error nothing is left armed (the edge counter, and with
    /// it the timer, is dropped).
    pub fn init<T, I>(
        config: &MeterConfig,
        timer: T,
        interrupts: &mut I,
        clock: C,
    ) -> Result<Self, InitError>
    where
        T: TimerDriver + Send + 'static,
        I: InterruptSource,
    {
        config.validate()?;

        let ticks = TickSource::init(timer, config.tick_hz)?;

        interrupts
            .configure_pin(config.pin)
            .map_err(|e| InitError::PinConfig(e.code()))?;

        let stats = Arc::new(CoreStats::new());
        let (sample_tx, sample_rx) = channel::spsc();
        let (output_tx, output_rx) = channel::spsc();

        let mut counter =
            EdgeCounter::new(ticks, config.pulses_per_measurement, sample_tx, stats.clone());
        interrupts
            .register_handler(config.pin, Box::new(move || counter.on_edge()))
            .map_err(|e| InitError::InterruptInstall(e.code()))?;

        let task = MeasurementTask::new(
            sample_rx,
            output_tx,
            FrequencyConverter::from_config(config),
            clock,
            stats.clone(),
        );

        info!(
            "meter: armed on GPIO{} ({} pulses/window, {} Hz ticks, band {:.1}-{:.1} Hz, burst {})",
            config.pin,
            config.pulses_per_measurement,
            config.tick_hz,
            config.min_hz,
            config.max_hz,
            config.burst_capacity
        );

        Ok(Self {
            config: config.clone(),
            task: Some(task),
            output: MeasurementReceiver::new(output_rx),
            stats,
        })
    }

    /// Block until the next measurement. The measurement task must be
    /// running ([`start_measurement_task`](Self::start_measurement_task)).
    pub fn next_measurement(&self) -> Measurement {
        self.output.next_measurement()
    }

    /// Next queued measurement, or the sentinel when none is available.
    pub fn try_measurement(&self) -> Measurement {
        self.output.try_measurement()
    }

    pub fn stats(&self) -> Arc<CoreStats> {
        self.stats.clone()
    }

    pub fn metrics(&self) -> MeterMetrics {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Take the stages out for callers that drive them themselves.
    ///
    /// Returns `None` for the task if it has already been started.
    pub fn split(self) -> (Option<MeasurementTask<C>>, MeasurementReceiver, Arc<CoreStats>) {
        (self.task, self.output, self.stats)
    }

    /// Build a batcher over this meter's counters.
    pub fn batcher<S, P>(&self, status: S, publisher: P) -> BurstBatcher<S, P>
    where
        S: StatusProvider,
        P: Publisher,
    {
        BurstBatcher::new(self.config.burst_capacity, status, publisher, self.stats.clone())
    }
}

impl<C: ClockSource + Send + 'static> FrequencyMeter<C> {
    /// Run the measurement task on its own thread so
    /// [`next_measurement`](Self::next_measurement) can be used directly.
    /// Returns `None` if it is already running.
    pub fn start_measurement_task(&mut self) -> Option<JoinHandle<()>> {
        let task = self.task.take()?;
        Some(spawn_on_core(
            Core::App,
            MEASUREMENT_PRIORITY,
            MEASUREMENT_STACK_KB,
            "f_measure\0",
            move || task.run(),
        ))
    }

    /// Start the full pipeline: measurement task plus burst batcher.
    ///
    /// Returns `None` if the measurement task was already started
    /// separately (its output is then owned by the direct consumer).
    pub fn spawn<S, P>(mut self, status: S, publisher: P) -> Option<MeterHandles>
    where
        S: StatusProvider + Send + 'static,
        P: Publisher + Send + 'static,
    {
        let batcher = self.batcher(status, publisher);
        let measurement = self.start_measurement_task()?;
        let output = self.output;
        let batcher = spawn_on_core(
            Core::Pro,
            BATCHER_PRIORITY,
            BATCHER_STACK_KB,
            "batcher\0",
            move || batcher.run(output),
        );
        Some(MeterHandles {
            measurement,
            batcher,
        })
    }
}
