//! Port traits: the hexagonal boundary between the measurement core and
//! the outside world.
//!
//! ```text
//!   TimerDriver ─────┐                         ┌──▶ Publisher
//!   InterruptSource ─┼──▶ measurement core ────┤
//!   ClockSource ─────┘                         └──◀ StatusProvider
//! ```
//!
//! Driven adapters (ESP-IDF peripherals, MQTT, host simulation) implement
//! these traits. The core consumes them via generics, so it never touches
//! hardware directly and runs unchanged against mocks on the host.

use crate::error::{HwError, PublishError};
use crate::meter::burst::{Burst, DeviceStatus};
use crate::meter::measurement::TickCount;

/// Callback invoked once per qualifying edge, in interrupt context.
pub type EdgeHandler = Box<dyn FnMut() + Send + 'static>;

// ───────────────────────────────────────────────────────────────
// Timer port
// ───────────────────────────────────────────────────────────────

/// Free-running hardware counter.
pub trait TimerDriver {
    /// Configure the counter at its tick rate, zero it and start it.
    /// Called once; the counter is never halted or re-armed afterwards.
    fn init(&mut self) -> Result<(), HwError>;

    /// Current count. Must be safe from interrupt context: no blocking,
    /// no logging, no allocation.
    fn read_count_isr(&self) -> TickCount;
}

// ───────────────────────────────────────────────────────────────
// Interrupt port
// ───────────────────────────────────────────────────────────────

/// Edge-triggered GPIO interrupt source.
pub trait InterruptSource {
    /// Configure `pin` as a rising-edge interrupt input.
    fn configure_pin(&mut self, pin: i32) -> Result<(), HwError>;

    /// Install `handler` for `pin`. The source owns the handler for as
    /// long as the interrupt stays armed.
    fn register_handler(&mut self, pin: i32, handler: EdgeHandler) -> Result<(), HwError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock time source, queried at measurement capture time.
pub trait ClockSource {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Status port
// ───────────────────────────────────────────────────────────────

/// Supplies the free-form health string attached to each burst.
pub trait StatusProvider {
    fn current_status(&mut self) -> DeviceStatus;
}

// ───────────────────────────────────────────────────────────────
// Publish port
// ───────────────────────────────────────────────────────────────

/// Receives completed bursts.
///
/// Synchronous; implementations may retry or pace internally. The core
/// treats an error as non-fatal, logs it and starts the next burst.
pub trait Publisher {
    fn publish(&mut self, burst: Burst) -> Result<(), PublishError>;
}

impl<T: ClockSource + ?Sized> ClockSource for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

impl<T: Publisher + ?Sized> Publisher for Box<T> {
    fn publish(&mut self, burst: Burst) -> Result<(), PublishError> {
        (**self).publish(burst)
    }
}
