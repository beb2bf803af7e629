//! Monotonic tick source.
//!
//! Owns the [`TimerDriver`] once it has been started. After `init` the
//! only operation is [`TickSource::read_from_isr`], which the edge ISR
//! calls; nothing here stops, reloads or re-arms the counter.

use log::info;

use crate::app::ports::TimerDriver;
use crate::error::InitError;

use super::measurement::TickCount;

pub struct TickSource<T> {
    driver: T,
    tick_hz: u32,
}

impl<T: TimerDriver> TickSource<T> {
    /// Configure and start the counter.
    ///
    /// Fails with [`InitError::TimerConfig`] if the driver cannot be set up;
    /// this must happen before any edge handler is armed.
    pub fn init(mut driver: T, tick_hz: u32) -> Result<Self, InitError> {
        driver
            .init()
            .map_err(|e| InitError::TimerConfig(e.code()))?;
        info!("tick_source: counter running at {} Hz", tick_hz);
        Ok(Self { driver, tick_hz })
    }

    /// Current count. Interrupt-safe.
    #[inline]
    pub fn read_from_isr(&self) -> TickCount {
        self.driver.read_count_isr()
    }

    pub fn tick_hz(&self) -> u32 {
        self.tick_hz
    }
}
