//! Free-running tick timer adapters.
//!
//! - **`target_os = "espidf"`**: [`GpTimer`] over the ESP-IDF
//!   general-purpose timer: count-up, zeroed, no alarm, no reload. The raw
//!   count read is ISR-safe (requires `CONFIG_GPTIMER_CTRL_FUNC_IN_IRAM`
//!   so it stays callable while flash cache is disabled).
//! - **all other targets**: [`SimTimer`], a shared counter advanced by
//!   hand from tests and host simulations.

use crate::app::ports::TimerDriver;
use crate::error::HwError;
use crate::meter::measurement::TickCount;

#[cfg(target_os = "espidf")]
pub use esp::GpTimer;

#[cfg(not(target_os = "espidf"))]
pub use sim::SimTimer;

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use esp_idf_svc::sys::*;
    use log::{info, warn};

    /// ESP-IDF general-purpose timer running at `resolution_hz`.
    pub struct GpTimer {
        resolution_hz: u32,
        handle: gptimer_handle_t,
    }

    // SAFETY: the handle is only mutated in `init`/`drop` (task context);
    // after `init` the ISR only reads the counter through it.
    unsafe impl Send for GpTimer {}

    impl GpTimer {
        /// 40 MHz is the fastest rate the APB clock (80 MHz) can feed.
        pub fn new(resolution_hz: u32) -> Self {
            Self {
                resolution_hz,
                handle: core::ptr::null_mut(),
            }
        }

        fn check(ret: esp_err_t) -> Result<(), HwError> {
            if ret == ESP_OK as i32 { Ok(()) } else { Err(HwError(ret)) }
        }
    }

    impl TimerDriver for GpTimer {
        fn init(&mut self) -> Result<(), HwError> {
            let cfg = gptimer_config_t {
                clk_src: soc_periph_gptimer_clk_src_t_GPTIMER_CLK_SRC_DEFAULT,
                direction: gptimer_count_direction_t_GPTIMER_COUNT_UP,
                resolution_hz: self.resolution_hz,
                ..Default::default()
            };

            // SAFETY: called once from the init path before the edge ISR is
            // armed; `self.handle` is written here and only read afterwards.
            unsafe {
                Self::check(gptimer_new_timer(&cfg, &mut self.handle))?;
                Self::check(gptimer_set_raw_count(self.handle, 0))?;
                Self::check(gptimer_enable(self.handle))?;
                Self::check(gptimer_start(self.handle))?;
            }

            info!("gptimer: running at {} Hz", self.resolution_hz);
            Ok(())
        }

        #[inline]
        fn read_count_isr(&self) -> TickCount {
            let mut count: u64 = 0;
            // SAFETY: handle is valid after `init`; the call is ISR-safe and
            // a failed read leaves `count` at 0, which the task rejects.
            unsafe {
                gptimer_get_raw_count(self.handle, &mut count);
            }
            count
        }
    }

    impl Drop for GpTimer {
        fn drop(&mut self) {
            if self.handle.is_null() {
                return;
            }
            // SAFETY: handle came from gptimer_new_timer; stop/disable
            // errors (e.g. never started) are irrelevant on teardown.
            unsafe {
                gptimer_stop(self.handle);
                gptimer_disable(self.handle);
                if gptimer_del_timer(self.handle) != ESP_OK as i32 {
                    warn!("gptimer: delete failed");
                }
            }
            self.handle = core::ptr::null_mut();
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;
    use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Shared {
        count: AtomicU64,
        running: AtomicBool,
    }

    /// Host stand-in for the hardware counter.
    ///
    /// Clones share the same counter, so a test keeps one handle to
    /// [`advance`](Self::advance) time while the meter owns another.
    #[derive(Debug, Clone, Default)]
    pub struct SimTimer {
        shared: Arc<Shared>,
        fail_init: bool,
    }

    impl SimTimer {
        pub fn new() -> Self {
            Self::default()
        }

        /// A timer whose `init` fails, for exercising init error paths.
        pub fn failing() -> Self {
            Self {
                fail_init: true,
                ..Self::default()
            }
        }

        /// Move the counter forward by `ticks`. Ignored until started.
        pub fn advance(&self, ticks: u64) {
            if self.shared.running.load(Ordering::Acquire) {
                self.shared.count.fetch_add(ticks, Ordering::AcqRel);
            }
        }

        pub fn is_running(&self) -> bool {
            self.shared.running.load(Ordering::Acquire)
        }

        pub fn count(&self) -> TickCount {
            self.shared.count.load(Ordering::Acquire)
        }
    }

    impl TimerDriver for SimTimer {
        fn init(&mut self) -> Result<(), HwError> {
            if self.fail_init {
                return Err(HwError::FAIL);
            }
            self.shared.count.store(0, Ordering::Release);
            self.shared.running.store(true, Ordering::Release);
            Ok(())
        }

        fn read_count_isr(&self) -> TickCount {
            self.count()
        }
    }
}
