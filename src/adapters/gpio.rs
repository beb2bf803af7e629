//! Edge interrupt adapters.
//!
//! - **`target_os = "espidf"`**: [`GpioEdgeInput`]: input with pull-up,
//!   rising-edge interrupt, per-pin handler through the shared GPIO ISR
//!   service.
//! - **all other targets**: [`SimEdgeInput`]: captures the handler so a
//!   [`SimEdgeLine`] can fire edges from tests.

use crate::app::ports::{EdgeHandler, InterruptSource};
use crate::error::HwError;

#[cfg(target_os = "espidf")]
pub use esp::GpioEdgeInput;

#[cfg(not(target_os = "espidf"))]
pub use sim::{SimEdgeInput, SimEdgeLine};

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use core::ffi::c_void;
    use esp_idf_svc::sys::*;
    use log::info;

    /// Registered handler: pin plus the leaked box passed as ISR argument.
    struct Registration {
        pin: i32,
        arg: *mut EdgeHandler,
    }

    /// GPIO edge interrupts via `gpio_isr_handler_add`.
    ///
    /// Keeps ownership of every registered handler; dropping the adapter
    /// detaches the handlers before freeing them.
    #[derive(Default)]
    pub struct GpioEdgeInput {
        registrations: Vec<Registration>,
        service_installed: bool,
    }

    impl GpioEdgeInput {
        pub fn new() -> Self {
            Self::default()
        }

        fn install_service(&mut self) -> Result<(), HwError> {
            if self.service_installed {
                return Ok(());
            }
            // SAFETY: plain driver call from task context.
            let ret = unsafe { gpio_install_isr_service(0) };
            // ESP_ERR_INVALID_STATE: another component already installed it.
            if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
                return Err(HwError(ret));
            }
            self.service_installed = true;
            info!("gpio: ISR service installed");
            Ok(())
        }
    }

    /// Runs in interrupt context; `arg` is the `*mut EdgeHandler` stored in
    /// a [`Registration`].
    unsafe extern "C" fn edge_trampoline(arg: *mut c_void) {
        // SAFETY: `arg` stays valid until the handler is removed in `Drop`,
        // and the GPIO ISR service never runs one pin's handler re-entrantly.
        let handler = unsafe { &mut *(arg as *mut EdgeHandler) };
        handler();
    }

    impl InterruptSource for GpioEdgeInput {
        fn configure_pin(&mut self, pin: i32) -> Result<(), HwError> {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << pin,
                mode: gpio_mode_t_GPIO_MODE_INPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_POSEDGE,
                ..Default::default()
            };
            // SAFETY: `cfg` is a fully initialised config for a single pin.
            let ret = unsafe { gpio_config(&cfg) };
            if ret != ESP_OK as i32 {
                return Err(HwError(ret));
            }
            info!("gpio: GPIO{} configured (input, pull-up, rising edge)", pin);
            Ok(())
        }

        fn register_handler(&mut self, pin: i32, handler: EdgeHandler) -> Result<(), HwError> {
            self.install_service()?;

            let arg = Box::into_raw(Box::new(handler));
            // SAFETY: `arg` is a valid heap pointer that we keep alive in
            // `registrations` until the handler is removed.
            let ret = unsafe { gpio_isr_handler_add(pin, Some(edge_trampoline), arg.cast()) };
            if ret != ESP_OK as i32 {
                // SAFETY: the ISR service rejected the pointer, so we still
                // own it exclusively.
                drop(unsafe { Box::from_raw(arg) });
                return Err(HwError(ret));
            }

            self.registrations.push(Registration { pin, arg });
            info!("gpio: edge handler added on GPIO{}", pin);
            Ok(())
        }
    }

    impl Drop for GpioEdgeInput {
        fn drop(&mut self) {
            for reg in self.registrations.drain(..) {
                // SAFETY: after removal the ISR can no longer reach `arg`,
                // so reclaiming the box is sound.
                unsafe {
                    gpio_isr_handler_remove(reg.pin);
                    drop(Box::from_raw(reg.arg));
                }
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Slot = Arc<Mutex<Option<EdgeHandler>>>;

    /// Host stand-in for the GPIO interrupt controller (single pin).
    #[derive(Default)]
    pub struct SimEdgeInput {
        slot: Slot,
        configured_pin: Option<i32>,
        fail_configure: bool,
        fail_register: bool,
    }

    impl SimEdgeInput {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `configure_pin` fail with `ESP_FAIL`.
        pub fn fail_configure(mut self) -> Self {
            self.fail_configure = true;
            self
        }

        /// Make `register_handler` fail with `ESP_FAIL`.
        pub fn fail_register(mut self) -> Self {
            self.fail_register = true;
            self
        }

        /// Handle used to inject edges.
        pub fn line(&self) -> SimEdgeLine {
            SimEdgeLine {
                slot: self.slot.clone(),
            }
        }

        pub fn configured_pin(&self) -> Option<i32> {
            self.configured_pin
        }
    }

    impl InterruptSource for SimEdgeInput {
        fn configure_pin(&mut self, pin: i32) -> Result<(), HwError> {
            if self.fail_configure {
                return Err(HwError::FAIL);
            }
            self.configured_pin = Some(pin);
            Ok(())
        }

        fn register_handler(&mut self, _pin: i32, handler: EdgeHandler) -> Result<(), HwError> {
            if self.fail_register {
                return Err(HwError::FAIL);
            }
            *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(handler);
            Ok(())
        }
    }

    /// Cloneable edge injector. The mutex serialises edges the way the
    /// interrupt controller would.
    #[derive(Clone)]
    pub struct SimEdgeLine {
        slot: Slot,
    }

    impl SimEdgeLine {
        /// Fire one rising edge. Returns `false` if no handler is armed.
        pub fn pulse(&self) -> bool {
            let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
            match slot.as_mut() {
                Some(handler) => {
                    handler();
                    true
                }
                None => false,
            }
        }

        pub fn is_armed(&self) -> bool {
            self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn pulse_invokes_registered_handler() {
        let mut input = SimEdgeInput::new();
        let line = input.line();
        assert!(!line.pulse());

        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        input.configure_pin(4).unwrap();
        input
            .register_handler(4, Box::new(move || {
                h.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();

        assert!(line.is_armed());
        for _ in 0..3 {
            assert!(line.pulse());
        }
        assert_eq!(hits.load(Ordering::Relaxed), 3);
        assert_eq!(input.configured_pin(), Some(4));
    }

    #[test]
    fn failure_switches() {
        assert_eq!(SimEdgeInput::new().fail_configure().configure_pin(4), Err(HwError::FAIL));
        let mut input = SimEdgeInput::new().fail_register();
        assert_eq!(input.register_handler(4, Box::new(|| {})), Err(HwError::FAIL));
        assert!(!input.line().is_armed());
    }
}
