//! Zero-crossing output simulator for bench self-test.
//!
//! Drives a square wave on an output pin (jumpered to the ZCO input) so the
//! whole pipeline can be exercised without mains. Each window is
//! `2 * pulses - 2` toggles at the nominal half-period followed by two
//! toggles whose half-period is 0, 1 or 2 times nominal, chosen
//! pseudo-randomly. The last cycle of every window is therefore shortened,
//! kept or stretched, which moves the measured frequency around 50 Hz.
//!
//! Generic over `embedded-hal` traits: the firmware uses an ESP-IDF
//! `PinDriver` with `FreeRtos` delay, tests use recording mocks.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Half-period of a 50 Hz square wave.
pub const DEFAULT_HALF_PERIOD_MS: u32 = 10;

/// Jitter steps recorded per [`ZcoSimulator::run`] call.
pub const JITTER_LOG_LEN: usize = 64;

pub struct ZcoSimulator<P, D> {
    pin: P,
    delay: D,
    half_period_ms: u32,
    pulses_per_measurement: u32,
    level: bool,
    rng: XorShift32,
}

impl<P: OutputPin, D: DelayNs> ZcoSimulator<P, D> {
    pub fn new(pin: P, delay: D, pulses_per_measurement: u32, seed: u32) -> Self {
        Self {
            pin,
            delay,
            half_period_ms: DEFAULT_HALF_PERIOD_MS,
            pulses_per_measurement: pulses_per_measurement.max(1),
            level: false,
            rng: XorShift32::new(seed),
        }
    }

    pub fn with_half_period_ms(mut self, half_period_ms: u32) -> Self {
        self.half_period_ms = half_period_ms;
        self
    }

    /// Generate `windows` measurement windows. Returns the jitter multiplier
    /// (0, 1 or 2) applied to the last cycle of each window; only the first
    /// [`JITTER_LOG_LEN`] windows are recorded, later ones are still generated.
    pub fn run(&mut self, windows: u32) -> Result<heapless::Vec<u8, JITTER_LOG_LEN>, P::Error> {
        let mut jitter_log = heapless::Vec::new();
        let steady_toggles = self.pulses_per_measurement * 2 - 2;

        for _ in 0..windows {
            for _ in 0..steady_toggles {
                self.toggle()?;
                self.delay.delay_ms(self.half_period_ms);
            }

            let k = (self.rng.next() % 3) as u8;
            // Full log: keep generating, stop recording.
            let _ = jitter_log.push(k);
            for _ in 0..2 {
                self.toggle()?;
                self.delay.delay_ms(self.half_period_ms * u32::from(k));
            }
        }
        Ok(jitter_log)
    }

    fn toggle(&mut self) -> Result<(), P::Error> {
        self.level = !self.level;
        if self.level {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

/// Marsaglia xorshift; plenty for picking a jitter step.
#[derive(Debug, Clone, Copy)]
struct XorShift32(u32);

impl XorShift32 {
    fn new(seed: u32) -> Self {
        // Zero is a fixed point.
        Self(if seed == 0 { 0x9E37_79B9 } else { seed })
    }

    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }
}
