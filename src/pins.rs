//! GPIO pin assignments for the FMU node board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

/// Zero-crossing detector output (rising edge = one mains cycle).
pub const ZCO_PIN: i32 = 4;

/// Self-test output: drives a simulated zero-crossing signal.
/// Jumper to [`ZCO_PIN`] for bench testing without mains.
pub const TEST_PIN: i32 = 12;
