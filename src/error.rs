//! Unified error types for the FMU node firmware.
//!
//! A small set of `Copy` enums: initialisation failures are fatal and
//! surface to `main()`, everything else is either counted (dropped or
//! invalid samples, see [`CoreStats`](crate::diagnostics::CoreStats)) or
//! reported at the publish boundary and logged.

use core::fmt;

/// `ESP_FAIL`: generic failure code, also used by the host simulation.
pub const ESP_FAIL: i32 = -1;

// ---------------------------------------------------------------------------
// Raw driver errors
// ---------------------------------------------------------------------------

/// Error returned by a hardware port, carrying the raw `esp_err_t` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwError(pub i32);

impl HwError {
    /// Generic failure (`ESP_FAIL`).
    pub const FAIL: Self = Self(ESP_FAIL);

    pub const fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rc={}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Initialisation errors
// ---------------------------------------------------------------------------

/// Fatal errors raised while bringing up the measurement core.
///
/// Returned before any edge handling is armed; nothing stays running when
/// `init` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The free-running tick timer could not be configured or started.
    TimerConfig(i32),
    /// The edge input pin could not be configured.
    PinConfig(i32),
    /// The ISR service or the edge handler could not be installed.
    InterruptInstall(i32),
    /// A measurement parameter was rejected before touching hardware.
    InvalidConfig(ConfigError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimerConfig(rc) => write!(f, "timer configuration failed (rc={})", rc),
            Self::PinConfig(rc) => write!(f, "edge pin configuration failed (rc={})", rc),
            Self::InterruptInstall(rc) => write!(f, "interrupt install failed (rc={})", rc),
            Self::InvalidConfig(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig(e)
    }
}

impl core::error::Error for InitError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; the message names the field.
    ValidationFailed(&'static str),
    /// The serialized config could not be parsed.
    Malformed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Malformed => write!(f, "malformed config"),
        }
    }
}

impl core::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

/// Failure reported by a [`Publisher`](crate::app::ports::Publisher).
///
/// Never fatal: the batcher logs it, counts it and moves on to the next
/// burst. Measurements of a failed burst are not re-queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// The transport has no live connection to its broker.
    NotConnected,
    /// The transport refused a message (raw `esp_err_t`).
    Rejected(i32),
    /// The payload could not be formatted into the transport buffer.
    PayloadTooLarge,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Rejected(rc) => write!(f, "message rejected (rc={})", rc),
            Self::PayloadTooLarge => write!(f, "payload too large"),
        }
    }
}

impl core::error::Error for PublishError {}
