//! System configuration parameters
//!
//! All tunable parameters for the frequency measurement core and the
//! publish boundary. Defaults match the deployed mains monitor: 40 MHz
//! timer, one window per 200 zero crossings, 49-51 Hz band, bursts of 5.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// Upper bound on [`MeterConfig::burst_capacity`]; bursts are stored inline.
pub const MAX_BURST_CAPACITY: usize = 32;

/// Measurement core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    // --- Input ---
    /// GPIO carrying the signal to measure (rising edges are counted)
    pub pin: i32,
    /// Edges per sampling window
    pub pulses_per_measurement: u32,

    // --- Timer ---
    /// Tick rate of the free-running counter (Hz)
    pub tick_hz: u32,

    // --- Output band ---
    /// Lower clamp for reported frequency (Hz)
    pub min_hz: f32,
    /// Upper clamp for reported frequency (Hz)
    pub max_hz: f32,

    // --- Batching ---
    /// Measurements per published burst
    pub burst_capacity: usize,
    /// Pause between consecutive messages of one burst (milliseconds)
    pub message_spacing_ms: u32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            // Input
            pin: pins::ZCO_PIN,
            pulses_per_measurement: 200,

            // Timer: APB 80 MHz / 2
            tick_hz: 40_000_000,

            // Band
            min_hz: 49.0,
            max_hz: 51.0,

            // Batching
            burst_capacity: 5,
            message_spacing_ms: 1000,
        }
    }
}

impl MeterConfig {
    /// Reject parameters the core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pin < 0 {
            return Err(ConfigError::ValidationFailed("pin must be a valid GPIO number"));
        }
        if self.pulses_per_measurement == 0 {
            return Err(ConfigError::ValidationFailed("pulses_per_measurement must be non-zero"));
        }
        if self.tick_hz == 0 {
            return Err(ConfigError::ValidationFailed("tick_hz must be non-zero"));
        }
        if !self.min_hz.is_finite() || !self.max_hz.is_finite() {
            return Err(ConfigError::ValidationFailed("frequency band must be finite"));
        }
        if self.min_hz < 0.0 || self.min_hz > self.max_hz {
            return Err(ConfigError::ValidationFailed("min_hz must be in 0..=max_hz"));
        }
        if self.burst_capacity == 0 || self.burst_capacity > MAX_BURST_CAPACITY {
            return Err(ConfigError::ValidationFailed("burst_capacity out of range"));
        }
        Ok(())
    }

    /// Parse a JSON override (missing fields take their defaults) and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Nominal window length in milliseconds at the middle of the band.
    pub fn nominal_window_ms(&self) -> u32 {
        let centre = (self.min_hz + self.max_hz) / 2.0;
        if centre <= 0.0 {
            return 0;
        }
        (self.pulses_per_measurement as f32 / centre * 1000.0) as u32
    }
}

/// Broker settings for the MQTT publisher.
///
/// Credentials are baked in at build time from `FMU_MQTT_*` environment
/// variables and are empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub uri: heapless::String<64>,
    pub client_id: heapless::String<32>,
    pub username: heapless::String<32>,
    pub password: heapless::String<32>,
    pub topic: heapless::String<64>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            uri: bounded("mqtt://mqtt3.thingspeak.com:1883"),
            client_id: bounded(option_env!("FMU_MQTT_CLIENT_ID").unwrap_or("")),
            username: bounded(option_env!("FMU_MQTT_USERNAME").unwrap_or("")),
            password: bounded(option_env!("FMU_MQTT_PASSWORD").unwrap_or("")),
            topic: bounded(option_env!("FMU_MQTT_TOPIC").unwrap_or("channels/0/publish")),
        }
    }
}

/// Copy as much of `s` as fits, cutting on a char boundary.
fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
