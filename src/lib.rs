//! FMU node firmware library.
//!
//! Mains frequency measurement core plus the adapters that bind it to the
//! ESP32 (GPTimer, GPIO edge interrupt, SNTP clock, MQTT). Everything the
//! core needs from the outside world goes through the traits in
//! [`app::ports`], so the full pipeline also runs on the host against the
//! simulated adapters. ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod meter;
pub mod pins;

pub use config::{MeterConfig, MqttConfig};
pub use diagnostics::{CoreStats, HealthStatus, MeterMetrics};
pub use error::{ConfigError, HwError, InitError, PublishError};
pub use meter::burst::{Burst, DeviceStatus};
pub use meter::measurement::Measurement;
pub use meter::{FrequencyMeter, MeterHandles};
