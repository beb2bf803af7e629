//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter         | Implements       | Connects to                    |
//! |-----------------|------------------|--------------------------------|
//! | `timer`         | TimerDriver      | ESP32 GPTimer / host sim       |
//! | `gpio`          | InterruptSource  | GPIO ISR service / host sim    |
//! | `time`          | ClockSource      | SNTP-synced system clock / sim |
//! | `log_publisher` | Publisher        | Serial log output              |
//! | `mqtt`          | Publisher        | ThingSpeak MQTT broker         |
//!
//! The status provider lives in [`crate::diagnostics`]. `wifi` only brings
//! the station interface up for the MQTT client.

pub mod gpio;
pub mod log_publisher;
pub mod mqtt;
pub mod time;
pub mod timer;
pub mod wifi;
