//! Log-based publisher adapter.
//!
//! Implements [`Publisher`] by writing each burst to the logger (UART /
//! USB-CDC in production). Used when no broker is configured and on host
//! simulations.

use log::{debug, info};

use crate::app::ports::Publisher;
use crate::error::PublishError;
use crate::meter::burst::Burst;

/// Adapter that logs every burst to the serial console.
#[derive(Debug, Default)]
pub struct LogPublisher {
    published: u32,
}

impl LogPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bursts logged so far.
    pub fn published(&self) -> u32 {
        self.published
    }
}

impl Publisher for LogPublisher {
    fn publish(&mut self, burst: Burst) -> Result<(), PublishError> {
        info!(
            "BURST | seq={} | status={} | n={}",
            burst.sequence_number(),
            burst.device_status(),
            burst.len()
        );
        for (i, m) in burst.iter().enumerate() {
            info!("BURST | [{}] {:.3} Hz @ {} ms", i, m.frequency_hz, m.timestamp_ms);
        }
        if let Ok(json) = serde_json::to_string(&burst) {
            debug!("BURST | {}", json);
        }
        self.published += 1;
        Ok(())
    }
}
