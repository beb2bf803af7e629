//! MQTT publisher adapter (ThingSpeak channel feed).
//!
//! Each measurement of a burst goes out as its own message on the channel
//! topic:
//!
//! ```text
//! field1=<frequency Hz, 3 dp>&field2=<timestamp ms>&status=<device status>
//! ```
//!
//! ThingSpeak rate-limits channel updates, so consecutive messages of a
//! burst are spaced by `message_spacing_ms`. Messages are QoS 0; the first
//! one the client refuses fails the whole burst.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`MqttPublisher`] over `EspMqttClient`.
//! - message formatting is target-independent and host-tested.

use core::fmt::Write as _;

use crate::error::PublishError;
use crate::meter::measurement::Measurement;

/// Longest message the formatter will produce.
pub const MESSAGE_LEN: usize = 100;

pub type Message = heapless::String<MESSAGE_LEN>;

/// Format one ThingSpeak channel update.
pub fn thingspeak_message(m: &Measurement, status: &str) -> Result<Message, PublishError> {
    let mut msg = Message::new();
    write!(
        msg,
        "field1={:.3}&field2={}&status={}",
        m.frequency_hz, m.timestamp_ms, status
    )
    .map_err(|_| PublishError::PayloadTooLarge)?;
    Ok(msg)
}

#[cfg(target_os = "espidf")]
pub use esp::MqttPublisher;

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};
    use core::time::Duration;
    use std::sync::Arc;

    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::signal::Signal;
    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };
    use esp_idf_svc::sys::EspError;
    use log::{debug, info, warn};

    use crate::app::ports::Publisher;
    use crate::config::MqttConfig;
    use crate::meter::burst::Burst;

    /// Connection state shared with the MQTT event callback.
    #[derive(Default)]
    struct Link {
        connected: AtomicBool,
        up: Signal<CriticalSectionRawMutex, ()>,
    }

    pub struct MqttPublisher {
        client: EspMqttClient<'static>,
        topic: heapless::String<64>,
        spacing: Duration,
        link: Arc<Link>,
    }

    impl MqttPublisher {
        /// Create the client and start connecting in the background.
        pub fn new(config: &MqttConfig, message_spacing_ms: u32) -> Result<Self, EspError> {
            let link = Arc::new(Link::default());
            let cb_link = link.clone();

            let conf = MqttClientConfiguration {
                client_id: Some(config.client_id.as_str()),
                username: Some(config.username.as_str()),
                password: Some(config.password.as_str()),
                ..Default::default()
            };

            let client = EspMqttClient::new_cb(config.uri.as_str(), &conf, move |event| {
                match event.payload() {
                    EventPayload::Connected(_) => {
                        info!("mqtt: connected");
                        cb_link.connected.store(true, Ordering::Release);
                        cb_link.up.signal(());
                    }
                    EventPayload::Disconnected => {
                        warn!("mqtt: disconnected");
                        cb_link.connected.store(false, Ordering::Release);
                    }
                    EventPayload::Published(id) => debug!("mqtt: published msg_id={}", id),
                    EventPayload::Error(e) => warn!("mqtt: error {:?}", e),
                    other => debug!("mqtt: event {:?}", other),
                }
            })?;

            info!("mqtt: client started for {}", config.uri);
            Ok(Self {
                client,
                topic: config.topic.clone(),
                spacing: Duration::from_millis(u64::from(message_spacing_ms)),
                link,
            })
        }

        /// Block until the broker accepts the connection.
        pub fn wait_connected(&self) {
            if self.is_connected() {
                return;
            }
            futures_lite::future::block_on(self.link.up.wait());
        }

        pub fn is_connected(&self) -> bool {
            self.link.connected.load(Ordering::Acquire)
        }
    }

    impl Publisher for MqttPublisher {
        fn publish(&mut self, burst: Burst) -> Result<(), PublishError> {
            if !self.is_connected() {
                return Err(PublishError::NotConnected);
            }
            for (i, m) in burst.iter().enumerate() {
                if i > 0 {
                    std::thread::sleep(self.spacing);
                }
                let msg = thingspeak_message(m, burst.device_status())?;
                let id = self
                    .client
                    .publish(&self.topic, QoS::AtMostOnce, false, msg.as_bytes())
                    .map_err(|e| PublishError::Rejected(e.code()))?;
                debug!("mqtt: burst #{} [{}] queued as msg_id={}", burst.sequence_number(), i, id);
            }
            Ok(())
        }
    }
}
