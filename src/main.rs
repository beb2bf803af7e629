//! FMU node firmware, main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  GpTimer        GpioEdgeInput     SystemClock (SNTP)         │
//! │  (TimerDriver)  (InterruptSource) (ClockSource)              │
//! │  MqttPublisher / LogPublisher     HealthStatus               │
//! │  (Publisher)                      (StatusProvider)           │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  FrequencyMeter: ISR edge counter → measurement task   │  │
//! │  │                  → burst batcher                       │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Boot order: logger, NVS, Wi-Fi, SNTP, MQTT, then the meter. The meter
//! is armed last so the first bursts carry synced timestamps and have a
//! broker to go to.
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::{EspSntp, SyncStatus};

use fmunode::adapters::gpio::GpioEdgeInput;
use fmunode::adapters::log_publisher::LogPublisher;
use fmunode::adapters::mqtt::MqttPublisher;
use fmunode::adapters::time::{is_synced, SystemClock};
use fmunode::adapters::timer::GpTimer;
use fmunode::adapters::wifi::{connect_station, WifiCredentials};
use fmunode::app::ports::Publisher;
use fmunode::{FrequencyMeter, HealthStatus, MeterConfig, MqttConfig};

/// SNTP gets this many one-second polls before we carry on unsynced.
const SNTP_SYNC_ATTEMPTS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  FMU node v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let config = MeterConfig::default();
    config.validate()?;

    // ── 2. Network ────────────────────────────────────────────
    let wifi = match WifiCredentials::from_build_env() {
        Ok(creds) => match connect_station(peripherals.modem, sysloop, nvs, &creds) {
            Ok(w) => Some(w),
            Err(e) => {
                warn!("Wi-Fi: {}, running offline", e);
                None
            }
        },
        Err(e) => {
            warn!("Wi-Fi: {}, running offline", e);
            None
        }
    };

    // ── 3. Wall clock ─────────────────────────────────────────
    let clock = SystemClock::new();
    let _sntp = if wifi.is_some() {
        let sntp = EspSntp::new_default()?;
        for attempt in 1..=SNTP_SYNC_ATTEMPTS {
            if sntp.get_sync_status() == SyncStatus::Completed {
                break;
            }
            info!("SNTP: waiting for sync ({}/{})", attempt, SNTP_SYNC_ATTEMPTS);
            FreeRtos::delay_ms(1000);
        }
        Some(sntp)
    } else {
        None
    };
    if !is_synced(&clock) {
        warn!("SNTP: clock not synced, timestamps are relative to boot");
    }

    // ── 4. Publisher ──────────────────────────────────────────
    let mqtt = MqttConfig::default();
    let publisher: Box<dyn Publisher + Send> = if wifi.is_some() && !mqtt.username.is_empty() {
        let client = MqttPublisher::new(&mqtt, config.message_spacing_ms)?;
        client.wait_connected();
        Box::new(client)
    } else {
        info!("MQTT: no broker configured, bursts go to the log");
        Box::new(LogPublisher::new())
    };

    // ── 5. Self-test signal ───────────────────────────────────
    #[cfg(feature = "self-test")]
    {
        use esp_idf_svc::hal::gpio::PinDriver;
        use fmunode::drivers::task_pin::{spawn_on_core, Core};
        use fmunode::drivers::zco_sim::ZcoSimulator;

        info!("Self-test: driving GPIO{} (jumper to GPIO{})", fmunode::pins::TEST_PIN, config.pin);
        let pin = PinDriver::output(peripherals.pins.gpio12)?;
        let pulses = config.pulses_per_measurement;
        spawn_on_core(Core::Pro, 5, 4, "zco_sim\0", move || {
            let mut sim = ZcoSimulator::new(pin, FreeRtos, pulses, 0x2545_F491);
            loop {
                if let Err(e) = sim.run(1) {
                    error!("Self-test: pin write failed: {:?}", e);
                    return;
                }
            }
        });
    }

    // ── 6. Meter ──────────────────────────────────────────────
    let mut interrupts = GpioEdgeInput::new();
    let meter = FrequencyMeter::init(&config, GpTimer::new(config.tick_hz), &mut interrupts, clock)?;
    let status = HealthStatus::new(meter.stats());
    let Some(handles) = meter.spawn(status, publisher) else {
        error!("Meter: pipeline already started");
        anyhow::bail!("meter pipeline could not be spawned");
    };

    info!("System ready.");

    // Both pipeline tasks loop forever; `interrupts`, `wifi` and `_sntp`
    // must outlive them.
    let _ = handles.batcher.join();
    let _ = handles.measurement.join();
    drop(interrupts);
    drop(wifi);
    Ok(())
}
