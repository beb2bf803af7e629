//! Initialisation order and failure paths.

use fmunode::adapters::gpio::SimEdgeInput;
use fmunode::adapters::time::SimClock;
use fmunode::adapters::timer::SimTimer;
use fmunode::error::ESP_FAIL;
use fmunode::pins;
use fmunode::{ConfigError, FrequencyMeter, InitError, MeterConfig};

use crate::mock_ports::test_config;

fn init(
    config: &MeterConfig,
    timer: SimTimer,
    input: &mut SimEdgeInput,
) -> Result<FrequencyMeter<SimClock>, InitError> {
    FrequencyMeter::init(config, timer, input, SimClock::at(0))
}

#[test]
fn successful_init_arms_the_configured_pin() {
    let timer = SimTimer::new();
    let mut input = SimEdgeInput::new();
    let meter = init(&test_config(), timer.clone(), &mut input).unwrap();

    assert!(timer.is_running());
    assert_eq!(input.configured_pin(), Some(pins::ZCO_PIN));
    assert!(input.line().is_armed());
    assert_eq!(meter.config().pulses_per_measurement, test_config().pulses_per_measurement);
    assert_eq!(meter.metrics().samples_taken, 0);
}

#[test]
fn timer_failure_is_reported_before_the_pin_is_touched() {
    let mut input = SimEdgeInput::new();
    let err = init(&test_config(), SimTimer::failing(), &mut input).err();

    assert_eq!(err, Some(InitError::TimerConfig(ESP_FAIL)));
    assert_eq!(input.configured_pin(), None);
    assert!(!input.line().is_armed());
}

#[test]
fn pin_failure_leaves_nothing_armed() {
    let mut input = SimEdgeInput::new().fail_configure();
    let err = init(&test_config(), SimTimer::new(), &mut input).err();

    assert_eq!(err, Some(InitError::PinConfig(ESP_FAIL)));
    assert!(!input.line().is_armed());
}

#[test]
fn handler_install_failure_is_fatal() {
    let mut input = SimEdgeInput::new().fail_register();
    let err = init(&test_config(), SimTimer::new(), &mut input).err();

    assert_eq!(err, Some(InitError::InterruptInstall(ESP_FAIL)));
    assert!(!input.line().is_armed());
}

#[test]
fn invalid_config_is_rejected_before_hardware() {
    let timer = SimTimer::new();
    let mut input = SimEdgeInput::new();
    let config = MeterConfig {
        pulses_per_measurement: 0,
        ..test_config()
    };
    let err = init(&config, timer.clone(), &mut input).err();

    assert!(matches!(err, Some(InitError::InvalidConfig(ConfigError::ValidationFailed(_)))));
    assert!(!timer.is_running());
    assert_eq!(input.configured_pin(), None);
}
