//! WiFi station bring-up.
//!
//! The meter only needs a network to publish; it has no provisioning flow.
//! Credentials are baked in at build time from `FMU_WIFI_SSID` /
//! `FMU_WIFI_PASSWORD` and validated before the radio is touched.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`connect_station`] drives
//!   `esp_idf_svc::wifi::BlockingWifi` until the netif is up.
//! - credential validation is target-independent and host-tested.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed(i32),
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed(code) => write!(f, "WiFi connection failed (code {})", code),
        }
    }
}

impl core::error::Error for ConnectivityError {}

/// Station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

impl WifiCredentials {
    /// Validate and copy a credential pair.
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let mut c = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        c.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        c.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(c)
    }

    /// Credentials compiled into the image.
    pub fn from_build_env() -> Result<Self, ConnectivityError> {
        match option_env!("FMU_WIFI_SSID") {
            Some(ssid) if !ssid.is_empty() => {
                Self::new(ssid, option_env!("FMU_WIFI_PASSWORD").unwrap_or(""))
            }
            _ => Err(ConnectivityError::NoCredentials),
        }
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub use esp::connect_station;

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::info;

    /// Start the radio in station mode and block until an IP is assigned.
    pub fn connect_station(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        creds: &WifiCredentials,
    ) -> Result<BlockingWifi<EspWifi<'static>>, ConnectivityError> {
        let fail = |e: esp_idf_svc::sys::EspError| ConnectivityError::ConnectionFailed(e.code());

        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(fail)?,
            sysloop,
        )
        .map_err(fail)?;

        let auth_method = if creds.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: creds.ssid.clone(),
            password: creds.password.clone(),
            auth_method,
            ..Default::default()
        }))
        .map_err(fail)?;

        wifi.start().map_err(fail)?;
        info!("wifi: started, connecting to '{}'", creds.ssid);
        wifi.connect().map_err(fail)?;
        wifi.wait_netif_up().map_err(fail)?;

        if let Ok(ip) = wifi.wifi().sta_netif().get_ip_info() {
            info!("wifi: up, ip {}", ip.ip);
        }
        Ok(wifi)
    }
}
