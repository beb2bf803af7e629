//! Fixed-capacity bursts of measurements.

use serde::Serialize;

use crate::config::MAX_BURST_CAPACITY;

use super::measurement::Measurement;

/// Maximum length of the device status string attached to a burst.
pub const DEVICE_STATUS_LEN: usize = 16;

/// Free-form device health string (bounded).
pub type DeviceStatus = heapless::String<DEVICE_STATUS_LEN>;

/// A sealed batch of measurements, in capture order.
///
/// Only the batcher can build one; once handed to the publisher it is
/// read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Burst {
    sequence_number: u32,
    device_status: DeviceStatus,
    measurements: heapless::Vec<Measurement, MAX_BURST_CAPACITY>,
}

impl Burst {
    pub(crate) fn seal(
        sequence_number: u32,
        device_status: DeviceStatus,
        measurements: heapless::Vec<Measurement, MAX_BURST_CAPACITY>,
    ) -> Self {
        Self {
            sequence_number,
            device_status,
            measurements,
        }
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn device_status(&self) -> &str {
        &self.device_status
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Measurement> {
        self.measurements.iter()
    }
}

impl<'a> IntoIterator for &'a Burst {
    type Item = &'a Measurement;
    type IntoIter = core::slice::Iter<'a, Measurement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
