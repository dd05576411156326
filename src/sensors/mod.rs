//! Sensor subsystem: the DHT22 single-wire decoder, the health monitor
//! that wraps it, and the ACS712 heater-current conversion.
//!
//! The monitor only sees the [`SampleSource`] trait, so tests can script
//! decode results without simulating a pulse train.

pub mod current;
pub mod dht22;
pub mod monitor;
#[cfg(not(target_os = "espidf"))]
pub mod sim;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// One successful temperature/humidity measurement, in sensor-native
/// fixed point.  Never partially valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Temperature in tenths of a degree Celsius.
    pub temperature_tenths: i16,
    /// Relative humidity in tenths of a percent.
    pub humidity_tenths: u16,
}

impl SensorSample {
    pub const fn new(temperature_tenths: i16, humidity_tenths: u16) -> Self {
        Self {
            temperature_tenths,
            humidity_tenths,
        }
    }

    /// Temperature in °C.
    pub fn celsius(&self) -> f32 {
        f32::from(self.temperature_tenths) / 10.0
    }

    /// Relative humidity in %.
    pub fn humidity_percent(&self) -> f32 {
        f32::from(self.humidity_tenths) / 10.0
    }
}

impl Default for SensorSample {
    /// Placeholder shown before the first good read: 25.0 °C, 50.0 %.
    fn default() -> Self {
        Self::new(250, 500)
    }
}

/// Anything that can produce one blocking temperature/humidity read.
pub trait SampleSource {
    fn read_sample(&mut self) -> Result<SensorSample, DecodeError>;
}
