//! ACS712-05B hall-effect current sensor on the heater supply.
//!
//! The sensor outputs `2.5 V + 0.185 V/A`.  Heater power is derived as
//! `|I| × supply_v`.  The conversion also classifies the raw voltage so a
//! floating ADC input is not mistaken for "heater off".
//!
//! ## Dual-target design
//!
//! The ADC itself sits behind [`AdcChannel`]: on ESP-IDF it is the oneshot
//! driver set up by `hw_init`; on host/test any closure or mock works.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Output at 0 A (volts).
pub const ZERO_POINT_V: f32 = 2.5;
/// Sensitivity of the 5 A part (volts per amp).
pub const SENSITIVITY_V_PER_A: f32 = 0.185;
/// Below this the output is floating or unpowered (volts).
pub const DISCONNECTED_BELOW_V: f32 = 0.15;
/// Above this the output is approaching the ADC rail (volts).
pub const OVERVOLTAGE_ABOVE_V: f32 = 2.6;
/// Currents under this are treated as noise (amps).
pub const NOISE_FLOOR_A: f32 = 0.05;
/// ADC samples averaged per reading.
pub const SAMPLES_PER_READING: u32 = 100;
/// Gap between samples (µs).  With conversion time a reading spans about
/// 2.5 ms, a dozen periods of the 5 kHz heater PWM, so the average tracks
/// the mean current at any duty.
pub const SAMPLE_SPACING_US: u32 = 20;

/// Connection/signal classification of one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurrentSensorStatus {
    #[default]
    Ok,
    /// Output below 0.15 V: sensor unplugged or unpowered.  Reads as 0 W.
    Disconnected,
    /// Output above 2.6 V: still converted, but worth a warning.
    OverVoltage,
}

/// One converted reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CurrentReading {
    pub voltage_v: f32,
    pub current_a: f32,
    pub power_w: f32,
    pub status: CurrentSensorStatus,
}

impl CurrentReading {
    /// Convert a sensor output voltage.
    pub fn from_voltage(voltage_v: f32, supply_v: f32) -> Self {
        if voltage_v < DISCONNECTED_BELOW_V {
            return Self {
                voltage_v,
                current_a: 0.0,
                power_w: 0.0,
                status: CurrentSensorStatus::Disconnected,
            };
        }

        let status = if voltage_v > OVERVOLTAGE_ABOVE_V {
            CurrentSensorStatus::OverVoltage
        } else {
            CurrentSensorStatus::Ok
        };

        let mut current_a = (voltage_v - ZERO_POINT_V).abs() / SENSITIVITY_V_PER_A;
        if current_a < NOISE_FLOOR_A {
            current_a = 0.0;
        }

        Self {
            voltage_v,
            current_a,
            power_w: current_a * supply_v,
            status,
        }
    }

    /// A reading that carries no information (ADC failure).
    pub fn disconnected() -> Self {
        Self {
            status: CurrentSensorStatus::Disconnected,
            ..Self::default()
        }
    }
}

/// A single analog input returning calibrated millivolts.
pub trait AdcChannel {
    fn read_millivolts(&mut self) -> Result<u16>;
}

impl<F> AdcChannel for F
where
    F: FnMut() -> Result<u16>,
{
    fn read_millivolts(&mut self) -> Result<u16> {
        self()
    }
}

/// ACS712 driver: averages ADC samples spread over several PWM periods
/// and converts.
pub struct Acs712<A, D> {
    adc: A,
    delay: D,
    supply_v: f32,
}

impl<A: AdcChannel, D: DelayNs> Acs712<A, D> {
    pub fn new(adc: A, delay: D, supply_v: f32) -> Self {
        Self {
            adc,
            delay,
            supply_v,
        }
    }

    /// Average [`SAMPLES_PER_READING`] samples, [`SAMPLE_SPACING_US`] apart,
    /// and convert.  An ADC error yields a `Disconnected` reading rather
    /// than an error: the heater check must still run this cycle.
    pub fn read(&mut self) -> CurrentReading {
        let mut sum_mv = 0u32;
        for i in 0..SAMPLES_PER_READING {
            if i > 0 {
                self.delay.delay_us(SAMPLE_SPACING_US);
            }
            match self.adc.read_millivolts() {
                Ok(mv) => sum_mv += u32::from(mv),
                Err(e) => {
                    warn!("acs712: ADC read failed: {e}");
                    return CurrentReading::disconnected();
                }
            }
        }
        let voltage_v = sum_mv as f32 / SAMPLES_PER_READING as f32 / 1000.0;
        let reading = CurrentReading::from_voltage(voltage_v, self.supply_v);
        debug!(
            "acs712: {:.3} V -> {:.2} A, {:.1} W ({:?})",
            voltage_v, reading.current_a, reading.power_w, reading.status
        );
        reading
    }
}
