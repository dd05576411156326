//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the ACS712 current sensor and the heater driver, exposing them
//! through [`CurrentPort`], [`HeaterPort`] and [`ButtonPort`].  Together
//! with the DHT22 pin this is the only code that touches actual hardware.
//! On non-espidf targets the underlying `hw_init` calls are simulation
//! stubs.

use crate::app::ports::{ButtonPort, CurrentPort, HeaterPort};
use crate::drivers::heater::HeaterDriver;
use crate::drivers::hw_init::{self, RomDelay};
use crate::error::Result;
use crate::pins;
use crate::sensors::current::{Acs712, CurrentReading};

/// ADC read function for the current sensor channel.
type CurrentAdc = fn() -> Result<u16>;

fn read_current_channel() -> Result<u16> {
    hw_init::adc1_read_mv(pins::CURRENT_ADC_CHANNEL)
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    current: Acs712<CurrentAdc, RomDelay>,
    heater: HeaterDriver,
}

impl HardwareAdapter {
    /// `supply_v` is the heater rail used to convert amps to watts.
    pub fn new(supply_v: f32, heater: HeaterDriver) -> Self {
        Self {
            current: Acs712::new(read_current_channel as CurrentAdc, RomDelay, supply_v),
            heater,
        }
    }

    pub fn heater(&self) -> &HeaterDriver {
        &self.heater
    }

    /// Force the heater off outside the control loop (start-up, panic path).
    pub fn all_off(&mut self) {
        self.heater.off();
    }
}

// ── CurrentPort implementation ────────────────────────────────

impl CurrentPort for HardwareAdapter {
    fn read_current(&mut self) -> CurrentReading {
        self.current.read()
    }
}

// ── HeaterPort implementation ─────────────────────────────────

impl HeaterPort for HardwareAdapter {
    fn set_heater_duty(&mut self, duty_percent: f32) {
        self.heater.set_duty(duty_percent);
    }
}

// ── ButtonPort implementation ─────────────────────────────────

impl ButtonPort for HardwareAdapter {
    fn is_pressed(&mut self) -> bool {
        // Active low with pull-up.
        !hw_init::gpio_read(pins::BUTTON_GPIO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heater_duty_reaches_driver() {
        let mut hw = HardwareAdapter::new(12.0, HeaterDriver::new());
        hw.set_heater_duty(50.0);
        assert!(hw.heater().is_on());
        hw.all_off();
        assert!(!hw.heater().is_on());
    }

    #[test]
    fn idle_sim_reads_zero_amps() {
        let mut hw = HardwareAdapter::new(12.0, HeaterDriver::new());
        let reading = hw.read_current();
        assert!(reading.power_w < 0.5);
    }
}
