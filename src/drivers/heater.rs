//! Heater cartridge driver (MOSFET low-side switch on LEDC PWM ch0).
//!
//! ## Safety contract
//!
//! The heater must be off whenever the system is unsafe.  That is enforced
//! by the arbiter, which is the only producer of the duty command; this
//! driver is a dumb actuator.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real PWM via hw_init helpers.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaterState {
    Off,
    On { duty_percent: f32 },
}

pub struct HeaterDriver {
    state: HeaterState,
    hw_duty: u32,
}

impl Default for HeaterDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaterDriver {
    pub fn new() -> Self {
        Self {
            state: HeaterState::Off,
            hw_duty: 0,
        }
    }

    /// Set the PWM duty in percent.  Values are clamped to 0 – 100; NaN
    /// turns the heater off.
    pub fn set_duty(&mut self, duty_percent: f32) {
        if duty_percent.is_nan() || duty_percent <= 0.0 {
            self.off();
            return;
        }
        let duty_percent = duty_percent.min(100.0);
        self.hw_duty = percent_to_code(duty_percent);
        hw_init::ledc_set(hw_init::LEDC_CH_HEATER, self.hw_duty);
        self.state = HeaterState::On { duty_percent };
    }

    pub fn off(&mut self) {
        hw_init::ledc_set(hw_init::LEDC_CH_HEATER, 0);
        self.hw_duty = 0;
        self.state = HeaterState::Off;
    }

    pub fn state(&self) -> HeaterState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        !matches!(self.state, HeaterState::Off)
    }

    /// Last duty code written to the LEDC channel.
    pub fn hw_duty(&self) -> u32 {
        self.hw_duty
    }
}

fn percent_to_code(duty_percent: f32) -> u32 {
    (duty_percent / 100.0 * hw_init::LEDC_MAX_DUTY as f32).round() as u32
}
