//! Actuator drivers, hardware initialisation, the input button and the
//! task watchdog.

pub mod button;
pub mod heater;
pub mod hw_init;
pub mod watchdog;
