//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (serial console,
//! a front panel, tests) that the
//! [`DryerService`](super::service::DryerService) interprets and acts upon.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Retry the temperature sensor now instead of waiting for the
    /// recovery cadence.  Ignored while the sensor is healthy.
    RecoverSensor,

    /// Clear a latched heater failure (operator checked the cartridge).
    ResetHeaterFault,

    /// Set the target temperature directly.  Must lie inside the
    /// selectable range.
    SetSetpoint(f32),

    /// Replace the PID gains without disturbing the sample-time gate.
    UpdateTunings { kp: f32, ki: f32, kd: f32 },
}
