//! The externally visible state of the dryer.

use heapless::String;
use serde::Serialize;

use crate::config::SystemConfig;
use crate::fsm::StateId;
use crate::sensors::current::CurrentSensorStatus;
use crate::sensors::monitor::{STATUS_TEXT_CAP, SensorHealth};

/// Point-in-time view of the dryer, refreshed once per control cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DryerSnapshot {
    pub temperature_c: f32,
    pub humidity_percent: f32,
    pub setpoint_c: f32,
    /// Duty actually applied to the heater this cycle (%).
    pub heater_duty_percent: f32,
    /// Duty above the "active" threshold.
    pub heater_on: bool,
    pub is_safe: bool,
    pub heater_failed: bool,
    pub uptime_s: u32,

    pub power_w: f32,
    pub energy_wh: f32,
    pub total_sensor_failures: u32,
    pub total_unsafe_events: u32,
    pub consecutive_sensor_failures: u32,
    pub arbiter_state: StateId,
    /// Last sensor error description.
    pub sensor_status: String<STATUS_TEXT_CAP>,
    pub current_sensor: CurrentSensorStatus,
    pub fault_flags: u8,
}

impl DryerSnapshot {
    /// Start-up values: 25.0 °C, 50.0 %, default setpoint, heater off.
    pub fn initial(config: &SystemConfig) -> Self {
        Self {
            temperature_c: 25.0,
            humidity_percent: 50.0,
            setpoint_c: config.setpoint_default_c,
            heater_duty_percent: 0.0,
            heater_on: false,
            is_safe: true,
            heater_failed: false,
            uptime_s: 0,
            power_w: 0.0,
            energy_wh: 0.0,
            total_sensor_failures: 0,
            total_unsafe_events: 0,
            consecutive_sensor_failures: 0,
            arbiter_state: StateId::Normal,
            sensor_status: SensorHealth::default().last_error_description,
            current_sensor: CurrentSensorStatus::Ok,
            fault_flags: 0,
        }
    }

    /// Compact JSON rendering for the telemetry line.
    pub fn to_json(&self) -> Result<std::string::String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
