//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).  Telemetry is
//! written twice: a human-readable line and a JSON line for log scrapers.

use log::{Level, info, log, warn};

use crate::app::events::DryerEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`DryerEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// The level and text of the console line for `event`.
pub fn render(event: &DryerEvent) -> (Level, String) {
    match event {
        DryerEvent::Telemetry(t) => (
            Level::Info,
            format!(
                "TELEM | T={:.1}\u{00b0}C RH={:.1}% | SP={:.0}\u{00b0}C | heater={:.0}% {} | \
                 {:.1}W {:.2}Wh | {:?} | safe={} | sensor: {}",
                t.temperature_c,
                t.humidity_percent,
                t.setpoint_c,
                t.heater_duty_percent,
                if t.heater_on { "ON" } else { "OFF" },
                t.power_w,
                t.energy_wh,
                t.arbiter_state,
                t.is_safe,
                t.sensor_status,
            ),
        ),
        DryerEvent::SensorFailure { error, consecutive } => (
            Level::Warn,
            format!("SENSOR | read failed ({error}), {consecutive} in a row"),
        ),
        DryerEvent::SensorRecovered => (Level::Info, "SENSOR | recovered".into()),
        DryerEvent::EnteredUnsafe { cause } => (
            Level::Error,
            format!("SAFETY | UNSAFE: {cause}, heater forced off"),
        ),
        DryerEvent::HeaterFailure { consecutive } => (
            Level::Error,
            format!("HEATER | no current draw for {consecutive} cycles, latched failed"),
        ),
        DryerEvent::SetpointChanged { from, to } => (
            Level::Info,
            format!("SETPOINT | {from:.0} -> {to:.0}\u{00b0}C"),
        ),
        DryerEvent::StateChanged { from, to } => {
            (Level::Info, format!("STATE | {from:?} -> {to:?}"))
        }
        DryerEvent::CurrentSensorWarning { status, voltage_v } => (
            Level::Warn,
            format!("CURRENT | {status:?} at {voltage_v:.2} V"),
        ),
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DryerEvent) {
        let (level, line) = render(event);
        log!(level, "{line}");
        if let DryerEvent::Telemetry(t) = event {
            match t.to_json() {
                Ok(json) => info!("JSON | {json}"),
                Err(e) => warn!("JSON | serialisation failed: {e}"),
            }
        }
    }
}
