//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DryerService (domain)
//! ```
//!
//! Driven adapters (current sensor, heater PWM, button, clock, event sinks)
//! implement these traits.  The [`DryerService`](super::service::DryerService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.  The DHT22 is not a port: the service owns its
//! [`SampleSource`](crate::sensors::SampleSource) because the health
//! monitor wraps it.

use crate::sensors::current::CurrentReading;

// ───────────────────────────────────────────────────────────────
// Current port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Heater supply current, converted to watts with a connection status.
pub trait CurrentPort {
    fn read_current(&mut self) -> CurrentReading;
}

// ───────────────────────────────────────────────────────────────
// Heater port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the single actuator.
pub trait HeaterPort {
    /// Set the heater PWM duty, 0 – 100 %.
    fn set_heater_duty(&mut self, duty_percent: f32);
}

// ───────────────────────────────────────────────────────────────
// Button port
// ───────────────────────────────────────────────────────────────

/// Raw, undebounced button level.
pub trait ButtonPort {
    /// True while the switch is closed.
    fn is_pressed(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.  Wraps at `u32::MAX`; consumers use
/// wrapping arithmetic.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`DryerEvent`](super::events::DryerEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::DryerEvent);
}
