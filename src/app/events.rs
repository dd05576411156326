//! Outbound application events.
//!
//! The [`DryerService`](super::service::DryerService) collects these during
//! a cycle and emits them through the [`EventSink`](super::ports::EventSink)
//! port once the heater command has been applied.  Adapters on the other
//! side decide what to do with them.

use heapless::Vec;

use super::snapshot::DryerSnapshot;
use crate::error::{DecodeError, SafetyFault};
use crate::fsm::StateId;
use crate::sensors::current::CurrentSensorStatus;

/// Most events a single cycle can produce.
pub const MAX_EVENTS_PER_CYCLE: usize = 8;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum DryerEvent {
    /// A DHT22 read failed.
    SensorFailure {
        error: DecodeError,
        consecutive: u32,
    },

    /// The first good read after a recovery attempt.
    SensorRecovered,

    /// The overall safety flag went false.
    EnteredUnsafe { cause: SafetyFault },

    /// The heater-current monitor latched a failure.
    HeaterFailure { consecutive: u32 },

    /// The target temperature changed (button or command).
    SetpointChanged { from: f32, to: f32 },

    /// The arbiter FSM moved between states.
    StateChanged { from: StateId, to: StateId },

    /// The current sensor left the `Ok` status.
    CurrentSensorWarning {
        status: CurrentSensorStatus,
        voltage_v: f32,
    },

    /// End-of-cycle snapshot.
    Telemetry(DryerSnapshot),
}

/// Events gathered during one cycle, in the order they occurred.
#[derive(Debug, Default)]
pub struct CycleEvents {
    events: Vec<DryerEvent, MAX_EVENTS_PER_CYCLE>,
    dropped: u32,
}

impl CycleEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DryerEvent) {
        if self.events.push(event).is_err() {
            self.dropped += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events that did not fit this cycle.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &DryerEvent> {
        self.events.iter()
    }

    /// Hand every event to `sink` and empty the buffer.
    pub fn flush(&mut self, sink: &mut impl super::ports::EventSink) {
        if self.dropped > 0 {
            log::warn!("events: {} dropped this cycle", self.dropped);
        }
        for event in &self.events {
            sink.emit(event);
        }
        self.events.clear();
        self.dropped = 0;
    }
}
