//! Mock hardware adapter for integration tests.
//!
//! Records every port call so tests can assert on the full command
//! history, including the order of reads and writes within a cycle,
//! without touching real ADC/PWM registers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use filament_dryer::app::events::DryerEvent;
use filament_dryer::app::ports::{ButtonPort, CurrentPort, EventSink, HeaterPort};
use filament_dryer::error::DecodeError;
use filament_dryer::sensors::current::{
    CurrentReading, CurrentSensorStatus, SENSITIVITY_V_PER_A, ZERO_POINT_V,
};
use filament_dryer::sensors::{SampleSource, SensorSample};

/// Heater rail used by the mock (volts).
pub const SUPPLY_V: f32 = 12.0;

// ── Hardware call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HwCall {
    ReadCurrent,
    SetDuty(f32),
}

// ── MockHardware ──────────────────────────────────────────────

/// A heater that draws `full_power_w × duty` unless broken, seen through
/// an ACS712 that can be unplugged.
pub struct MockHardware {
    pub calls: Vec<HwCall>,
    pub full_power_w: f32,
    pub heater_broken: bool,
    pub current_unplugged: bool,
    pub button_pressed: bool,
    duty: f32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            full_power_w: 40.0,
            heater_broken: false,
            current_unplugged: false,
            button_pressed: false,
            duty: 0.0,
        }
    }

    /// Duty currently applied to the heater.
    pub fn duty(&self) -> f32 {
        self.duty
    }

    /// Every duty written, in order.
    pub fn duties(&self) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::SetDuty(d) => Some(*d),
                HwCall::ReadCurrent => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrentPort for MockHardware {
    fn read_current(&mut self) -> CurrentReading {
        self.calls.push(HwCall::ReadCurrent);
        if self.current_unplugged {
            return CurrentReading::from_voltage(0.02, SUPPLY_V);
        }
        let power_w = if self.heater_broken {
            0.0
        } else {
            self.full_power_w * self.duty / 100.0
        };
        let current_a = power_w / SUPPLY_V;
        CurrentReading {
            voltage_v: ZERO_POINT_V + current_a * SENSITIVITY_V_PER_A,
            current_a,
            power_w,
            status: CurrentSensorStatus::Ok,
        }
    }
}

impl HeaterPort for MockHardware {
    fn set_heater_duty(&mut self, duty_percent: f32) {
        self.calls.push(HwCall::SetDuty(duty_percent));
        self.duty = duty_percent;
    }
}

impl ButtonPort for MockHardware {
    fn is_pressed(&mut self) -> bool {
        self.button_pressed
    }
}

// ── ScriptedSensor ────────────────────────────────────────────

#[derive(Debug)]
struct Script {
    queue: VecDeque<Result<SensorSample, DecodeError>>,
    steady: Result<SensorSample, DecodeError>,
    reads: u32,
}

/// DHT22 stand-in.  Queued results are returned first, then the steady
/// result forever.  Clones share the script so a test can keep a handle
/// after moving one into the service.
#[derive(Debug, Clone)]
pub struct ScriptedSensor(Rc<RefCell<Script>>);

#[allow(dead_code)]
impl ScriptedSensor {
    pub fn steady(result: Result<SensorSample, DecodeError>) -> Self {
        Self(Rc::new(RefCell::new(Script {
            queue: VecDeque::new(),
            steady: result,
            reads: 0,
        })))
    }

    /// A healthy sensor reporting `celsius` at 40 % RH.
    pub fn at(celsius: f32) -> Self {
        Self::steady(Ok(sample(celsius)))
    }

    pub fn set_steady(&self, result: Result<SensorSample, DecodeError>) {
        self.0.borrow_mut().steady = result;
    }

    pub fn push(&self, result: Result<SensorSample, DecodeError>) {
        self.0.borrow_mut().queue.push_back(result);
    }

    /// Number of reads the service performed.
    pub fn reads(&self) -> u32 {
        self.0.borrow().reads
    }
}

impl SampleSource for ScriptedSensor {
    fn read_sample(&mut self) -> Result<SensorSample, DecodeError> {
        let mut script = self.0.borrow_mut();
        script.reads += 1;
        let steady = script.steady;
        script.queue.pop_front().unwrap_or(steady)
    }
}

pub fn sample(celsius: f32) -> SensorSample {
    SensorSample::new((celsius * 10.0).round() as i16, 400)
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<DryerEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&DryerEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    /// Events other than the per-cycle telemetry.
    pub fn notable(&self) -> Vec<&DryerEvent> {
        self.events
            .iter()
            .filter(|e| !matches!(e, DryerEvent::Telemetry(_)))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &DryerEvent) {
        self.events.push(event.clone());
    }
}
