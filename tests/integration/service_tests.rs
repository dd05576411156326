//! Integration tests: DryerService → monitors → arbiter → heater port.

use filament_dryer::adapters::log_sink::{LogEventSink, render};
use filament_dryer::app::commands::AppCommand;
use filament_dryer::app::events::DryerEvent;
use filament_dryer::app::ports::EventSink;
use filament_dryer::app::service::DryerService;
use filament_dryer::config::SystemConfig;
use filament_dryer::error::{DecodeError, SafetyFault};
use filament_dryer::fsm::StateId;
use filament_dryer::sensors::current::CurrentSensorStatus;
use log::Level;

use crate::mock_hw::{HwCall, MockHardware, RecordingSink, ScriptedSensor, sample};

const CYCLE_MS: u32 = 5000;

fn service(sensor: &ScriptedSensor) -> DryerService<ScriptedSensor> {
    DryerService::new(SystemConfig::default(), sensor.clone()).unwrap()
}

/// Run cycles at `from`, `from + CYCLE_MS`, ... up to and including `to`.
fn run_cycles(
    svc: &mut DryerService<ScriptedSensor>,
    hw: &mut MockHardware,
    sink: &mut impl EventSink,
    from: u32,
    to: u32,
) {
    for now in (from..=to).step_by(CYCLE_MS as usize) {
        svc.tick(now, hw, sink);
    }
}

// ── Normal operation ──────────────────────────────────────────

#[test]
fn cold_start_heats_at_full_duty() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut hw, &mut sink);

    assert_eq!(hw.duty(), 100.0);
    let snap = svc.snapshot();
    assert!(snap.is_safe);
    assert!(snap.heater_on);
    assert_eq!(snap.temperature_c, 30.0);
    assert_eq!(snap.arbiter_state, StateId::Normal);
    assert!(sink.notable().is_empty());
    assert_eq!(sink.count(|e| matches!(e, DryerEvent::Telemetry(_))), 1);
}

#[test]
fn heater_command_follows_the_current_read() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    run_cycles(&mut svc, &mut hw, &mut sink, 0, 2 * CYCLE_MS);

    assert_eq!(
        hw.calls,
        vec![
            HwCall::ReadCurrent,
            HwCall::SetDuty(100.0),
            HwCall::ReadCurrent,
            HwCall::SetDuty(100.0),
            HwCall::ReadCurrent,
            HwCall::SetDuty(100.0),
        ]
    );
    // 40 W heater at full duty for 10 s.
    let expected_wh = 40.0 * 10.0 / 3600.0;
    assert!((svc.snapshot().energy_wh - expected_wh).abs() < 1e-3);
}

#[test]
fn main_loop_cadence() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    for now in (0..60_000).step_by(10) {
        svc.poll_button(now, &mut hw, &mut sink);
        if svc.control_due(now) {
            svc.tick(now, &mut hw, &mut sink);
        }
    }

    assert_eq!(svc.tick_count(), 12);
    assert_eq!(sensor.reads(), 12);
    assert_eq!(sink.count(|e| matches!(e, DryerEvent::Telemetry(_))), 12);
    assert_eq!(svc.snapshot().uptime_s, 55);
}

// ── Sensor loss and recovery ──────────────────────────────────

#[test]
fn sensor_trip_cuts_heater_in_same_cycle() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut hw, &mut sink);
    sensor.set_steady(Err(DecodeError::Timeout));

    // First failure: still safe, the PID keeps driving the heater.
    svc.tick(CYCLE_MS, &mut hw, &mut sink);
    assert!(svc.snapshot().is_safe);
    assert_eq!(hw.duty(), 100.0);

    // Second failure trips.  The cached sample still reads 30 °C, so the
    // PID would ask for 100 %; the command written this cycle must be 0.
    hw.clear();
    sink.clear();
    svc.tick(2 * CYCLE_MS, &mut hw, &mut sink);

    assert_eq!(hw.calls, vec![HwCall::ReadCurrent, HwCall::SetDuty(0.0)]);
    assert_eq!(
        sink.notable(),
        vec![
            &DryerEvent::SensorFailure {
                error: DecodeError::Timeout,
                consecutive: 2
            },
            &DryerEvent::StateChanged {
                from: StateId::Normal,
                to: StateId::Unsafe
            },
            &DryerEvent::EnteredUnsafe {
                cause: SafetyFault::SensorLost
            },
        ]
    );

    let snap = svc.snapshot();
    assert!(!snap.is_safe);
    assert!(!snap.heater_on);
    assert_eq!(snap.total_unsafe_events, 1);
    assert_eq!(snap.total_sensor_failures, 2);
    assert_eq!(snap.sensor_status.as_str(), "communication timeout");
    assert_eq!(snap.fault_flags, SafetyFault::SensorLost.mask());
    assert_eq!(svc.arbiter().pid().integral(), 0.0);
}

#[test]
fn automatic_recovery_after_thirty_seconds() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut hw, &mut sink);
    sensor.set_steady(Err(DecodeError::ChecksumMismatch));
    run_cycles(&mut svc, &mut hw, &mut sink, CYCLE_MS, 2 * CYCLE_MS);
    assert_eq!(svc.state(), StateId::Unsafe);

    // Tripped at 10 s: the heater stays off through the 40 s cycle, which
    // also schedules the recovery attempt.
    hw.clear();
    run_cycles(&mut svc, &mut hw, &mut sink, 3 * CYCLE_MS, 8 * CYCLE_MS);
    assert!(hw.duties().iter().all(|d| *d == 0.0));
    assert_eq!(svc.state(), StateId::Unsafe);

    sensor.set_steady(Ok(sample(30.0)));
    sink.clear();
    svc.tick(9 * CYCLE_MS, &mut hw, &mut sink);

    assert_eq!(
        sink.notable(),
        vec![
            &DryerEvent::SensorRecovered,
            &DryerEvent::StateChanged {
                from: StateId::Unsafe,
                to: StateId::Normal
            },
        ]
    );
    assert_eq!(svc.state(), StateId::Normal);
    assert!(svc.snapshot().is_safe);
    assert_eq!(hw.duty(), 100.0);
}

#[test]
fn failure_on_probation_retrips_immediately() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut hw, &mut sink);
    sensor.set_steady(Err(DecodeError::NoResponse));
    run_cycles(&mut svc, &mut hw, &mut sink, CYCLE_MS, 8 * CYCLE_MS);

    // Recovery ran at the end of the 40 s cycle; the very next read fails.
    sink.clear();
    svc.tick(9 * CYCLE_MS, &mut hw, &mut sink);

    assert_eq!(
        sink.notable(),
        vec![&DryerEvent::SensorFailure {
            error: DecodeError::NoResponse,
            consecutive: 1
        }]
    );
    assert_eq!(svc.state(), StateId::Unsafe);
    assert_eq!(hw.duty(), 0.0);
    assert_eq!(svc.snapshot().consecutive_sensor_failures, 1);
}

#[test]
fn manual_recover_is_ignored_while_healthy() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut hw, &mut sink);
    sink.clear();
    svc.handle_command(AppCommand::RecoverSensor, &mut sink).unwrap();

    // The read gate is untouched: a cycle 1 s later reads nothing.
    svc.tick(1000, &mut hw, &mut sink);
    assert_eq!(sensor.reads(), 1);
    assert!(sink.notable().is_empty());
}

// ── Heater current monitoring ─────────────────────────────────

#[test]
fn heater_without_current_latches_until_reset() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    hw.heater_broken = true;
    let mut sink = RecordingSink::new();

    // Cycle 0 turns the heater on; cycles 1 and 2 see no current.
    run_cycles(&mut svc, &mut hw, &mut sink, 0, 2 * CYCLE_MS);
    assert!(svc.snapshot().is_safe);
    assert_eq!(hw.duty(), 100.0);

    // Third commanded-on cycle without current latches the failure and
    // cuts the heater in the same cycle.
    sink.clear();
    svc.tick(3 * CYCLE_MS, &mut hw, &mut sink);
    assert_eq!(hw.duty(), 0.0);
    assert_eq!(
        sink.notable(),
        vec![
            &DryerEvent::HeaterFailure { consecutive: 3 },
            &DryerEvent::StateChanged {
                from: StateId::Normal,
                to: StateId::Unsafe
            },
            &DryerEvent::EnteredUnsafe {
                cause: SafetyFault::HeaterNoCurrent
            },
        ]
    );
    assert!(svc.snapshot().heater_failed);

    // Off cycles do not clear the latch.
    run_cycles(&mut svc, &mut hw, &mut sink, 4 * CYCLE_MS, 6 * CYCLE_MS);
    assert_eq!(hw.duty(), 0.0);
    assert_eq!(svc.state(), StateId::Unsafe);

    hw.heater_broken = false;
    svc.handle_command(AppCommand::ResetHeaterFault, &mut sink).unwrap();
    assert!(!svc.snapshot().heater_failed);
    svc.tick(7 * CYCLE_MS, &mut hw, &mut sink);
    assert_eq!(svc.state(), StateId::Normal);
    assert_eq!(hw.duty(), 100.0);
    assert!(svc.snapshot().is_safe);
}

#[test]
fn unplugged_current_sensor_is_not_a_fault() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    hw.current_unplugged = true;
    let mut sink = RecordingSink::new();

    run_cycles(&mut svc, &mut hw, &mut sink, 0, 10 * CYCLE_MS);

    assert!(hw.duties().iter().all(|d| *d == 100.0));
    let snap = svc.snapshot();
    assert!(snap.is_safe);
    assert!(!snap.heater_failed);
    assert_eq!(snap.current_sensor, CurrentSensorStatus::Disconnected);
    assert_eq!(snap.power_w, 0.0);
    assert_eq!(snap.energy_wh, 0.0);
    assert_eq!(
        sink.count(|e| matches!(e, DryerEvent::CurrentSensorWarning { .. })),
        1,
        "warning is edge-triggered"
    );
}

// ── Overshoot ─────────────────────────────────────────────────

#[test]
fn overshoot_cuts_heater_but_stays_safe() {
    let sensor = ScriptedSensor::at(49.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut hw, &mut sink);
    assert_eq!(hw.duty(), 0.0);
    assert_eq!(svc.state(), StateId::OvershootCutoff);
    assert!(svc.snapshot().is_safe);
    assert_eq!(
        sink.notable(),
        vec![&DryerEvent::StateChanged {
            from: StateId::Normal,
            to: StateId::OvershootCutoff
        }]
    );

    sensor.set_steady(Ok(sample(40.0)));
    svc.tick(CYCLE_MS, &mut hw, &mut sink);
    assert_eq!(svc.state(), StateId::Normal);
    assert_eq!(hw.duty(), 100.0);
    assert_eq!(svc.snapshot().total_unsafe_events, 0);
}

// ── Setpoint ──────────────────────────────────────────────────

#[test]
fn short_press_raises_setpoint_and_reseeds_pid() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    let mut changes = 0;
    for now in (0..300).step_by(10) {
        hw.button_pressed = now < 100;
        if svc.poll_button(now, &mut hw, &mut sink) {
            changes += 1;
        }
    }

    assert_eq!(changes, 1);
    assert_eq!(svc.setpoint(), 46.0);
    assert_eq!(svc.arbiter().pid().setpoint(), 46.0);
    assert_eq!(
        sink.events,
        vec![DryerEvent::SetpointChanged {
            from: 45.0,
            to: 46.0
        }]
    );

    svc.tick(300, &mut hw, &mut sink);
    assert_eq!(svc.snapshot().setpoint_c, 46.0);
}

#[test]
fn setpoint_command_validated() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut sink = RecordingSink::new();

    assert!(svc.handle_command(AppCommand::SetSetpoint(39.0), &mut sink).is_err());
    assert!(sink.events.is_empty());

    svc.handle_command(AppCommand::SetSetpoint(70.0), &mut sink).unwrap();
    assert_eq!(svc.setpoint(), 70.0);
    assert_eq!(sink.events.len(), 1);
}

// ── Log sink ──────────────────────────────────────────────────

/// Keeps the console line of every event the service emits.
#[derive(Default)]
struct RenderedLines(Vec<(Level, String)>);

impl EventSink for RenderedLines {
    fn emit(&mut self, event: &DryerEvent) {
        self.0.push(render(event));
    }
}

impl RenderedLines {
    fn has(&self, level: Level, text: &str) -> bool {
        self.0.iter().any(|(l, line)| *l == level && line == text)
    }
}

#[test]
fn fault_sequence_renders_console_lines() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    hw.heater_broken = true;
    let mut lines = RenderedLines::default();

    run_cycles(&mut svc, &mut hw, &mut lines, 0, 3 * CYCLE_MS);
    sensor.set_steady(Err(DecodeError::Timeout));
    run_cycles(&mut svc, &mut hw, &mut lines, 4 * CYCLE_MS, 5 * CYCLE_MS);

    assert!(lines.has(Level::Error, "HEATER | no current draw for 3 cycles, latched failed"));
    assert!(lines.has(Level::Info, "STATE | Normal -> Unsafe"));
    assert!(lines.has(
        Level::Error,
        "SAFETY | UNSAFE: heater draws no current, heater forced off"
    ));
    assert!(lines.has(
        Level::Warn,
        "SENSOR | read failed (communication timeout), 2 in a row"
    ));

    let (level, last) = lines.0.last().unwrap();
    assert_eq!(*level, Level::Info);
    assert!(last.starts_with("TELEM |"));
    assert!(last.contains("heater=0% OFF"));
    assert!(last.contains("safe=false"));
}

#[test]
fn log_sink_accepts_the_service_event_stream() {
    let sensor = ScriptedSensor::at(30.0);
    let mut svc = service(&sensor);
    let mut hw = MockHardware::new();
    hw.heater_broken = true;
    let mut sink = LogEventSink::new();

    run_cycles(&mut svc, &mut hw, &mut sink, 0, 4 * CYCLE_MS);
    svc.handle_command(AppCommand::SetSetpoint(50.0), &mut sink).unwrap();
    sink.emit(&DryerEvent::CurrentSensorWarning {
        status: CurrentSensorStatus::OverVoltage,
        voltage_v: 2.7,
    });
    assert!(!svc.snapshot().is_safe);
    assert_eq!(hw.duty(), 0.0);
}
