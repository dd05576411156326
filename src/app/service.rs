//! Application service, the hexagonal core.
//!
//! [`DryerService`] owns the sensor health monitor, the heater-current
//! monitor, the arbiter and the button state machine.  It exposes a
//! clean, hardware-agnostic API.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!  SampleSource ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!   CurrentPort ──▶ │         DryerService          │
//!    ButtonPort ──▶ │ Monitor · Heater · Arbiter    │ ──▶ HeaterPort
//!                   └──────────────────────────────┘
//! ```
//!
//! ## Cycle ordering
//!
//! [`tick`](DryerService::tick) always runs: sensor acquisition → heater
//! check → arbitration (safety before PID) → heater command → snapshot and
//! events → recovery cadence.  A verdict reached in a cycle therefore
//! governs the command written in that same cycle.

use log::{info, warn};

use crate::config::SystemConfig;
use crate::drivers::button::ButtonController;
use crate::error::{Error, Result, SafetyFault};
use crate::fsm::StateId;
use crate::safety::arbiter::Arbiter;
use crate::safety::heater::HeaterCurrentMonitor;
use crate::sensors::current::{CurrentReading, CurrentSensorStatus};
use crate::sensors::monitor::{ReadOutcome, SensorMonitor};
use crate::sensors::SampleSource;

use super::commands::AppCommand;
use super::events::{CycleEvents, DryerEvent};
use super::ports::{ButtonPort, CurrentPort, EventSink, HeaterPort};
use super::snapshot::DryerSnapshot;

const MS_PER_HOUR: f32 = 3_600_000.0;

// ───────────────────────────────────────────────────────────────
// DryerService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct DryerService<S> {
    config: SystemConfig,
    sensor: SensorMonitor<S>,
    heater_monitor: HeaterCurrentMonitor,
    arbiter: Arbiter,
    button: ButtonController,
    setpoint_c: f32,
    snapshot: DryerSnapshot,
    events: CycleEvents,

    /// Duty written to the heater in the previous cycle; the current
    /// reading of this cycle was taken while it was applied.
    applied_duty: f32,
    current_status: CurrentSensorStatus,
    started_ms: Option<u32>,
    last_cycle_ms: Option<u32>,
    last_recovery_ms: u32,
    awaiting_recovery_read: bool,
    tick_count: u64,
}

impl<S: SampleSource> DryerService<S> {
    /// Construct the service.  Rejects invalid configuration.
    pub fn new(config: SystemConfig, source: S) -> Result<Self> {
        config.validate()?;
        let sensor = SensorMonitor::new(source, &config);
        let heater_monitor = HeaterCurrentMonitor::new(&config);
        let button = ButtonController::new(&config);
        let arbiter = Arbiter::new(config.clone());
        let snapshot = DryerSnapshot::initial(&config);
        info!(
            "DryerService ready: setpoint {:.0}°C, cycle {} ms",
            config.setpoint_default_c, config.control_loop_interval_ms
        );
        Ok(Self {
            setpoint_c: config.setpoint_default_c,
            sensor,
            heater_monitor,
            arbiter,
            button,
            snapshot,
            events: CycleEvents::new(),
            applied_duty: 0.0,
            current_status: CurrentSensorStatus::Ok,
            started_ms: None,
            last_cycle_ms: None,
            last_recovery_ms: 0,
            awaiting_recovery_read: false,
            tick_count: 0,
            config,
        })
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// True once the control interval has elapsed since the last cycle.
    pub fn control_due(&self, now_ms: u32) -> bool {
        self.last_cycle_ms
            .is_none_or(|last| now_ms.wrapping_sub(last) >= self.config.control_loop_interval_ms)
    }

    /// Run one full control cycle.
    ///
    /// The `hw` parameter satisfies **both** [`CurrentPort`] and
    /// [`HeaterPort`], which avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u32,
        hw: &mut (impl CurrentPort + HeaterPort),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let prev_state = self.arbiter.state();
        let was_safe = self.snapshot.is_safe;

        // 1. Sensor acquisition
        let sample = self.sensor.update(now_ms);
        self.record_sensor_outcome(now_ms);

        // 2. Heater-current check against the duty that was applied
        let current = hw.read_current();
        self.record_current_status(&current);
        let connected = current.status != CurrentSensorStatus::Disconnected;
        let commanded_on = connected && self.applied_duty > self.config.heater_active_duty_percent;
        let heater = self.heater_monitor.check(current.power_w, commanded_on);
        if self.heater_monitor.tripped_this_check() {
            self.events.push(DryerEvent::HeaterFailure {
                consecutive: heater.consecutive_current_faults,
            });
        }

        // 3. Arbitration: safety verdict first, PID only in Normal
        let (duty, overall_safe) = self.arbiter.step(
            sample,
            self.setpoint_c,
            self.sensor.is_safe(),
            self.heater_monitor.is_safe(),
            now_ms,
        );

        // 4. Apply the heater command
        hw.set_heater_duty(duty);
        self.applied_duty = duty;

        // 5. Snapshot and events
        let new_state = self.arbiter.state();
        if new_state != prev_state {
            self.events.push(DryerEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
        if was_safe && !overall_safe {
            self.snapshot.total_unsafe_events += 1;
            let cause = if self.sensor.is_safe() {
                SafetyFault::HeaterNoCurrent
            } else {
                SafetyFault::SensorLost
            };
            warn!("Entered UNSAFE: {cause}");
            self.events.push(DryerEvent::EnteredUnsafe { cause });
        }

        let dt_ms = self.last_cycle_ms.map_or(0, |last| now_ms.wrapping_sub(last));
        self.last_cycle_ms = Some(now_ms);
        self.refresh_snapshot(now_ms, &current, dt_ms, duty, overall_safe);
        self.events.push(DryerEvent::Telemetry(self.snapshot.clone()));
        self.events.flush(sink);

        // 6. Recovery cadence: the next update reads immediately
        if !self.sensor.is_safe()
            && now_ms.wrapping_sub(self.last_recovery_ms) >= self.config.sensor_recovery_interval_ms
        {
            self.last_recovery_ms = now_ms;
            if self.sensor.recovery_attempt() {
                self.awaiting_recovery_read = true;
            }
        }
    }

    /// Poll the button.  Call much more often than [`tick`](Self::tick).
    /// Returns true if the setpoint changed.
    pub fn poll_button(
        &mut self,
        now_ms: u32,
        button: &mut impl ButtonPort,
        sink: &mut impl EventSink,
    ) -> bool {
        let pressed = button.is_pressed();
        let outcome = self.button.poll(now_ms, pressed, self.setpoint_c);
        if outcome.changed {
            self.change_setpoint(outcome.setpoint, sink);
        }
        outcome.changed
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) -> Result<()> {
        match cmd {
            AppCommand::RecoverSensor => {
                if self.sensor.recovery_attempt() {
                    self.awaiting_recovery_read = true;
                }
            }
            AppCommand::ResetHeaterFault => {
                self.heater_monitor.reset();
                self.snapshot.heater_failed = false;
                info!("Heater fault reset by command");
            }
            AppCommand::SetSetpoint(setpoint_c) => {
                if !(self.config.setpoint_min_c..=self.config.setpoint_max_c).contains(&setpoint_c) {
                    return Err(Error::Config("setpoint outside the selectable range"));
                }
                if setpoint_c != self.setpoint_c {
                    self.change_setpoint(setpoint_c, sink);
                }
            }
            AppCommand::UpdateTunings { kp, ki, kd } => {
                if !(kp.is_finite() && ki.is_finite() && kd.is_finite()) {
                    return Err(Error::Config("PID gains must be finite"));
                }
                self.arbiter.pid_mut().set_tunings(kp, ki, kd);
                info!("PID tunings updated: Kp={kp} Ki={ki} Kd={kd}");
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn snapshot(&self) -> &DryerSnapshot {
        &self.snapshot
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint_c
    }

    pub fn state(&self) -> StateId {
        self.arbiter.state()
    }

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Total control cycles executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn change_setpoint(&mut self, setpoint_c: f32, sink: &mut impl EventSink) {
        let from = self.setpoint_c;
        self.setpoint_c = setpoint_c;
        let pid = self.arbiter.pid_mut();
        pid.set_setpoint(setpoint_c);
        pid.reset();
        self.snapshot.setpoint_c = setpoint_c;
        info!("Setpoint {from:.0}°C -> {setpoint_c:.0}°C");
        sink.emit(&DryerEvent::SetpointChanged {
            from,
            to: setpoint_c,
        });
    }

    fn record_sensor_outcome(&mut self, now_ms: u32) {
        match self.sensor.last_outcome() {
            ReadOutcome::Skipped => {}
            ReadOutcome::Fresh => {
                if self.awaiting_recovery_read {
                    self.awaiting_recovery_read = false;
                    info!("Sensor recovered");
                    self.events.push(DryerEvent::SensorRecovered);
                }
            }
            ReadOutcome::Failed(error) | ReadOutcome::Tripped(error) => {
                self.snapshot.total_sensor_failures += 1;
                self.events.push(DryerEvent::SensorFailure {
                    error,
                    consecutive: self.sensor.health().consecutive_failures,
                });
                if matches!(self.sensor.last_outcome(), ReadOutcome::Tripped(_)) {
                    self.awaiting_recovery_read = false;
                    self.last_recovery_ms = now_ms;
                }
            }
        }
    }

    fn record_current_status(&mut self, current: &CurrentReading) {
        if current.status == self.current_status {
            return;
        }
        self.current_status = current.status;
        match current.status {
            CurrentSensorStatus::Ok => info!("Current sensor back to normal"),
            CurrentSensorStatus::Disconnected => {
                warn!(
                    "Current sensor disconnected ({:.2} V), heater check suspended",
                    current.voltage_v
                );
            }
            CurrentSensorStatus::OverVoltage => {
                warn!("Current sensor output high ({:.2} V)", current.voltage_v);
            }
        }
        if current.status != CurrentSensorStatus::Ok {
            self.events.push(DryerEvent::CurrentSensorWarning {
                status: current.status,
                voltage_v: current.voltage_v,
            });
        }
    }

    fn refresh_snapshot(
        &mut self,
        now_ms: u32,
        current: &CurrentReading,
        dt_ms: u32,
        duty: f32,
        overall_safe: bool,
    ) {
        let started = *self.started_ms.get_or_insert(now_ms);
        let sample = self.sensor.last_sample();
        let health = self.sensor.health();
        let power_w = if current.status == CurrentSensorStatus::Disconnected {
            0.0
        } else {
            current.power_w
        };

        let s = &mut self.snapshot;
        s.temperature_c = sample.celsius();
        s.humidity_percent = sample.humidity_percent();
        s.setpoint_c = self.setpoint_c;
        s.heater_duty_percent = duty;
        s.heater_on = duty > self.config.heater_active_duty_percent;
        s.is_safe = overall_safe;
        s.heater_failed = !self.heater_monitor.is_safe();
        s.uptime_s = now_ms.wrapping_sub(started) / 1000;
        s.power_w = power_w;
        s.energy_wh += power_w * dt_ms as f32 / MS_PER_HOUR;
        s.consecutive_sensor_failures = health.consecutive_failures;
        s.arbiter_state = self.arbiter.state();
        s.sensor_status.clone_from(&health.last_error_description);
        s.current_sensor = current.status;
        s.fault_flags = self.arbiter.fault_flags();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::sensors::SensorSample;

    struct Fixed(core::result::Result<SensorSample, DecodeError>);

    impl SampleSource for Fixed {
        fn read_sample(&mut self) -> core::result::Result<SensorSample, DecodeError> {
            self.0
        }
    }

    #[derive(Default)]
    struct Hw {
        duty: f32,
        volts: f32,
    }

    impl CurrentPort for Hw {
        fn read_current(&mut self) -> CurrentReading {
            CurrentReading::from_voltage(self.volts, 12.0)
        }
    }

    impl HeaterPort for Hw {
        fn set_heater_duty(&mut self, duty_percent: f32) {
            self.duty = duty_percent;
        }
    }

    struct Null;

    impl EventSink for Null {
        fn emit(&mut self, _event: &DryerEvent) {}
    }

    #[test]
    fn invalid_config_rejected() {
        let config = SystemConfig {
            dht_poll_interval_us: 50,
            ..SystemConfig::default()
        };
        assert!(DryerService::new(config, Fixed(Ok(SensorSample::default()))).is_err());
    }

    #[test]
    fn control_due_follows_interval() {
        let mut svc = DryerService::new(
            SystemConfig::default(),
            Fixed(Ok(SensorSample::new(300, 400))),
        )
        .unwrap();
        assert!(svc.control_due(0));
        let mut hw = Hw {
            volts: 2.5,
            ..Hw::default()
        };
        svc.tick(0, &mut hw, &mut Null);
        assert!(!svc.control_due(4999));
        assert!(svc.control_due(5000));
    }

    #[test]
    fn energy_accumulates_in_watt_hours() {
        let mut svc = DryerService::new(
            SystemConfig::default(),
            Fixed(Ok(SensorSample::new(300, 400))),
        )
        .unwrap();
        // 1 A at 12 V.
        let mut hw = Hw {
            volts: 2.5 - 0.185,
            ..Hw::default()
        };
        svc.tick(0, &mut hw, &mut Null);
        svc.tick(3_600_000, &mut hw, &mut Null);
        assert!((svc.snapshot().energy_wh - 12.0).abs() < 0.05);
        assert_eq!(svc.snapshot().uptime_s, 3600);
    }

    #[test]
    fn set_setpoint_rejects_out_of_range() {
        let mut svc =
            DryerService::new(SystemConfig::default(), Fixed(Ok(SensorSample::default()))).unwrap();
        assert!(svc.handle_command(AppCommand::SetSetpoint(95.0), &mut Null).is_err());
        assert!(svc.handle_command(AppCommand::SetSetpoint(60.0), &mut Null).is_ok());
        assert_eq!(svc.setpoint(), 60.0);
        assert_eq!(svc.arbiter().pid().setpoint(), 60.0);
    }

    #[test]
    fn update_tunings_reaches_pid() {
        let mut svc =
            DryerService::new(SystemConfig::default(), Fixed(Ok(SensorSample::default()))).unwrap();
        svc.handle_command(AppCommand::UpdateTunings { kp: 10.0, ki: 0.1, kd: 1.0 }, &mut Null)
            .unwrap();
        assert_eq!(svc.arbiter().pid().tunings(), (10.0, 0.1, 1.0));
        assert!(
            svc.handle_command(
                AppCommand::UpdateTunings { kp: f32::NAN, ki: 0.0, kd: 0.0 },
                &mut Null
            )
            .is_err()
        );
    }
}
