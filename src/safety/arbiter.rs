//! Temperature/safety arbiter: the only writer of the heater command.
//!
//! Each cycle the supervisor folds sensor and heater health into the fault
//! mask, an active fault forces the FSM into `Unsafe` before it ticks, and
//! the resulting state decides whether the PID output reaches the heater.

use log::debug;

use super::SafetySupervisor;
use crate::config::SystemConfig;
use crate::control::pid::PidController;
use crate::fsm::context::FsmContext;
use crate::fsm::{Fsm, StateId, states};
use crate::sensors::SensorSample;

pub struct Arbiter {
    fsm: Fsm,
    ctx: FsmContext,
    supervisor: SafetySupervisor,
}

impl Arbiter {
    pub fn new(config: SystemConfig) -> Self {
        let mut fsm = Fsm::new(states::build_state_table(), StateId::Normal);
        let mut ctx = FsmContext::new(config);
        fsm.start(&mut ctx);
        Self {
            fsm,
            ctx,
            supervisor: SafetySupervisor::new(),
        }
    }

    /// Run one arbitration cycle.  Returns `(duty_percent, overall_safe)`.
    /// When not safe the duty is always 0.
    pub fn step(
        &mut self,
        sample: SensorSample,
        setpoint_c: f32,
        sensor_safe: bool,
        heater_safe: bool,
        now_ms: u32,
    ) -> (f32, bool) {
        self.ctx.inputs.temperature_c = sample.celsius();
        self.ctx.inputs.setpoint_c = setpoint_c;
        self.ctx.inputs.now_ms = now_ms;
        self.ctx.fault_flags = self.supervisor.evaluate(sensor_safe, heater_safe);

        if self.ctx.has_faults() {
            self.fsm.force_transition(StateId::Unsafe, &mut self.ctx);
        }
        self.fsm.tick(&mut self.ctx);

        let overall_safe = !self.ctx.has_faults();
        let duty = if overall_safe && self.fsm.current_state() == StateId::Normal {
            self.ctx.command.duty_percent
        } else {
            0.0
        };
        debug!(
            "arbiter: {} T={:.1} SP={:.1} duty={:.1}% faults=0b{:02b}",
            self.fsm.current_name(),
            self.ctx.inputs.temperature_c,
            setpoint_c,
            duty,
            self.ctx.fault_flags
        );
        (duty, overall_safe)
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn fault_flags(&self) -> u8 {
        self.ctx.fault_flags
    }

    pub fn pid(&self) -> &PidController {
        &self.ctx.pid
    }

    /// Mutable PID access for setpoint changes and live tuning.
    pub fn pid_mut(&mut self) -> &mut PidController {
        &mut self.ctx.pid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(temp_c: f32) -> SensorSample {
        SensorSample::new((temp_c * 10.0) as i16, 400)
    }

    #[test]
    fn normal_passes_pid_output() {
        let mut a = Arbiter::new(SystemConfig::default());
        let (duty, safe) = a.step(at(30.0), 45.0, true, true, 0);
        assert!(safe);
        assert_eq!(duty, 100.0);
        assert_eq!(a.state(), StateId::Normal);
    }

    #[test]
    fn sensor_unsafe_wins_same_cycle() {
        let mut a = Arbiter::new(SystemConfig::default());
        a.step(at(30.0), 45.0, true, true, 0);
        let (duty, safe) = a.step(at(30.0), 45.0, false, true, 5000);
        assert_eq!((duty, safe), (0.0, false));
        assert_eq!(a.state(), StateId::Unsafe);
    }

    #[test]
    fn heater_unsafe_wins_same_cycle() {
        let mut a = Arbiter::new(SystemConfig::default());
        let (duty, safe) = a.step(at(30.0), 45.0, true, false, 0);
        assert_eq!((duty, safe), (0.0, false));
    }

    #[test]
    fn overshoot_cuts_off_but_stays_safe() {
        let mut a = Arbiter::new(SystemConfig::default());
        let (duty, safe) = a.step(at(49.0), 45.0, true, true, 0);
        assert_eq!(duty, 0.0);
        assert!(safe);
        assert_eq!(a.state(), StateId::OvershootCutoff);
    }

    #[test]
    fn recovery_requires_both_inputs() {
        let mut a = Arbiter::new(SystemConfig::default());
        a.step(at(30.0), 45.0, false, false, 0);
        a.step(at(30.0), 45.0, true, false, 5000);
        assert_eq!(a.state(), StateId::Unsafe);
        let (duty, safe) = a.step(at(30.0), 45.0, true, true, 10_000);
        assert!(safe);
        assert!(duty > 0.0);
        assert_eq!(a.state(), StateId::Normal);
    }

    #[test]
    fn unsafe_resets_pid() {
        let mut a = Arbiter::new(SystemConfig::default());
        a.step(at(44.0), 45.0, true, true, 0);
        assert!(a.pid().integral() > 0.0);
        a.step(at(44.0), 45.0, false, true, 5000);
        assert_eq!(a.pid().integral(), 0.0);
    }
}
