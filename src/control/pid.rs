//! PID controller for the heater duty cycle.
//!
//! Positional PID with derivative on measurement and conditional
//! integration.  Output is a heater duty in percent.
//!
//! ## Sample-time gate
//!
//! `compute` only recomputes once `sample_time_ms` has elapsed since the last
//! computation; earlier calls return the previous output unchanged.  The
//! first call after construction or [`reset`](PidController::reset) always
//! computes, using the nominal sample time as `dt`.
//!
//! ## Anti-windup
//!
//! The integral only advances when the tentative output is not already
//! saturated in the direction the error pushes, and is clamped to
//! ±2× the output range.

use crate::config::SystemConfig;

/// Smallest `dt` used in a computation (seconds).
const MIN_DT_S: f32 = 0.001;

/// Last computed P, I and D contributions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidTerms {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f32,
    ki: f32,
    kd: f32,
    setpoint: f32,
    integral: f32,
    integral_max: f32,
    last_pv: Option<f32>,
    last_output: f32,
    last_time_ms: Option<u32>,
    sample_time_ms: u32,
    output_min: f32,
    output_max: f32,
    enabled: bool,
    terms: PidTerms,
}

impl PidController {
    pub fn new(kp: f32, ki: f32, kd: f32, output_min: f32, output_max: f32, sample_time_ms: u32) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint: 0.0,
            integral: 0.0,
            integral_max: (output_max - output_min) * 2.0,
            last_pv: None,
            last_output: 0.0,
            last_time_ms: None,
            sample_time_ms,
            output_min,
            output_max,
            enabled: true,
            terms: PidTerms::default(),
        }
    }

    /// Build from the configured gains and limits, targeting the default
    /// setpoint.
    pub fn from_config(config: &SystemConfig) -> Self {
        let mut pid = Self::new(
            config.pid_kp,
            config.pid_ki,
            config.pid_kd,
            config.pid_output_min,
            config.pid_output_max,
            config.pid_sample_time_ms,
        );
        pid.set_setpoint(config.setpoint_default_c);
        pid
    }

    /// Update setpoint
    pub fn set_setpoint(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    /// Replace the gains.  The integral and the sample-time gate are kept.
    pub fn set_tunings(&mut self, kp: f32, ki: f32, kd: f32) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    /// Compute the output for `pv` at time `now_ms`.
    pub fn compute(&mut self, pv: f32, now_ms: u32) -> f32 {
        if !self.enabled {
            return 0.0;
        }

        let elapsed_ms = match self.last_time_ms {
            Some(last) => {
                let elapsed = now_ms.wrapping_sub(last);
                if elapsed < self.sample_time_ms {
                    return self.last_output;
                }
                elapsed
            }
            None => self.sample_time_ms,
        };
        self.last_time_ms = Some(now_ms);

        let dt = (elapsed_ms as f32 / 1000.0).max(MIN_DT_S);
        let error = self.setpoint - pv;

        let p = self.kp * error;
        let d = match self.last_pv {
            Some(last) => -self.kd * (pv - last) / dt,
            None => 0.0,
        };
        let mut i = self.ki * self.integral;

        let tentative = p + i + d;
        let saturated_high = tentative >= self.output_max && error > 0.0;
        let saturated_low = tentative <= self.output_min && error < 0.0;
        if !(saturated_high || saturated_low) {
            self.integral = (self.integral + error * dt).clamp(-self.integral_max, self.integral_max);
            i = self.ki * self.integral;
        }

        let output = (p + i + d).clamp(self.output_min, self.output_max);

        self.last_output = output;
        self.last_pv = Some(pv);
        self.terms = PidTerms { p, i, d };
        output
    }

    /// Reset controller state.  Gains and setpoint are kept; the next
    /// `compute` runs immediately.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_pv = None;
        self.last_output = 0.0;
        self.last_time_ms = None;
        self.terms = PidTerms::default();
    }

    /// Disabling freezes the integral and makes `compute` return 0.
    /// Enabling resets.
    pub fn enable(&mut self, enable: bool) {
        self.enabled = enable;
        if enable {
            self.reset();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn integral_max(&self) -> f32 {
        self.integral_max
    }

    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    pub fn terms(&self) -> PidTerms {
        self.terms
    }

    pub fn tunings(&self) -> (f32, f32, f32) {
        (self.kp, self.ki, self.kd)
    }
}
