//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to: the inputs for this control cycle, the heater command output,
//! the PID that produces it, configuration and the safety fault bitmask.

use crate::config::SystemConfig;
use crate::control::pid::PidController;

// ---------------------------------------------------------------------------
// Inputs (read-only to state handlers; written by the arbiter)
// ---------------------------------------------------------------------------

/// What the arbiter knows at the start of a control cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArbiterInputs {
    /// Last good enclosure temperature (°C).
    pub temperature_c: f32,
    /// Current target temperature (°C).
    pub setpoint_c: f32,
    /// Monotonic time of this cycle (milliseconds).
    pub now_ms: u32,
}

// ---------------------------------------------------------------------------
// Output (written by state handlers; applied by the service)
// ---------------------------------------------------------------------------

/// The single heater command.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeaterCommand {
    /// PWM duty, 0 – 100 %.
    pub duty_percent: f32,
}

impl HeaterCommand {
    /// Heater off.
    pub fn off() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,

    // -- Inputs --
    pub inputs: ArbiterInputs,

    // -- Output --
    pub command: HeaterCommand,

    // -- Control --
    pub pid: PidController,

    // -- Configuration --
    pub config: SystemConfig,

    // -- Safety --
    /// Accumulated safety fault bitmask (see `SafetyFault::mask()`).
    pub fault_flags: u8,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        let pid = PidController::from_config(&config);
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            inputs: ArbiterInputs {
                setpoint_c: config.setpoint_default_c,
                ..ArbiterInputs::default()
            },
            command: HeaterCommand::off(),
            pid,
            config,
            fault_flags: 0,
        }
    }

    /// Returns `true` if **any** safety fault is active.
    pub fn has_faults(&self) -> bool {
        self.fault_flags != 0
    }

    /// Temperature above which the heater is cut off this cycle.
    pub fn overshoot_limit_c(&self) -> f32 {
        self.inputs.setpoint_c + self.config.overshoot_margin_c
    }

    /// True when the enclosure is past the overshoot limit.
    pub fn overshooting(&self) -> bool {
        self.inputs.temperature_c > self.overshoot_limit_c()
    }

    /// Run the PID against the current inputs and store the result.
    pub fn run_pid(&mut self) {
        self.pid.set_setpoint(self.inputs.setpoint_c);
        self.command.duty_percent = self.pid.compute(self.inputs.temperature_c, self.inputs.now_ms);
    }

    /// Zero the command and clear PID history.
    pub fn heater_off(&mut self) {
        self.command = HeaterCommand::off();
        self.pid.reset();
    }
}
