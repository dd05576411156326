//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  NORMAL ──[T > setpoint + margin]──▶ OVERSHOOT_CUTOFF
//!     ▲                                     │
//!     └────────[T back within margin]───────┘
//!
//!  Any state ──[safety fault]──▶ UNSAFE ──[faults cleared]──▶ NORMAL
//!                                   │                           or
//!                                   └──[still overshooting]──▶ OVERSHOOT_CUTOFF
//! ```
//!
//! `Unsafe` is normally entered through `Fsm::force_transition` before the
//! tick; the update guards below catch the same condition if the caller
//! only ticks.

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use log::{error, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Normal
        StateDescriptor {
            id: StateId::Normal,
            name: "Normal",
            on_enter: Some(normal_enter),
            on_exit: None,
            on_update: normal_update,
        },
        // Index 1: OvershootCutoff
        StateDescriptor {
            id: StateId::OvershootCutoff,
            name: "OvershootCutoff",
            on_enter: Some(cutoff_enter),
            on_exit: None,
            on_update: cutoff_update,
        },
        // Index 2: Unsafe
        StateDescriptor {
            id: StateId::Unsafe,
            name: "Unsafe",
            on_enter: Some(unsafe_enter),
            on_exit: Some(unsafe_exit),
            on_update: unsafe_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  NORMAL state: PID output drives the heater
// ═══════════════════════════════════════════════════════════════════════════

fn normal_enter(ctx: &mut FsmContext) {
    info!(
        "NORMAL: regulating to {:.1}°C (cutoff above {:.1}°C)",
        ctx.inputs.setpoint_c,
        ctx.overshoot_limit_c()
    );
    // Entered mid-cycle on a transition: produce this cycle's command now.
    if ctx.total_ticks > 0 {
        ctx.run_pid();
    }
}

fn normal_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.has_faults() {
        return Some(StateId::Unsafe);
    }

    if ctx.overshooting() {
        return Some(StateId::OvershootCutoff);
    }

    ctx.run_pid();
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  OVERSHOOT_CUTOFF state: too hot, heater off until back within margin
// ═══════════════════════════════════════════════════════════════════════════

fn cutoff_enter(ctx: &mut FsmContext) {
    ctx.heater_off();
    warn!(
        "OVERSHOOT: {:.1}°C > {:.1}°C, heater cut off",
        ctx.inputs.temperature_c,
        ctx.overshoot_limit_c()
    );
}

fn cutoff_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.has_faults() {
        return Some(StateId::Unsafe);
    }

    if !ctx.overshooting() {
        info!(
            "OVERSHOOT: cleared at {:.1}°C after {} cycles, resuming control",
            ctx.inputs.temperature_c, ctx.ticks_in_state
        );
        return Some(StateId::Normal);
    }

    ctx.heater_off();
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNSAFE state: sensor or heater fault, heater off
// ═══════════════════════════════════════════════════════════════════════════

fn unsafe_enter(ctx: &mut FsmContext) {
    ctx.heater_off();
    error!(
        "UNSAFE: heater disabled, fault_flags=0b{:08b}",
        ctx.fault_flags
    );
}

fn unsafe_exit(ctx: &mut FsmContext) {
    info!(
        "UNSAFE: faults cleared after {} cycles, leaving safe shutdown",
        ctx.ticks_in_state
    );
}

fn unsafe_update(ctx: &mut FsmContext) -> Option<StateId> {
    // Stay until ALL faults are cleared
    if ctx.has_faults() {
        ctx.heater_off();
        return None;
    }

    if ctx.overshooting() {
        Some(StateId::OvershootCutoff)
    } else {
        Some(StateId::Normal)
    }
}
