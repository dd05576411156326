//! Safety supervisor.
//!
//! The supervisor runs **every control cycle before the arbiter FSM** and
//! folds the two health verdicts into a fault bitmask in
//! `FsmContext.fault_flags`.  The FSM state handlers check this mask to
//! decide whether to transition to `Unsafe`.
//!
//! ## Fault lifecycle
//!
//! 1. A monitor latches unhealthy (sensor lost, heater draws no current).
//! 2. The supervisor sets the corresponding bit in `fault_flags`.
//! 3. The arbiter forces `Unsafe`; `unsafe_enter` zeroes the heater.
//! 4. Each cycle in `Unsafe` the supervisor re-evaluates.  The bit only
//!    clears once the owning monitor has been explicitly recovered or reset.
//! 5. When `fault_flags == 0`, `unsafe_update` leaves `Unsafe`.
//!
//! Both faults may be active at once; the system does not leave `Unsafe`
//! until *every* fault is resolved.

pub mod arbiter;
pub mod heater;

use crate::error::SafetyFault;
use log::{error, info};

/// Safety supervisor.
#[derive(Debug, Default)]
pub struct SafetySupervisor {
    /// Latched fault bitmask.
    faults: u8,
}

impl SafetySupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the health verdicts for this cycle.
    /// Returns the updated fault bitmask.
    pub fn evaluate(&mut self, sensor_safe: bool, heater_safe: bool) -> u8 {
        self.eval_fault(SafetyFault::SensorLost, !sensor_safe);
        self.eval_fault(SafetyFault::HeaterNoCurrent, !heater_safe);
        self.faults
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit based on a boolean condition.
    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("SAFETY FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
