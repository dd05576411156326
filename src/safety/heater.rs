//! Heater-current monitor.
//!
//! Detects a heater that is commanded on but draws no measurable power
//! (open cartridge, blown fuse, failed MOSFET).  Purely cycle-counted, no
//! timers: each control cycle feeds one `check`.

use log::{error, warn};
use serde::Serialize;

use crate::config::SystemConfig;

/// Heater health as seen by the arbiter and the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HeaterHealth {
    pub consecutive_current_faults: u32,
    pub heater_failed: bool,
}

pub struct HeaterCurrentMonitor {
    min_power_w: f32,
    fault_threshold: u32,
    health: HeaterHealth,
    tripped: bool,
}

impl HeaterCurrentMonitor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            min_power_w: config.heater_min_power_w,
            fault_threshold: config.heater_fault_threshold.max(1),
            health: HeaterHealth::default(),
            tripped: false,
        }
    }

    /// Evaluate one cycle.  Only "commanded on and below the power
    /// threshold" counts; anything else resets the counter.  Once
    /// `heater_failed` latches it stays set until [`reset`](Self::reset).
    pub fn check(&mut self, measured_power_w: f32, heater_commanded_on: bool) -> HeaterHealth {
        self.tripped = false;

        if heater_commanded_on && measured_power_w < self.min_power_w {
            self.health.consecutive_current_faults =
                self.health.consecutive_current_faults.saturating_add(1);
            warn!(
                "heater: commanded on but {:.2} W < {:.2} W ({}/{})",
                measured_power_w,
                self.min_power_w,
                self.health.consecutive_current_faults,
                self.fault_threshold
            );

            if !self.health.heater_failed
                && self.health.consecutive_current_faults >= self.fault_threshold
            {
                self.health.heater_failed = true;
                self.tripped = true;
                error!("heater: FAILURE latched, no current draw while commanded on");
            }
        } else {
            self.health.consecutive_current_faults = 0;
        }

        self.health
    }

    /// Clear the latch and the counter (operator acknowledged the fault).
    pub fn reset(&mut self) {
        if self.health.heater_failed {
            warn!("heater: failure latch reset");
        }
        self.health = HeaterHealth::default();
        self.tripped = false;
    }

    /// True if the most recent `check` latched the failure.
    pub fn tripped_this_check(&self) -> bool {
        self.tripped
    }

    pub fn is_safe(&self) -> bool {
        !self.health.heater_failed
    }

    pub fn health(&self) -> HeaterHealth {
        self.health
    }
}
