//! Polled, debounced setpoint button with single-step and fast-repeat.
//!
//! ## Hardware
//!
//! Active-low momentary switch with internal pull-up.  The caller samples
//! the raw level (already inverted to "pressed = true") every few
//! milliseconds and feeds it to [`ButtonController::poll`], which runs the
//! debounce and the gesture state machine.
//!
//! ## Gestures
//!
//! | Gesture                     | Condition                                  | Increment        |
//! |-----------------------------|--------------------------------------------|------------------|
//! | Short press                 | Released before the hold threshold         | +single on release |
//! | Hold                        | Held past the hold threshold               | +fast at once, then +fast every repeat interval |
//! | Late release (sparse polls) | Released past the threshold, never repeated | +fast on release |
//!
//! Increments wrap: a value above the maximum restarts at the minimum.
//! All durations are measured between debounced edges.

use log::{debug, info};

use crate::config::SystemConfig;

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonOutcome {
    /// True if this poll changed the setpoint.
    pub changed: bool,
    /// The (possibly unchanged) setpoint.
    pub setpoint: f32,
}

/// Gesture state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    PressedWaiting { since_ms: u32 },
    FastRepeat { since_ms: u32, last_increment_ms: u32 },
}

/// Button timing and setpoint stepping parameters.
#[derive(Debug, Clone, Copy)]
struct ButtonTiming {
    debounce_ms: u32,
    hold_threshold_ms: u32,
    fast_repeat_ms: u32,
    step_single_c: f32,
    step_fast_c: f32,
    min_c: f32,
    max_c: f32,
}

pub struct ButtonController {
    timing: ButtonTiming,
    raw: bool,
    last_raw_change_ms: u32,
    debounced: bool,
    phase: Phase,
}

impl ButtonController {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            timing: ButtonTiming {
                debounce_ms: config.button_debounce_ms,
                hold_threshold_ms: config.button_hold_threshold_ms,
                fast_repeat_ms: config.button_fast_repeat_ms.max(1),
                step_single_c: config.setpoint_step_single_c,
                step_fast_c: config.setpoint_step_fast_c,
                min_c: config.setpoint_min_c,
                max_c: config.setpoint_max_c,
            },
            raw: false,
            last_raw_change_ms: 0,
            debounced: false,
            phase: Phase::Idle,
        }
    }

    /// Feed one raw sample.  `raw_pressed` is true while the switch is
    /// closed.  Returns the setpoint after any increment this poll caused.
    pub fn poll(&mut self, now_ms: u32, raw_pressed: bool, setpoint: f32) -> ButtonOutcome {
        let unchanged = ButtonOutcome {
            changed: false,
            setpoint,
        };

        match self.debounce(now_ms, raw_pressed) {
            Some(true) => {
                self.phase = Phase::PressedWaiting { since_ms: now_ms };
                debug!("button: pressed");
                unchanged
            }
            Some(false) => self.on_release(now_ms, setpoint),
            None if self.debounced => self.on_held(now_ms, setpoint),
            None => unchanged,
        }
    }

    /// True while the debounced level is pressed.
    pub fn is_pressed(&self) -> bool {
        self.debounced
    }

    /// True while fast-repeat is active.
    pub fn is_fast_repeating(&self) -> bool {
        matches!(self.phase, Phase::FastRepeat { .. })
    }

    /// Returns `Some(new_level)` when the debounced level changes.
    fn debounce(&mut self, now_ms: u32, raw_pressed: bool) -> Option<bool> {
        if raw_pressed != self.raw {
            self.raw = raw_pressed;
            self.last_raw_change_ms = now_ms;
        }
        let stable = now_ms.wrapping_sub(self.last_raw_change_ms) >= self.timing.debounce_ms;
        if stable && self.debounced != self.raw {
            self.debounced = self.raw;
            return Some(self.debounced);
        }
        None
    }

    fn on_release(&mut self, now_ms: u32, setpoint: f32) -> ButtonOutcome {
        let phase = core::mem::replace(&mut self.phase, Phase::Idle);
        match phase {
            Phase::PressedWaiting { since_ms } => {
                let held_ms = now_ms.wrapping_sub(since_ms);
                let (step, label) = if held_ms < self.timing.hold_threshold_ms {
                    (self.timing.step_single_c, "short press")
                } else {
                    (self.timing.step_fast_c, "long press")
                };
                let setpoint = self.step(setpoint, step);
                info!("button: {label} ({held_ms} ms) -> {setpoint:.0}°C");
                ButtonOutcome {
                    changed: true,
                    setpoint,
                }
            }
            Phase::FastRepeat { since_ms, .. } => {
                debug!(
                    "button: fast repeat ended after {} ms at {:.0}°C",
                    now_ms.wrapping_sub(since_ms),
                    setpoint
                );
                ButtonOutcome {
                    changed: false,
                    setpoint,
                }
            }
            Phase::Idle => ButtonOutcome {
                changed: false,
                setpoint,
            },
        }
    }

    fn on_held(&mut self, now_ms: u32, setpoint: f32) -> ButtonOutcome {
        match self.phase {
            Phase::PressedWaiting { since_ms }
                if now_ms.wrapping_sub(since_ms) >= self.timing.hold_threshold_ms =>
            {
                self.phase = Phase::FastRepeat {
                    since_ms,
                    last_increment_ms: now_ms,
                };
                let setpoint = self.step(setpoint, self.timing.step_fast_c);
                info!("button: fast repeat started -> {setpoint:.0}°C");
                ButtonOutcome {
                    changed: true,
                    setpoint,
                }
            }
            Phase::FastRepeat {
                since_ms,
                last_increment_ms,
            } if now_ms.wrapping_sub(last_increment_ms) >= self.timing.fast_repeat_ms => {
                self.phase = Phase::FastRepeat {
                    since_ms,
                    last_increment_ms: now_ms,
                };
                let setpoint = self.step(setpoint, self.timing.step_fast_c);
                debug!("button: fast repeat -> {setpoint:.0}°C");
                ButtonOutcome {
                    changed: true,
                    setpoint,
                }
            }
            _ => ButtonOutcome {
                changed: false,
                setpoint,
            },
        }
    }

    fn step(&self, setpoint: f32, by: f32) -> f32 {
        let next = setpoint + by;
        if next > self.timing.max_c {
            self.timing.min_c
        } else {
            next
        }
    }
}
