//! Task watchdog (TWDT) for the control loop.
//!
//! If the loop stops feeding for `watchdog_timeout_ms` the chip panics and
//! reboots.  The heater LEDC output comes back up at duty 0, so a hung
//! loop can never leave the cartridge powered.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::{info, warn};

pub struct Watchdog {
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    feeds: u64,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.  A failure is
    /// logged and leaves the watchdog inert rather than aborting start-up.
    #[cfg(target_os = "espidf")]
    pub fn new(timeout_ms: u32) -> Self {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: called once from the main task before the loop starts.
        let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
        if ret != ESP_OK {
            warn!("watchdog: reconfigure returned {ret} (may already be configured)");
        }

        // SAFETY: a null handle subscribes the current task.
        let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
        let subscribed = ret == ESP_OK;
        if subscribed {
            info!("watchdog: subscribed ({timeout_ms} ms timeout, panic on trigger)");
        } else {
            warn!("watchdog: failed to subscribe ({ret})");
        }
        Self { subscribed }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(timeout_ms: u32) -> Self {
        if timeout_ms == 0 {
            warn!("watchdog(sim): zero timeout, staying inert");
        } else {
            info!("watchdog(sim): {timeout_ms} ms timeout, no-op");
        }
        Self {
            subscribed: timeout_ms > 0,
            feeds: 0,
        }
    }

    /// Reset the countdown.  Call once per loop iteration.
    pub fn feed(&mut self) {
        if !self.subscribed {
            return;
        }
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: the current task is subscribed.
            unsafe {
                esp_task_wdt_reset();
            }
        }
        #[cfg(not(target_os = "espidf"))]
        {
            self.feeds += 1;
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Feeds since construction (host simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn feeds(&self) -> u64 {
        self.feeds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feeds_are_counted() {
        let mut wd = Watchdog::new(15_000);
        wd.feed();
        wd.feed();
        assert!(wd.is_subscribed());
        assert_eq!(wd.feeds(), 2);
    }

    #[test]
    fn inert_watchdog_ignores_feeds() {
        let mut wd = Watchdog::new(0);
        wd.feed();
        assert_eq!(wd.feeds(), 0);
    }
}
