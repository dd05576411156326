//! Sensor health monitor.
//!
//! Wraps a [`SampleSource`] with a read-interval gate, consecutive-failure
//! counting and a latched safe flag.
//!
//! ## Latch lifecycle
//!
//! 1. Every failed read increments `consecutive_failures`; a good read
//!    resets it to zero.
//! 2. When the counter reaches the configured maximum, `is_safe` latches
//!    false.  The transition is logged once, not on every later failure.
//! 3. A good read does **not** clear the latch.  Only
//!    [`recovery_attempt`](SensorMonitor::recovery_attempt) does, and it
//!    puts the monitor on probation: the next failure re-trips immediately.
//!
//! [`update`](SensorMonitor::update) always returns the last good sample so
//! consumers never special-case "no data"; they must consult
//! [`is_safe`](SensorMonitor::is_safe) separately.

use heapless::String;
use log::{error, info, warn};
use serde::Serialize;

use super::{SampleSource, SensorSample};
use crate::config::SystemConfig;
use crate::error::DecodeError;

/// Capacity of the stored error description.
pub const STATUS_TEXT_CAP: usize = 64;

/// Health record exposed to the arbiter and the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorHealth {
    pub consecutive_failures: u32,
    pub is_safe: bool,
    /// Description of the most recent failure ("no error" until one occurs).
    pub last_error_description: String<STATUS_TEXT_CAP>,
}

impl Default for SensorHealth {
    fn default() -> Self {
        Self {
            consecutive_failures: 0,
            is_safe: true,
            last_error_description: status_text("no error"),
        }
    }
}

/// What the most recent [`SensorMonitor::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The read interval had not elapsed; nothing was read.
    Skipped,
    /// A fresh sample was cached.
    Fresh,
    /// The read failed; safety state unchanged.
    Failed(DecodeError),
    /// The read failed and this failure latched the monitor unsafe.
    Tripped(DecodeError),
}

pub struct SensorMonitor<S> {
    source: S,
    read_interval_ms: u32,
    max_failures: u32,
    last_read_ms: Option<u32>,
    last_good: SensorSample,
    health: SensorHealth,
    /// Set by recovery; any failure before the next good read re-trips.
    on_probation: bool,
    last_outcome: ReadOutcome,
}

impl<S: SampleSource> SensorMonitor<S> {
    pub fn new(source: S, config: &SystemConfig) -> Self {
        Self {
            source,
            read_interval_ms: config.sensor_read_interval_ms,
            max_failures: config.max_consecutive_sensor_errors.max(1),
            last_read_ms: None,
            last_good: SensorSample::default(),
            health: SensorHealth::default(),
            on_probation: false,
            last_outcome: ReadOutcome::Skipped,
        }
    }

    /// Read the sensor if the read interval has elapsed and return the last
    /// good sample.  The first call always reads.
    pub fn update(&mut self, now_ms: u32) -> SensorSample {
        if let Some(last) = self.last_read_ms {
            if now_ms.wrapping_sub(last) < self.read_interval_ms {
                self.last_outcome = ReadOutcome::Skipped;
                return self.last_good;
            }
        }
        self.last_read_ms = Some(now_ms);

        self.last_outcome = match self.source.read_sample() {
            Ok(sample) => {
                self.last_good = sample;
                self.health.consecutive_failures = 0;
                self.on_probation = false;
                ReadOutcome::Fresh
            }
            Err(e) => self.record_failure(e),
        };
        self.last_good
    }

    /// Manual retry, intended for a slow cadence.  Only acts while unsafe:
    /// clears the counter, re-latches safe optimistically and lets the next
    /// [`update`](Self::update) read immediately.  Returns whether it acted.
    pub fn recovery_attempt(&mut self) -> bool {
        if self.health.is_safe {
            return false;
        }
        info!(
            "sensor: recovery attempt after {} consecutive failures",
            self.health.consecutive_failures
        );
        self.health.consecutive_failures = 0;
        self.health.is_safe = true;
        self.on_probation = true;
        self.last_read_ms = None;
        true
    }

    pub fn is_safe(&self) -> bool {
        self.health.is_safe
    }

    pub fn health(&self) -> &SensorHealth {
        &self.health
    }

    pub fn last_sample(&self) -> SensorSample {
        self.last_good
    }

    pub fn last_outcome(&self) -> ReadOutcome {
        self.last_outcome
    }

    fn record_failure(&mut self, e: DecodeError) -> ReadOutcome {
        self.health.consecutive_failures = self.health.consecutive_failures.saturating_add(1);
        self.health.last_error_description = status_text(e.as_str());
        warn!(
            "sensor: read failed #{}: {}",
            self.health.consecutive_failures, e
        );

        let limit_reached =
            self.on_probation || self.health.consecutive_failures >= self.max_failures;
        if limit_reached && self.health.is_safe {
            self.health.is_safe = false;
            self.on_probation = false;
            error!(
                "sensor: UNSAFE after {} consecutive failures, heater will be disabled",
                self.health.consecutive_failures
            );
            ReadOutcome::Tripped(e)
        } else {
            ReadOutcome::Failed(e)
        }
    }
}

/// Copy `text` into a bounded string, truncating at a char boundary.
fn status_text(text: &str) -> String<STATUS_TEXT_CAP> {
    let mut s = String::new();
    for c in text.chars() {
        if s.push(c).is_err() {
            break;
        }
    }
    s
}
