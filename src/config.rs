//! System configuration parameters
//!
//! All tunable parameters for the filament dryer.  Fixed at start-up: the
//! controller never discovers configuration at runtime.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Finest polling step the single-wire decoder may use.  The DHT22 encodes
/// bits as 26 µs vs. 70 µs high pulses, so anything coarser misclassifies.
pub const MAX_DECODER_POLL_US: u32 = 10;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- DHT22 single-wire timing ---
    /// Host start signal: line held low (µs)
    pub dht_start_low_us: u32,
    /// Host releases the line for this long before sampling (µs)
    pub dht_release_us: u32,
    /// Polling step while measuring pulses (µs, at most 10)
    pub dht_poll_interval_us: u32,
    /// High pulses longer than this decode as a `1` bit (µs)
    pub dht_bit_one_threshold_us: u32,
    /// Longest wait for any single edge (µs)
    pub dht_timeout_us: u32,

    // --- Sensor health ---
    /// Minimum spacing between DHT22 reads (milliseconds)
    pub sensor_read_interval_ms: u32,
    /// Consecutive read failures before the system is latched unsafe
    pub max_consecutive_sensor_errors: u32,
    /// Spacing between automatic recovery attempts while unsafe (milliseconds)
    pub sensor_recovery_interval_ms: u32,

    // --- PID ---
    pub pid_kp: f32,
    pub pid_ki: f32,
    pub pid_kd: f32,
    /// Minimum period between PID computations (milliseconds)
    pub pid_sample_time_ms: u32,
    /// Heater duty floor (%)
    pub pid_output_min: f32,
    /// Heater duty ceiling (%)
    pub pid_output_max: f32,

    // --- Setpoint ---
    /// Target temperature at power-on (Celsius)
    pub setpoint_default_c: f32,
    /// Lowest selectable target; increments past the max wrap here (Celsius)
    pub setpoint_min_c: f32,
    /// Highest selectable target (Celsius)
    pub setpoint_max_c: f32,
    /// Increment for a short press (Celsius)
    pub setpoint_step_single_c: f32,
    /// Increment for each fast-repeat step (Celsius)
    pub setpoint_step_fast_c: f32,

    // --- Safety ---
    /// Heater is cut off above setpoint + this margin (Celsius)
    pub overshoot_margin_c: f32,
    /// Below this draw a commanded-on heater counts as not heating (watts)
    pub heater_min_power_w: f32,
    /// Consecutive no-current cycles before the heater is latched failed
    pub heater_fault_threshold: u32,
    /// Duty above which the heater counts as commanded on (%)
    pub heater_active_duty_percent: f32,

    // --- Current sensor (ACS712-05B) ---
    /// Heater supply rail, used to convert amps to watts (volts)
    pub heater_supply_v: f32,

    // --- Button ---
    pub button_debounce_ms: u32,
    /// Hold time before fast-repeat starts (milliseconds)
    pub button_hold_threshold_ms: u32,
    /// Interval between fast-repeat increments (milliseconds)
    pub button_fast_repeat_ms: u32,

    // --- Timing ---
    /// Control cycle interval (milliseconds)
    pub control_loop_interval_ms: u32,
    /// Button poll interval (milliseconds)
    pub button_poll_interval_ms: u32,
    /// Task watchdog timeout; the loop feeds it every iteration (milliseconds)
    pub watchdog_timeout_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // DHT22
            dht_start_low_us: 1000,
            dht_release_us: 30,
            dht_poll_interval_us: 5,
            dht_bit_one_threshold_us: 40,
            dht_timeout_us: 5000,

            // Sensor health
            sensor_read_interval_ms: 2000, // DHT22 needs >= 2 s between reads
            max_consecutive_sensor_errors: 2,
            sensor_recovery_interval_ms: 30_000,

            // PID
            pid_kp: 32.0,
            pid_ki: 0.05,
            pid_kd: 5.0,
            pid_sample_time_ms: 1000,
            pid_output_min: 0.0,
            pid_output_max: 100.0,

            // Setpoint
            setpoint_default_c: 45.0,
            setpoint_min_c: 40.0,
            setpoint_max_c: 85.0,
            setpoint_step_single_c: 1.0,
            setpoint_step_fast_c: 5.0,

            // Safety
            overshoot_margin_c: 3.0,
            heater_min_power_w: 2.0,
            heater_fault_threshold: 3,
            heater_active_duty_percent: 5.0,

            // Current sensor
            heater_supply_v: 12.0,

            // Button
            button_debounce_ms: 35,
            button_hold_threshold_ms: 650,
            button_fast_repeat_ms: 470,

            // Timing
            control_loop_interval_ms: 5000,
            button_poll_interval_ms: 10,
            watchdog_timeout_ms: 10_000,
        }
    }
}

impl SystemConfig {
    /// Reject values that would make the controller unsafe or meaningless.
    /// Values are never silently clamped.
    pub fn validate(&self) -> Result<()> {
        if self.dht_poll_interval_us == 0 || self.dht_poll_interval_us > MAX_DECODER_POLL_US {
            return Err(Error::Config("dht_poll_interval_us must be 1..=10"));
        }
        if self.dht_bit_one_threshold_us <= self.dht_poll_interval_us {
            return Err(Error::Config("dht_bit_one_threshold_us must exceed the poll step"));
        }
        if self.dht_timeout_us <= self.dht_bit_one_threshold_us {
            return Err(Error::Config("dht_timeout_us must exceed the bit threshold"));
        }
        if self.max_consecutive_sensor_errors == 0 {
            return Err(Error::Config("max_consecutive_sensor_errors must be > 0"));
        }
        if self.heater_fault_threshold == 0 {
            return Err(Error::Config("heater_fault_threshold must be > 0"));
        }
        if self.pid_output_min >= self.pid_output_max {
            return Err(Error::Config("pid_output_min must be below pid_output_max"));
        }
        if self.pid_output_min < 0.0 || self.pid_output_max > 100.0 {
            return Err(Error::Config("PID output range must lie within 0..=100 %"));
        }
        if self.pid_sample_time_ms == 0 {
            return Err(Error::Config("pid_sample_time_ms must be > 0"));
        }
        if self.setpoint_min_c >= self.setpoint_max_c {
            return Err(Error::Config("setpoint_min_c must be below setpoint_max_c"));
        }
        if !(self.setpoint_min_c..=self.setpoint_max_c).contains(&self.setpoint_default_c) {
            return Err(Error::Config("setpoint_default_c outside the selectable range"));
        }
        if self.setpoint_step_single_c <= 0.0 || self.setpoint_step_fast_c <= 0.0 {
            return Err(Error::Config("setpoint steps must be positive"));
        }
        if self.overshoot_margin_c <= 0.0 {
            return Err(Error::Config("overshoot_margin_c must be positive"));
        }
        if self.button_hold_threshold_ms <= self.button_debounce_ms {
            return Err(Error::Config("button hold threshold must exceed debounce"));
        }
        if self.button_fast_repeat_ms == 0 {
            return Err(Error::Config("button_fast_repeat_ms must be > 0"));
        }
        if self.control_loop_interval_ms == 0 || self.sensor_read_interval_ms == 0 {
            return Err(Error::Config("loop intervals must be > 0"));
        }
        if self.watchdog_timeout_ms < 1000 {
            return Err(Error::Config("watchdog_timeout_ms must be at least 1000"));
        }
        Ok(())
    }
}
