//! GPIO / peripheral pin assignments for the dryer controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Heater (MOSFET low-side switch on the 12 V hotend cartridge)
// ---------------------------------------------------------------------------

/// LEDC PWM output driving the heater MOSFET gate.
pub const HEATER_PWM_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DHT22 data line.  Open-drain with a 10 kΩ pull-up to 3V3.
pub const DHT22_GPIO: i32 = 22;

/// ACS712-05B analog output, read through ADC1.
pub const CURRENT_ADC_GPIO: i32 = 4;
/// ADC1 channel matching [`CURRENT_ADC_GPIO`].
pub const CURRENT_ADC_CHANNEL: u32 = 3;

// ---------------------------------------------------------------------------
// User button (active-low with internal pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button for setpoint adjustment.
pub const BUTTON_GPIO: i32 = 16;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  10-bit gives 0 – 1023 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 10;
/// Heater PWM frequency (5 kHz, suitable for a resistive cartridge).
pub const HEATER_PWM_FREQ_HZ: u32 = 5_000;
