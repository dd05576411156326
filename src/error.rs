//! Unified error types for the filament dryer firmware.
//!
//! `Error` covers the fallible operations outside the control path:
//! configuration, commands and peripheral access.  All types are `Copy`.
//!
//! Decode failures never escape the sensor monitor: it counts them and
//! exposes a boolean verdict.  Safety faults are bits in a mask, not
//! errors; they force the heater off rather than propagate.

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Error for configuration, commands and peripheral access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A peripheral access (ADC read, GPIO) failed.
    Hardware(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(msg) => write!(f, "hardware: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Single-wire decode errors
// ---------------------------------------------------------------------------

/// Why a DHT22 transaction failed.  Carries no retry state; retries are the
/// sensor monitor's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeError {
    /// A bit edge did not arrive within the timeout.
    Timeout,
    /// The fifth byte does not equal the sum of the first four.
    ChecksumMismatch,
    /// The sensor never answered the host start signal.
    NoResponse,
    /// The GPIO driver reported an error while driving or sampling the line.
    Bus,
}

impl DecodeError {
    /// Short human-readable description, stored in the sensor health record.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "communication timeout",
            Self::ChecksumMismatch => "checksum error",
            Self::NoResponse => "no response from sensor",
            Self::Bus => "GPIO bus error",
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Latched safety faults.  Either one forces the heater off.  They are kept
/// as separate bits so logs and the snapshot can tell "can't measure" apart
/// from "can't heat".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SafetyFault {
    /// Consecutive DHT22 failures reached the configured limit.
    SensorLost = 0b0000_0001,
    /// Heater commanded on but the current sensor saw no draw.
    HeaterNoCurrent = 0b0000_0010,
}

impl SafetyFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorLost => write!(f, "temperature sensor lost"),
            Self::HeaterNoCurrent => write!(f, "heater draws no current"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
