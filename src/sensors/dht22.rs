//! DHT22 (AM2302) single-wire temperature/humidity decoder.
//!
//! ## Protocol
//!
//! ```text
//!  host start      sensor ack        bit 0            bit 1
//! ‾‾\______/‾‾‾\____/‾‾‾‾\____/‾‾\____/‾‾‾‾‾‾‾\__ ...
//!    1000µs  30µs  80µs  80µs  50µs 26µs 50µs  70µs
//! ```
//!
//! 40 bits MSB-first: humidity (2 bytes), temperature (2 bytes, sign in the
//! top bit), checksum (low byte of the sum of the four data bytes).
//!
//! ## Timing
//!
//! Pulse widths are measured by polling the pin with short fixed delays, not
//! with a hardware timer.  The poll step must be well under the 26 µs / 70 µs
//! split; [`SystemConfig::validate`](crate::config::SystemConfig::validate)
//! caps it at 10 µs.  The whole transaction blocks the caller for at most a
//! few milliseconds, bounded by `timeout_us` per edge.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::debug;

use super::{SampleSource, SensorSample};
use crate::config::SystemConfig;
use crate::error::DecodeError;

/// Data bits per transaction.
const FRAME_BITS: usize = 40;

/// Line timing used by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dht22Timing {
    pub start_low_us: u32,
    pub release_us: u32,
    pub poll_us: u32,
    pub bit_one_threshold_us: u32,
    pub timeout_us: u32,
}

impl Default for Dht22Timing {
    fn default() -> Self {
        Self::from(&SystemConfig::default())
    }
}

impl From<&SystemConfig> for Dht22Timing {
    fn from(c: &SystemConfig) -> Self {
        Self {
            start_low_us: c.dht_start_low_us,
            release_us: c.dht_release_us,
            poll_us: c.dht_poll_interval_us.max(1),
            bit_one_threshold_us: c.dht_bit_one_threshold_us,
            timeout_us: c.dht_timeout_us,
        }
    }
}

/// Why a single wait on the line ended early.
enum WaitError {
    Expired,
    Bus,
}

/// DHT22 driver over an open-drain pin and a microsecond delay.
///
/// `P` must be readable while released (open-drain with pull-up, or a
/// driver that switches to input on `set_high`).
pub struct Dht22<P, D> {
    pin: P,
    delay: D,
    timing: Dht22Timing,
}

impl<P, D> Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D, timing: Dht22Timing) -> Self {
        Self { pin, delay, timing }
    }

    /// Run one complete transaction.  Blocks for a bounded duration.
    pub fn read(&mut self) -> Result<SensorSample, DecodeError> {
        self.send_start()?;

        // Sensor ack: low, high, then low for the first bit.
        for level in [false, true, false] {
            self.wait_for(level).map_err(|e| match e {
                WaitError::Expired => DecodeError::NoResponse,
                WaitError::Bus => DecodeError::Bus,
            })?;
        }

        let mut frame = [0u8; 5];
        for bit in 0..FRAME_BITS {
            self.wait_for(true).map_err(bit_error)?;
            let high_us = self.measure_high().map_err(bit_error)?;
            if high_us > self.timing.bit_one_threshold_us {
                frame[bit / 8] |= 1 << (7 - (bit % 8));
            }
        }

        debug!("dht22: frame {:02x?}", frame);
        decode_frame(&frame)
    }

    /// Give the pin and delay back (e.g. to re-init after a fault).
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    fn send_start(&mut self) -> Result<(), DecodeError> {
        self.pin.set_low().map_err(|_| DecodeError::Bus)?;
        self.delay.delay_us(self.timing.start_low_us);
        self.pin.set_high().map_err(|_| DecodeError::Bus)?;
        self.delay.delay_us(self.timing.release_us);
        Ok(())
    }

    /// Poll until the line reads `high`, giving up after `timeout_us`.
    fn wait_for(&mut self, high: bool) -> Result<(), WaitError> {
        let max_polls = self.timing.timeout_us / self.timing.poll_us;
        for _ in 0..=max_polls {
            if self.pin.is_high().map_err(|_| WaitError::Bus)? == high {
                return Ok(());
            }
            self.delay.delay_us(self.timing.poll_us);
        }
        Err(WaitError::Expired)
    }

    /// Count poll steps while the line stays high.  Resolution is one
    /// poll step.
    fn measure_high(&mut self) -> Result<u32, WaitError> {
        let mut elapsed = 0u32;
        while self.pin.is_high().map_err(|_| WaitError::Bus)? {
            if elapsed >= self.timing.timeout_us {
                return Err(WaitError::Expired);
            }
            self.delay.delay_us(self.timing.poll_us);
            elapsed += self.timing.poll_us;
        }
        Ok(elapsed)
    }
}

fn bit_error(e: WaitError) -> DecodeError {
    match e {
        WaitError::Expired => DecodeError::Timeout,
        WaitError::Bus => DecodeError::Bus,
    }
}

impl<P, D> SampleSource for Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn read_sample(&mut self) -> Result<SensorSample, DecodeError> {
        self.read()
    }
}

/// Verify the checksum and unpack a raw 5-byte frame.
pub fn decode_frame(frame: &[u8; 5]) -> Result<SensorSample, DecodeError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(DecodeError::ChecksumMismatch);
    }

    let humidity_tenths = u16::from_be_bytes([frame[0], frame[1]]);
    let magnitude = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]) as i16;
    let temperature_tenths = if frame[2] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };

    Ok(SensorSample {
        temperature_tenths,
        humidity_tenths,
    })
}

/// Build the frame a sensor would send for `sample` (checksum included).
pub fn encode_frame(sample: &SensorSample) -> [u8; 5] {
    let [h_hi, h_lo] = sample.humidity_tenths.to_be_bytes();
    let magnitude = sample.temperature_tenths.unsigned_abs() & 0x7FFF;
    let [mut t_hi, t_lo] = magnitude.to_be_bytes();
    if sample.temperature_tenths < 0 {
        t_hi |= 0x80;
    }
    let sum = h_hi
        .wrapping_add(h_lo)
        .wrapping_add(t_hi)
        .wrapping_add(t_lo);
    [h_hi, h_lo, t_hi, t_lo, sum]
}
