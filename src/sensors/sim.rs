//! Host-side simulation of a DHT22 data line.
//!
//! A [`SimLine`] owns a virtual microsecond clock that only advances when
//! the decoder calls its delay.  The pin half reports the level of a
//! scripted [`PulseTrain`] relative to the moment the host released the
//! line, so pulse widths are exact and tests never sleep.

use core::convert::Infallible;
use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// Nominal sensor timings (µs).
pub const ACK_LOW_US: u32 = 80;
pub const ACK_HIGH_US: u32 = 80;
pub const BIT_LOW_US: u32 = 50;
pub const BIT_ZERO_HIGH_US: u32 = 26;
pub const BIT_ONE_HIGH_US: u32 = 70;
/// Pull-up time between host release and the sensor's first low.
pub const RESPONSE_DELAY_US: u32 = 30;

/// The waveform the sensor drives after the host releases the line, as
/// `(level, duration_us)` segments.  After the last segment the line idles
/// high through its pull-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PulseTrain {
    segments: Vec<(bool, u32)>,
}

impl PulseTrain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sensor that never answers.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Nominal waveform for a raw 5-byte frame.
    pub fn from_frame(frame: &[u8; 5]) -> Self {
        Self::from_frame_with(
            frame,
            |_, one| if one { BIT_ONE_HIGH_US } else { BIT_ZERO_HIGH_US },
            |_| BIT_LOW_US,
        )
    }

    /// Waveform for `frame` with caller-chosen widths.  `high_us` gets the
    /// bit index and value, `low_us` the bit index.
    pub fn from_frame_with(
        frame: &[u8; 5],
        mut high_us: impl FnMut(usize, bool) -> u32,
        mut low_us: impl FnMut(usize) -> u32,
    ) -> Self {
        let mut train = Self::new()
            .push(true, RESPONSE_DELAY_US)
            .push(false, ACK_LOW_US)
            .push(true, ACK_HIGH_US);
        for bit in 0..40 {
            let one = frame[bit / 8] & (1 << (7 - (bit % 8))) != 0;
            train = train.push(false, low_us(bit)).push(true, high_us(bit, one));
        }
        train.push(false, BIT_LOW_US)
    }

    /// Append a segment.
    pub fn push(mut self, high: bool, duration_us: u32) -> Self {
        self.segments.push((high, duration_us));
        self
    }

    /// Keep only the first `n` segments.
    pub fn truncated(mut self, n: usize) -> Self {
        self.segments.truncate(n);
        self
    }

    /// Total scripted duration (µs).
    pub fn duration_us(&self) -> u64 {
        self.segments.iter().map(|(_, d)| u64::from(*d)).sum()
    }

    fn level_at(&self, t_us: u64) -> bool {
        let mut start = 0u64;
        for &(high, duration) in &self.segments {
            let end = start + u64::from(duration);
            if t_us < end {
                return high;
            }
            start = end;
        }
        true
    }
}

#[derive(Debug)]
struct Bus {
    now_ns: u64,
    host_low: bool,
    released_at_ns: Option<u64>,
    train: PulseTrain,
}

impl Bus {
    fn level(&self) -> bool {
        if self.host_low {
            return false;
        }
        match self.released_at_ns {
            Some(t0) => self.train.level_at((self.now_ns - t0) / 1000),
            None => true,
        }
    }
}

/// A simulated data line shared by a pin and a delay handle.
#[derive(Debug, Clone)]
pub struct SimLine(Rc<RefCell<Bus>>);

impl SimLine {
    pub fn new(train: PulseTrain) -> Self {
        Self(Rc::new(RefCell::new(Bus {
            now_ns: 0,
            host_low: false,
            released_at_ns: None,
            train,
        })))
    }

    /// Pin handle for the decoder.
    pub fn pin(&self) -> SimPin {
        SimPin(Rc::clone(&self.0))
    }

    /// Delay handle that advances the virtual clock.
    pub fn delay(&self) -> SimDelay {
        SimDelay(Rc::clone(&self.0))
    }

    /// Virtual time since creation (µs).
    pub fn now_us(&self) -> u64 {
        self.0.borrow().now_ns / 1000
    }

    /// Script the sensor's answer to the next transaction.
    pub fn load(&self, train: PulseTrain) {
        let mut bus = self.0.borrow_mut();
        bus.train = train;
        bus.released_at_ns = None;
    }
}

/// Open-drain pin half of a [`SimLine`].
#[derive(Debug)]
pub struct SimPin(Rc<RefCell<Bus>>);

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow().level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow().level())
    }
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut bus = self.0.borrow_mut();
        bus.host_low = true;
        bus.released_at_ns = None;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut bus = self.0.borrow_mut();
        if bus.host_low {
            bus.host_low = false;
            bus.released_at_ns = Some(bus.now_ns);
        }
        Ok(())
    }
}

/// Delay half of a [`SimLine`].
#[derive(Debug)]
pub struct SimDelay(Rc<RefCell<Bus>>);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().now_ns += u64::from(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.0.borrow_mut().now_ns += u64::from(us) * 1000;
    }
}
