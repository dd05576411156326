//! Fuzz target: `Dht22::read` over arbitrary waveforms
//!
//! Interprets the input as `(level, duration)` segments the sensor drives
//! after the host releases the line, and asserts that the decoder never
//! panics, always finishes within a bounded virtual time, and only reports
//! success for frames whose checksum holds.
//!
//! cargo fuzz run fuzz_pulse_decoder

#![no_main]

use filament_dryer::sensors::dht22::{Dht22, Dht22Timing, decode_frame, encode_frame};
use filament_dryer::sensors::sim::{PulseTrain, SimLine};
use libfuzzer_sys::fuzz_target;

/// Upper bound on one transaction: start signal plus a timeout per edge.
const MAX_TRANSACTION_US: u64 = 1_100 + 83 * 5_100;

fuzz_target!(|data: &[u8]| {
    let mut train = PulseTrain::new();
    for pair in data.chunks_exact(2) {
        let high = pair[0] & 0x80 != 0;
        // Up to ~8 ms per segment so timeouts are reachable.
        let duration = (u32::from(pair[0] & 0x7F) << 6) | u32::from(pair[1] >> 2);
        train = train.push(high, duration);
    }

    let line = SimLine::new(train);
    let mut dht = Dht22::new(line.pin(), line.delay(), Dht22Timing::default());

    if let Ok(sample) = dht.read() {
        // Anything accepted must survive a checksum round-trip.
        assert_eq!(decode_frame(&encode_frame(&sample)), Ok(sample));
    }
    assert!(
        line.now_us() <= MAX_TRANSACTION_US,
        "transaction took {} µs",
        line.now_us()
    );
});
