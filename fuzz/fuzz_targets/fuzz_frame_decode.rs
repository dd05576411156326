//! Fuzz target: `decode_frame`
//!
//! Any 5-byte frame either fails the checksum or decodes to a sample that
//! re-encodes to the same bytes (modulo the unused negative-zero form).
//!
//! cargo fuzz run fuzz_frame_decode

#![no_main]

use filament_dryer::error::DecodeError;
use filament_dryer::sensors::dht22::{decode_frame, encode_frame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|frame: [u8; 5]| {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    match decode_frame(&frame) {
        Ok(sample) => {
            assert_eq!(sum, frame[4]);
            let negative_zero = frame[2] == 0x80 && frame[3] == 0;
            if !negative_zero {
                assert_eq!(encode_frame(&sample), frame);
            }
        }
        Err(e) => {
            assert_eq!(e, DecodeError::ChecksumMismatch);
            assert_ne!(sum, frame[4]);
        }
    }
});
