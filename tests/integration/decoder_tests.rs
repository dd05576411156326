//! Integration tests: the real DHT22 decoder on a simulated line, driven
//! by the service exactly as on the device.

use filament_dryer::app::events::DryerEvent;
use filament_dryer::app::service::DryerService;
use filament_dryer::config::SystemConfig;
use filament_dryer::error::DecodeError;
use filament_dryer::fsm::StateId;
use filament_dryer::sensors::SensorSample;
use filament_dryer::sensors::dht22::{Dht22, Dht22Timing, encode_frame};
use filament_dryer::sensors::sim::{PulseTrain, SimDelay, SimLine, SimPin};

use crate::mock_hw::{MockHardware, RecordingSink};

type SimDht = Dht22<SimPin, SimDelay>;

fn service_on(line: &SimLine) -> DryerService<SimDht> {
    let config = SystemConfig::default();
    let dht = Dht22::new(line.pin(), line.delay(), Dht22Timing::from(&config));
    DryerService::new(config, dht).unwrap()
}

#[test]
fn decoded_frame_reaches_snapshot() {
    let frame = encode_frame(&SensorSample::new(351, 652));
    let line = SimLine::new(PulseTrain::from_frame(&frame));
    let mut svc = service_on(&line);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut hw, &mut sink);

    let snap = svc.snapshot();
    assert!((snap.temperature_c - 35.1).abs() < 1e-4);
    assert!((snap.humidity_percent - 65.2).abs() < 1e-4);
    assert_eq!(hw.duty(), 100.0);
}

#[test]
fn frozen_sensor_keeps_last_good_sample_then_trips() {
    let frame = encode_frame(&SensorSample::new(-52, 300));
    let line = SimLine::new(PulseTrain::from_frame(&frame));
    let mut svc = service_on(&line);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut hw, &mut sink);
    assert!((svc.snapshot().temperature_c + 5.2).abs() < 1e-4);

    line.load(PulseTrain::silent());
    svc.tick(5000, &mut hw, &mut sink);
    svc.tick(10_000, &mut hw, &mut sink);

    let snap = svc.snapshot();
    assert!(!snap.is_safe);
    assert_eq!(snap.arbiter_state, StateId::Unsafe);
    assert!((snap.temperature_c + 5.2).abs() < 1e-4, "last good sample kept");
    assert_eq!(snap.sensor_status.as_str(), "no response from sensor");
    assert_eq!(
        sink.count(|e| matches!(
            e,
            DryerEvent::SensorFailure {
                error: DecodeError::NoResponse,
                ..
            }
        )),
        2
    );
}

#[test]
fn corrupted_checksum_is_reported() {
    let mut frame = encode_frame(&SensorSample::new(400, 200));
    frame[4] ^= 0x01;
    let line = SimLine::new(PulseTrain::from_frame(&frame));
    let mut svc = service_on(&line);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut hw, &mut sink);

    let snap = svc.snapshot();
    assert!(snap.is_safe, "one failure is tolerated");
    assert_eq!(snap.consecutive_sensor_failures, 1);
    assert_eq!(snap.sensor_status.as_str(), "checksum error");
    assert_eq!(snap.temperature_c, 25.0, "placeholder until the first good read");
}
