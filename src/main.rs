//! Filament dryer firmware entry point.
//!
//! Hexagonal architecture with a single cooperative polling loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                    │
//! │                                                            │
//! │  Dht22<OpenDrainGpio>  HardwareAdapter   LogEventSink      │
//! │  (SampleSource)        (Current+Heater+  (EventSink)       │
//! │                         Button ports)    MonotonicClock    │
//! │                                                            │
//! │  ──────────────── Port Trait Boundary ───────────────      │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────┐      │
//! │  │            DryerService (pure logic)             │      │
//! │  │  SensorMonitor · HeaterCheck · Arbiter(FSM+PID)  │      │
//! │  └──────────────────────────────────────────────────┘      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The button is polled every `button_poll_interval_ms`; the control cycle
//! runs whenever `control_loop_interval_ms` has elapsed.  The task watchdog
//! is fed once per iteration.
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::info;

use filament_dryer::adapters::hardware::HardwareAdapter;
use filament_dryer::adapters::log_sink::LogEventSink;
use filament_dryer::adapters::time::MonotonicClock;
use filament_dryer::app::ports::Clock;
use filament_dryer::app::service::DryerService;
use filament_dryer::config::SystemConfig;
use filament_dryer::drivers::heater::HeaterDriver;
use filament_dryer::drivers::hw_init::{self, OpenDrainGpio, RomDelay};
use filament_dryer::drivers::watchdog::Watchdog;
use filament_dryer::pins;
use filament_dryer::sensors::dht22::{Dht22, Dht22Timing};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Filament dryer v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::default();
    config.validate()?;

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals()?;

    let mut hw = HardwareAdapter::new(config.heater_supply_v, HeaterDriver::new());
    hw.all_off();

    let dht = Dht22::new(
        OpenDrainGpio::new(pins::DHT22_GPIO),
        RomDelay,
        Dht22Timing::from(&config),
    );

    // ── 4. Application service ────────────────────────────────
    let mut sink = LogEventSink::new();
    let clock = MonotonicClock::new();
    let mut app = DryerService::new(config.clone(), dht)?;
    let mut watchdog = Watchdog::new(config.watchdog_timeout_ms);

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        let now_ms = clock.now_ms();

        app.poll_button(now_ms, &mut hw, &mut sink);

        if app.control_due(now_ms) {
            app.tick(now_ms, &mut hw, &mut sink);
        }

        watchdog.feed();
        FreeRtos::delay_ms(config.button_poll_interval_ms);
    }
}
