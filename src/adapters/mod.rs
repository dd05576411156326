//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                          | Connects to             |
//! |------------|-------------------------------------|-------------------------|
//! | `hardware` | CurrentPort, HeaterPort, ButtonPort | ESP32 ADC, LEDC, GPIO   |
//! | `log_sink` | EventSink                           | Serial log output       |
//! | `time`     | Clock                               | ESP32 system timer      |

pub mod hardware;
pub mod log_sink;
pub mod time;
