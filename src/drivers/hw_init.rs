//! One-shot hardware peripheral initialization.
//!
//! Configures the current-sense ADC channel, the button input, the DHT22
//! open-drain line and the heater LEDC timer/channel using raw ESP-IDF sys
//! calls.  Called once from `main()` before the control loop starts.
//!
//! On host builds every accessor is a simulation stub backed by atomics so
//! adapters and tests can inject levels.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio()?;
        init_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

/// Full-scale input at 12 dB attenuation (millivolts).
pub const ADC_FULL_SCALE_MV: u32 = 3100;
/// 12-bit ADC maximum code.
pub const ADC_MAX_CODE: u32 = 4095;

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::CURRENT_ADC_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 configured (CH{}=ACS712)", pins::CURRENT_ADC_CHANNEL);
    Ok(())
}

/// Read one ADC1 sample and scale it to millivolts (linear approximation
/// of the 12 dB range).
#[cfg(target_os = "espidf")]
pub fn adc1_read_mv(channel: u32) -> crate::error::Result<u16> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(crate::error::Error::Hardware("adc_oneshot_read failed"));
    }
    Ok(raw_to_mv(raw.max(0) as u32))
}

#[cfg(not(target_os = "espidf"))]
static SIM_CURRENT_MV: core::sync::atomic::AtomicU16 = core::sync::atomic::AtomicU16::new(2500);

/// Inject the simulated current-sensor output (millivolts).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_current_mv(mv: u16) {
    SIM_CURRENT_MV.store(mv, core::sync::atomic::Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read_mv(_channel: u32) -> crate::error::Result<u16> {
    Ok(SIM_CURRENT_MV.load(core::sync::atomic::Ordering::Relaxed))
}

/// Linear code-to-millivolt conversion.
pub fn raw_to_mv(raw: u32) -> u16 {
    (raw.min(ADC_MAX_CODE) * ADC_FULL_SCALE_MV / ADC_MAX_CODE) as u16
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio() -> Result<(), HwInitError> {
    let btn_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::BUTTON_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&btn_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    // DHT22: open-drain so releasing the line lets the pull-up and the
    // sensor drive it while we keep sampling.
    let dht_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::DHT22_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&dht_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    unsafe { gpio_set_level(pins::DHT22_GPIO, 1) };

    info!("hw_init: GPIO configured (button, DHT22 open-drain)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
static SIM_BUTTON_LEVEL: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(true);

/// Inject the simulated button GPIO level (`false` = pressed, active-low).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_button_level(high: bool) {
    SIM_BUTTON_LEVEL.store(high, core::sync::atomic::Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    SIM_BUTTON_LEVEL.load(core::sync::atomic::Ordering::Relaxed)
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

// ── DHT22 line (embedded-hal) ─────────────────────────────────

/// The DHT22 data pin as an embedded-hal open-drain pin.
#[cfg(target_os = "espidf")]
pub struct OpenDrainGpio {
    pin: i32,
}

#[cfg(target_os = "espidf")]
impl OpenDrainGpio {
    /// The pin must already be configured by [`init_peripherals`].
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }
}

#[cfg(target_os = "espidf")]
impl embedded_hal::digital::ErrorType for OpenDrainGpio {
    type Error = core::convert::Infallible;
}

#[cfg(target_os = "espidf")]
impl embedded_hal::digital::InputPin for OpenDrainGpio {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(gpio_read(self.pin))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!gpio_read(self.pin))
    }
}

#[cfg(target_os = "espidf")]
impl embedded_hal::digital::OutputPin for OpenDrainGpio {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.pin, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.pin, true);
        Ok(())
    }
}

/// Busy-wait delay from the ROM, accurate to a microsecond.  Returns
/// immediately on host builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct RomDelay;

#[cfg(target_os = "espidf")]
impl embedded_hal::delay::DelayNs for RomDelay {
    fn delay_ns(&mut self, ns: u32) {
        // SAFETY: esp_rom_delay_us is a pure busy loop.
        unsafe { esp_rom_delay_us(ns.div_ceil(1000)) };
    }

    fn delay_us(&mut self, us: u32) {
        // SAFETY: as above.
        unsafe { esp_rom_delay_us(us) };
    }
}

#[cfg(not(target_os = "espidf"))]
impl embedded_hal::delay::DelayNs for RomDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── LEDC PWM ─────────────────────────────────────────────────

pub const LEDC_CH_HEATER: u32 = 0;
/// Maximum duty code for the configured resolution.
pub const LEDC_MAX_DUTY: u32 = (1 << crate::pins::PWM_RESOLUTION_BITS) - 1;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Timer 0: heater (5 kHz, 10-bit)
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_10_BIT,
        freq_hz: pins::HEATER_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer0) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    // Channel 0: heater MOSFET gate, starts off
    let ret = unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: LEDC_CH_HEATER,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: pins::HEATER_PWM_GPIO,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        })
    };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    info!("hw_init: LEDC configured (heater=CH0, {} Hz)", pins::HEATER_PWM_FREQ_HZ);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u32) {
    // SAFETY: LEDC channels were configured in init_ledc(); only the main
    // loop writes the duty register.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty.min(LEDC_MAX_DUTY));
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u32) {}
