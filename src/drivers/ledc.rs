// RoboDog - LEDC-backed PWM Channel (ESP-IDF only)
//
// Maps the 0..DUTY_SCALE duty unit onto the LEDC timer resolution with
// `duty_to_ticks`. Negative polarity inverts the tick count in software.

use esp_idf_hal::ledc::LedcDriver;
use esp_idf_sys::EspError;

use crate::drivers::pwm::{duty_to_ticks, PwmChannel, PwmConfig};

pub struct LedcPwm<'d> {
    ledc: LedcDriver<'d>,
    max_duty: u32,
}

impl<'d> LedcPwm<'d> {
    pub fn new(ledc: LedcDriver<'d>) -> Self {
        let max_duty = ledc.get_max_duty();
        Self { ledc, max_duty }
    }

    fn ticks(&self, config: &PwmConfig) -> u32 {
        duty_to_ticks(config.duty, self.max_duty, config.polarity)
    }
}

impl PwmChannel for LedcPwm<'_> {
    type Error = EspError;

    fn init(&mut self, config: &PwmConfig) -> Result<(), EspError> {
        self.set_config(config)
    }

    fn set_config(&mut self, config: &PwmConfig) -> Result<(), EspError> {
        let ticks = self.ticks(config);
        self.ledc.set_duty(ticks)
    }

    fn start(&mut self) -> Result<(), EspError> {
        self.ledc.enable()
    }

    fn stop(&mut self) -> Result<(), EspError> {
        self.ledc.disable()
    }
}
