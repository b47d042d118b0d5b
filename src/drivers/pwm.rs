// RoboDog - PWM Channel Abstraction
//
// The servo code only needs four synchronous operations from the board's PWM
// peripheral. On the device these are backed by the LEDC driver
// (`drivers::ledc`); on the host by `sim::SimPwm`.

use crate::config::{DUTY_SCALE, SERVO_PWM_FREQUENCY_HZ, SERVO_PWM_PERIOD_US};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    /// Output waveform inverted (servo mounted or wired reversed).
    Negative,
}

impl Polarity {
    pub fn from_reversed(reversed: bool) -> Self {
        if reversed {
            Self::Negative
        } else {
            Self::Positive
        }
    }
}

/// Settings committed to a PWM channel. `duty` uses the
/// [`DUTY_SCALE`](crate::config::DUTY_SCALE) (1/100 %) unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmConfig {
    pub duty: u32,
    pub frequency_hz: u32,
    pub period_us: u32,
    pub polarity: Polarity,
}

impl PwmConfig {
    /// Standard 50 Hz servo frame.
    pub fn servo(duty: u32, polarity: Polarity) -> Self {
        Self {
            duty,
            frequency_hz: SERVO_PWM_FREQUENCY_HZ,
            period_us: SERVO_PWM_PERIOD_US,
            polarity,
        }
    }
}

/// Timer ticks for `duty` on a timer counting `0..=max_ticks` per period.
/// Negative polarity returns the complement, so the commanded pulse lands in
/// the low phase of the output.
pub fn duty_to_ticks(duty: u32, max_ticks: u32, polarity: Polarity) -> u32 {
    let duty = u64::from(duty.min(DUTY_SCALE));
    let ticks = (duty * u64::from(max_ticks) / u64::from(DUTY_SCALE)) as u32;
    match polarity {
        Polarity::Positive => ticks,
        Polarity::Negative => max_ticks - ticks,
    }
}

/// One PWM output. All calls are expected to complete well under a millisecond.
pub trait PwmChannel {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Configure the channel for the first time.
    fn init(&mut self, config: &PwmConfig) -> Result<(), Self::Error>;

    /// Update duty / polarity on an initialised channel.
    fn set_config(&mut self, config: &PwmConfig) -> Result<(), Self::Error>;

    /// (Re)start output so the latest config takes effect.
    fn start(&mut self) -> Result<(), Self::Error>;

    fn stop(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SERVO_MAX_DUTY, SERVO_MIN_DUTY};

    // 14-bit LEDC timer as configured on the board.
    const MAX_TICKS: u32 = (1 << 14) - 1;

    fn high_time_us(ticks: u32) -> u32 {
        ticks * SERVO_PWM_PERIOD_US / MAX_TICKS
    }

    #[test]
    fn positive_pulse_matches_servo_endpoints() {
        let low = duty_to_ticks(SERVO_MIN_DUTY, MAX_TICKS, Polarity::Positive);
        let high = duty_to_ticks(SERVO_MAX_DUTY, MAX_TICKS, Polarity::Positive);
        assert_eq!(low, 409);
        assert_eq!(high, 2047);
        assert_eq!(high_time_us(low), 499); // ~0.5 ms -> 0°
        assert_eq!(high_time_us(high), 2498); // ~2.5 ms -> 180°
    }

    #[test]
    fn negative_polarity_complements_ticks() {
        assert_eq!(duty_to_ticks(SERVO_MIN_DUTY, MAX_TICKS, Polarity::Negative), MAX_TICKS - 409);
        assert_eq!(duty_to_ticks(SERVO_MAX_DUTY, MAX_TICKS, Polarity::Negative), MAX_TICKS - 2047);
        assert_eq!(duty_to_ticks(639, MAX_TICKS, Polarity::Negative), 15337);
    }

    #[test]
    fn duty_above_scale_saturates() {
        assert_eq!(duty_to_ticks(20_000, MAX_TICKS, Polarity::Positive), MAX_TICKS);
        assert_eq!(duty_to_ticks(0, MAX_TICKS, Polarity::Negative), MAX_TICKS);
    }
}
