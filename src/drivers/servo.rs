// RoboDog - PWM Joint Driver
//
// One leg servo: converts an angle (0-180°) into a duty value inside the
// channel's [min_duty, max_duty] window and commits it.

use crate::config::SERVO_MAX_ANGLE;
use crate::drivers::pwm::{Polarity, PwmChannel, PwmConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoChannelConfig {
    /// Duty at 0°.
    pub min_duty: u32,
    /// Duty at 180°.
    pub max_duty: u32,
    /// Last duty committed to the hardware (power-up duty before the first move).
    pub current_duty: u32,
    pub reverse_polarity: bool,
}

impl ServoChannelConfig {
    pub const fn new(min_duty: u32, max_duty: u32, current_duty: u32, reverse_polarity: bool) -> Self {
        Self { min_duty, max_duty, current_duty, reverse_polarity }
    }

    pub fn polarity(&self) -> Polarity {
        Polarity::from_reversed(self.reverse_polarity)
    }

    /// Linear angle -> duty map. The angle is clamped first, so 0° and 180°
    /// land exactly on `min_duty` / `max_duty`.
    pub fn angle_to_duty(&self, angle: i32) -> u32 {
        let angle = angle.clamp(0, SERVO_MAX_ANGLE) as u32;
        let span = self.max_duty.saturating_sub(self.min_duty);
        self.min_duty + angle * span / SERVO_MAX_ANGLE as u32
    }
}

pub struct Joint<P: PwmChannel> {
    name: &'static str,
    pwm: P,
    config: ServoChannelConfig,
}

impl<P: PwmChannel> Joint<P> {
    pub fn new(name: &'static str, pwm: P, config: ServoChannelConfig) -> Self {
        Self { name, pwm, config }
    }

    /// Initialise the channel at the configured power-up duty and start it.
    pub fn init_hardware(&mut self) -> Result<(), P::Error> {
        let cfg = PwmConfig::servo(self.config.current_duty, self.config.polarity());
        self.pwm.init(&cfg)?;
        self.pwm.start()?;
        log::debug!("{} servo: initialised at duty {}", self.name, self.config.current_duty);
        Ok(())
    }

    /// Clamp, convert and commit. `current_duty` only changes once the
    /// hardware accepted the write.
    pub fn set_angle(&mut self, angle: i32) -> Result<u32, P::Error> {
        let duty = self.config.angle_to_duty(angle);
        let cfg = PwmConfig::servo(duty, self.config.polarity());

        if let Err(e) = self.pwm.set_config(&cfg) {
            log::error!("{} servo: set duty {} failed: {}", self.name, duty, e);
            return Err(e);
        }
        self.config.current_duty = duty;

        // Restart so the new duty takes effect.
        self.pwm.start()?;
        log::trace!("{} servo: angle {}° -> duty {}", self.name, angle, duty);
        Ok(duty)
    }

    pub fn stop(&mut self) -> Result<(), P::Error> {
        self.pwm.stop()
    }

    pub fn current_duty(&self) -> u32 {
        self.config.current_duty
    }

    pub fn config(&self) -> &ServoChannelConfig {
        &self.config
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
