// RoboDog - Hardware & System Configuration
// Target: T5AI-class ESP32 board driving four SG90-style leg servos.

use std::time::Duration;

use crate::drivers::bank::{Leg, LEG_COUNT};
use crate::drivers::servo::ServoChannelConfig;
use crate::error::ActionError;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (one LEDC channel per leg, table order)
// ---------------------------------------------------------------------------
pub const PIN_SERVO_FRONT_LEFT: i32 = 2;
pub const PIN_SERVO_REAR_RIGHT: i32 = 3;
pub const PIN_SERVO_FRONT_RIGHT: i32 = 4;
pub const PIN_SERVO_REAR_LEFT: i32 = 5;

// ---------------------------------------------------------------------------
// Servo PWM
// ---------------------------------------------------------------------------
pub const SERVO_PWM_FREQUENCY_HZ: u32 = 50;
pub const SERVO_PWM_PERIOD_US: u32 = 20_000;
/// Duty values are expressed in 1/100 % of the period.
pub const DUTY_SCALE: u32 = 10_000;
pub const SERVO_MIN_DUTY: u32 = 250;  // 0.5 ms -> 0°
pub const SERVO_MAX_DUTY: u32 = 1250; // 2.5 ms -> 180°
pub const SERVO_DUTY_70_DEGREE: u32 = 639;
pub const SERVO_DUTY_110_DEGREE: u32 = 861;

/// Electrically safe duty window for the leg servos.
pub const SERVO_SAFE_DUTY_MIN: u32 = 250;
pub const SERVO_SAFE_DUTY_MAX: u32 = 1250;

pub const SERVO_MAX_ANGLE: i32 = 180;

// ---------------------------------------------------------------------------
// Poses (degrees, before mirroring)
// ---------------------------------------------------------------------------
pub const STANDBY_FRONT_ANGLE: i32 = 70;
pub const STANDBY_REAR_ANGLE: i32 = 110;
pub const NEUTRAL_ANGLE: i32 = 90;

pub const SWING_FORWARD: i32 = 15;
pub const SWING_BACKWARD: i32 = 20;
pub const SWING_ANGLE_L: i32 = 50;
pub const SWING_ANGLE_M: i32 = 30;
pub const SWING_ANGLE_S: i32 = 10;
/// Skew between the two diagonal pairs while walking.
pub const STEP_OFFSET: i32 = 5;

/// Per-leg assembly offset in degrees, table order (FL, RR, FR, RL).
pub const SERVO_CALIBRATION: [i32; LEG_COUNT] = [0, 0, 0, 0];

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const ACTION_SPEED_FAST_MS: u32 = 150;
pub const ACTION_SPEED_SLOW_FAST_MS: u32 = 300;
pub const ACTION_SPEED_MID_MS: u32 = 500;
pub const ACTION_SPEED_SLOW_MS: u32 = 800;

pub const WALK_STEP_MS: u32 = 10;
pub const SPIN_STEP_MS: u32 = 12;
pub const SPIN_PAUSE_MS: u32 = 15;
pub const SWAY_STEP_MS: u32 = 50;
pub const PAW_WAVE_MS: u32 = 200;

pub const ACTION_IDLE_POLL_MS: u64 = 100;  // queue empty -> re-check interval
pub const ACTION_CANCEL_SLICE_MS: u32 = 10; // stop flag granularity inside a sleep

// ---------------------------------------------------------------------------
// Task / queue sizing
// ---------------------------------------------------------------------------
pub const STACK_ACTION: usize = 4096 * 4;
pub const STACK_DEMO: usize = 4096;
pub const ACTION_QUEUE_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Everything a [`GaitController`](crate::controller::GaitController) instance
/// needs besides its hardware handles. `Default` mirrors the constants above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaitConfig {
    pub servos: [ServoChannelConfig; LEG_COUNT],
    pub calibration: [i32; LEG_COUNT],
    pub idle_poll: Duration,
    pub cancel_slice_ms: u32,
    pub queue_capacity: usize,
    pub stack_size: usize,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            servos: default_servo_channels(),
            calibration: SERVO_CALIBRATION,
            idle_poll: Duration::from_millis(ACTION_IDLE_POLL_MS),
            cancel_slice_ms: ACTION_CANCEL_SLICE_MS,
            queue_capacity: ACTION_QUEUE_CAPACITY,
            stack_size: STACK_ACTION,
        }
    }
}

impl GaitConfig {
    /// Check the channel table against the safe duty window.
    pub fn validate(&self) -> Result<(), ActionError> {
        for (leg, servo) in Leg::ALL.iter().zip(self.servos.iter()) {
            if servo.min_duty >= servo.max_duty {
                return Err(ActionError::InvalidConfig(format!(
                    "{leg}: min_duty {} must be below max_duty {}",
                    servo.min_duty, servo.max_duty
                )));
            }
            if servo.min_duty < SERVO_SAFE_DUTY_MIN || servo.max_duty > SERVO_SAFE_DUTY_MAX {
                return Err(ActionError::InvalidConfig(format!(
                    "{leg}: duty range {}..={} outside safe window {}..={}",
                    servo.min_duty, servo.max_duty, SERVO_SAFE_DUTY_MIN, SERVO_SAFE_DUTY_MAX
                )));
            }
        }
        if self.queue_capacity == 0 {
            return Err(ActionError::InvalidConfig("queue capacity must be non-zero".into()));
        }
        if self.cancel_slice_ms == 0 {
            return Err(ActionError::InvalidConfig("cancel slice must be non-zero".into()));
        }
        Ok(())
    }
}

/// Polarity of every leg's signal line. LEDC drives the servo inputs directly
/// with no inverting buffer, so the commanded pulse must be the high phase.
/// Boards with an inverting level shifter set this to `true`.
pub const SERVO_REVERSE_POLARITY: bool = false;

/// Channel table in leg order.
pub fn default_servo_channels() -> [ServoChannelConfig; LEG_COUNT] {
    let channel = |power_up_duty| {
        ServoChannelConfig::new(SERVO_MIN_DUTY, SERVO_MAX_DUTY, power_up_duty, SERVO_REVERSE_POLARITY)
    };
    [
        channel(SERVO_DUTY_70_DEGREE),
        channel(SERVO_DUTY_70_DEGREE),
        channel(SERVO_DUTY_110_DEGREE),
        channel(SERVO_DUTY_110_DEGREE),
    ]
}
