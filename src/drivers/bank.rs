// RoboDog - Synchronous Multi-Servo Setter
//
// Leg layout seen from above (table order in brackets):
//
//     FL[0] ---- FR[2]
//       |          |
//     RL[3] ---- RR[1]
//
// The right-hand servos are mounted facing the other way, so they receive
// `180 - angle`.

use std::fmt;

use crate::config::GaitConfig;
use crate::drivers::pwm::PwmChannel;
use crate::drivers::servo::Joint;
use crate::error::ActionError;
use crate::gait::keyframe::{Keyframe, LegTarget};

pub const LEG_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    FrontLeft = 0,
    RearRight = 1,
    FrontRight = 2,
    RearLeft = 3,
}

impl Leg {
    pub const ALL: [Leg; LEG_COUNT] = [Self::FrontLeft, Self::RearRight, Self::FrontRight, Self::RearLeft];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_mirrored(self) -> bool {
        matches!(self, Self::RearRight | Self::FrontRight)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FrontLeft => "front-left",
            Self::RearRight => "rear-right",
            Self::FrontRight => "front-right",
            Self::RearLeft => "rear-left",
        }
    }

    /// Angle actually sent to this leg's joint for a requested pose angle,
    /// before calibration.
    pub fn mirror(self, angle: i32) -> i32 {
        let angle = if self.is_mirrored() { 180 - angle } else { angle };
        angle.clamp(0, 180)
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

pub struct ServoBank<P: PwmChannel> {
    joints: [Joint<P>; LEG_COUNT],
    calibration: [i32; LEG_COUNT],
}

impl<P: PwmChannel> ServoBank<P> {
    pub fn new(joints: [Joint<P>; LEG_COUNT], calibration: [i32; LEG_COUNT]) -> Self {
        Self { joints, calibration }
    }

    /// Wrap one PWM channel per leg (table order) using the channel table and
    /// calibration from `config`.
    pub fn from_config(pwms: [P; LEG_COUNT], config: &GaitConfig) -> Self {
        let mut i = 0;
        let joints = pwms.map(|pwm| {
            let joint = Joint::new(Leg::ALL[i].name(), pwm, config.servos[i]);
            i += 1;
            joint
        });
        Self::new(joints, config.calibration)
    }

    /// Initialise and start every channel. On the first failure all channels
    /// are stopped again.
    pub fn init_hardware(&mut self) -> Result<(), ActionError> {
        log::info!("Servo hardware init start");
        for leg in Leg::ALL {
            if let Err(e) = self.joints[leg.index()].init_hardware() {
                log::error!("{} servo init failed: {}", leg, e);
                self.shutdown();
                return Err(ActionError::pwm(leg, e));
            }
        }
        log::info!("All servos initialised");
        Ok(())
    }

    /// Apply one keyframe. Legs are written in table order and `Hold` legs
    /// are left untouched.
    ///
    /// There is no hardware latch: if a leg fails, legs already written in
    /// this call keep their new duty and the remaining legs are not written.
    pub fn set_all(&mut self, frame: &Keyframe) -> Result<(), ActionError> {
        for leg in Leg::ALL {
            let LegTarget::Angle(angle) = frame.target(leg) else {
                continue;
            };
            let angle = leg.mirror(angle) + self.calibration[leg.index()];
            self.joints[leg.index()]
                .set_angle(angle)
                .map_err(|e| ActionError::pwm(leg, e))?;
        }
        Ok(())
    }

    /// Stop every output. Errors are logged, remaining channels still stop.
    pub fn shutdown(&mut self) {
        for leg in Leg::ALL {
            if let Err(e) = self.joints[leg.index()].stop() {
                log::warn!("{} servo stop failed: {}", leg, e);
            }
        }
    }

    /// Last committed duty per leg, table order.
    pub fn duties(&self) -> [u32; LEG_COUNT] {
        std::array::from_fn(|i| self.joints[i].current_duty())
    }

    pub fn joint(&self, leg: Leg) -> &Joint<P> {
        &self.joints[leg.index()]
    }

    pub fn calibration(&self) -> [i32; LEG_COUNT] {
        self.calibration
    }
}
