// RoboDog - Keyframes

use crate::config::{STANDBY_FRONT_ANGLE, STANDBY_REAR_ANGLE};
use crate::drivers::bank::{Leg, LEG_COUNT};

/// Target for a single leg within a keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegTarget {
    /// Keep the leg's last commanded position.
    Hold,
    /// Pose angle in degrees, before mirroring and calibration.
    Angle(i32),
}

/// One pose for all four legs, table order (FL, RR, FR, RL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keyframe(pub [LegTarget; LEG_COUNT]);

/// Table-literal marker for [`LegTarget::Hold`].
pub const HOLD: i32 = -1;

impl Keyframe {
    pub fn new(angles: [i32; LEG_COUNT]) -> Self {
        Self(angles.map(LegTarget::Angle))
    }

    /// Build from a choreography table row where [`HOLD`] marks a held leg.
    pub fn from_raw(row: [i32; LEG_COUNT]) -> Self {
        Self(row.map(|a| if a == HOLD { LegTarget::Hold } else { LegTarget::Angle(a) }))
    }

    /// Front legs at 70°, rear legs at 110°.
    pub fn standby() -> Self {
        Self::new([STANDBY_FRONT_ANGLE, STANDBY_REAR_ANGLE, STANDBY_FRONT_ANGLE, STANDBY_REAR_ANGLE])
    }

    pub fn uniform(angle: i32) -> Self {
        Self::new([angle; LEG_COUNT])
    }

    pub fn target(&self, leg: Leg) -> LegTarget {
        self.0[leg.index()]
    }

    /// True when every leg holds, i.e. applying the frame writes nothing.
    pub fn is_hold_only(&self) -> bool {
        self.0.iter().all(|t| *t == LegTarget::Hold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_rows_map_marker_to_hold() {
        let frame = Keyframe::from_raw([HOLD, 140, HOLD, 165]);
        assert_eq!(frame.target(Leg::FrontLeft), LegTarget::Hold);
        assert_eq!(frame.target(Leg::RearRight), LegTarget::Angle(140));
        assert_eq!(frame.target(Leg::RearLeft), LegTarget::Angle(165));
    }

    #[test]
    fn negative_angles_other_than_marker_stay_angles() {
        let frame = Keyframe::new([-1, -5, 0, 10]);
        assert_eq!(frame.target(Leg::FrontLeft), LegTarget::Angle(-1));
        assert!(!frame.is_hold_only());
    }

    #[test]
    fn standby_pose() {
        assert_eq!(Keyframe::standby(), Keyframe::new([70, 110, 70, 110]));
        assert!(Keyframe::from_raw([HOLD; LEG_COUNT]).is_hold_only());
    }
}
