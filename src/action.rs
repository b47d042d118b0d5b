// RoboDog - Named Actions & Motion Events

use std::fmt;
use std::str::FromStr;

use crate::error::ActionError;

// ---------------------------------------------------------------------------
// Action identifiers
// ---------------------------------------------------------------------------

/// Raw code one past the last valid action.
pub const ACTION_MAX: u8 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Action {
    #[default]
    None = 0,
    Forward,
    Backward,
    Left,
    Right,
    Spin,
    Dance,
    Handshake,
    Jump,
    Stand,
    Sit,
    GetDown,
    Stretch,
    DragonBoat,
}

impl Action {
    /// Every executable action, in raw-code order.
    pub const ALL: [Action; 13] = [
        Self::Forward,
        Self::Backward,
        Self::Left,
        Self::Right,
        Self::Spin,
        Self::Dance,
        Self::Handshake,
        Self::Jump,
        Self::Stand,
        Self::Sit,
        Self::GetDown,
        Self::Stretch,
        Self::DragonBoat,
    ];

    /// Decode a wire/tool-call action code. `0` decodes to `None`, which the
    /// controller still refuses to enqueue.
    pub fn from_raw(code: u8) -> Result<Self, ActionError> {
        match code {
            0 => Ok(Self::None),
            1..=13 => Ok(Self::ALL[usize::from(code) - 1]),
            _ => Err(ActionError::InvalidParam),
        }
    }

    pub fn raw(self) -> u8 {
        self as u8
    }

    /// True for every action that maps to a trajectory.
    pub fn is_executable(self) -> bool {
        self != Self::None
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Spin => "spin",
            Self::Dance => "dance",
            Self::Handshake => "handshake",
            Self::Jump => "jump",
            Self::Stand => "stand",
            Self::Sit => "sit",
            Self::GetDown => "get_down",
            Self::Stretch => "stretch",
            Self::DragonBoat => "dragon_boat",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Action {
    type Error = ActionError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_raw(code)
    }
}

/// Parses command names coming from voice / tool-call handlers.
/// Separators (`_`, `-`, space) and case are ignored.
impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "forward" => Ok(Self::Forward),
            "backward" | "back" => Ok(Self::Backward),
            "left" | "turnleft" => Ok(Self::Left),
            "right" | "turnright" => Ok(Self::Right),
            "spin" => Ok(Self::Spin),
            "dance" => Ok(Self::Dance),
            "handshake" => Ok(Self::Handshake),
            "jump" => Ok(Self::Jump),
            "stand" => Ok(Self::Stand),
            "sit" => Ok(Self::Sit),
            "getdown" | "liedown" => Ok(Self::GetDown),
            "stretch" => Ok(Self::Stretch),
            "dragonboat" | "row" => Ok(Self::DragonBoat),
            _ => Err(ActionError::InvalidParam),
        }
    }
}

// ---------------------------------------------------------------------------
// Motion events - optional progress reports from the action task
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotionEvent {
    /// The action task dequeued the action and is about to play it.
    Started(Action),
    /// Every keyframe was applied.
    Completed(Action),
    /// A PWM commit failed; the remaining keyframes were skipped.
    Aborted { action: Action, reason: String },
    /// The controller stopped while the action was in flight.
    Cancelled(Action),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_follow_declaration_order() {
        for action in Action::ALL {
            assert_eq!(Action::from_raw(action.raw()).unwrap(), action);
        }
        assert_eq!(Action::DragonBoat.raw(), ACTION_MAX - 1);
    }

    #[test]
    fn none_decodes_but_is_not_executable() {
        assert_eq!(Action::from_raw(0).unwrap(), Action::None);
        assert!(!Action::None.is_executable());
    }

    #[test]
    fn codes_past_max_are_invalid() {
        assert!(matches!(Action::try_from(ACTION_MAX), Err(ActionError::InvalidParam)));
        assert!(matches!(Action::try_from(200), Err(ActionError::InvalidParam)));
    }

    #[test]
    fn parses_command_names() {
        assert_eq!("Forward".parse::<Action>().unwrap(), Action::Forward);
        assert_eq!("get_down".parse::<Action>().unwrap(), Action::GetDown);
        assert_eq!("GETDOWN".parse::<Action>().unwrap(), Action::GetDown);
        assert_eq!(" dragon-boat ".parse::<Action>().unwrap(), Action::DragonBoat);
        assert_eq!("turn left".parse::<Action>().unwrap(), Action::Left);
        assert!("fly".parse::<Action>().is_err());
        assert!("none".parse::<Action>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for action in Action::ALL {
            assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
        }
    }
}
