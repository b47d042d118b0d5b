// RoboDog - Gait Trajectory Generators
//
// Every named action expands into a flat list of (keyframe, delay) steps.
// The action task walks the list one step at a time, which gives it a place
// to notice a stop request between keyframes.
//
// Rows are written in table order (FL, RR, FR, RL); `H` holds a leg.

use crate::action::Action;
use crate::config::*;
use crate::gait::keyframe::{Keyframe, HOLD as H};

/// Amplitude of a walking stride around the standby pose.
const STRIDE_SWING: i32 = 20;
const WALK_STRIDES: usize = 6;
const WALK_SWEEP: i32 = 2 * STRIDE_SWING;

const TURN_REPEATS: usize = 4;
const SPIN_REPEATS: usize = 16;

const DANCE_CYCLES: usize = 9;
const DRAGONBOAT_CYCLES: usize = 9;
const HANDSHAKE_WAVES: usize = 11;
const HANDSHAKE_LIFT: i32 = 40;
const STRETCH_PUSHES: usize = 6;
const STRETCH_REAR: i32 = 140;
const STRETCH_REAR_FULL: i32 = 165;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub frame: Keyframe,
    /// Sleep after applying `frame`.
    pub delay_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trajectory {
    action: Action,
    steps: Vec<Step>,
}

impl Trajectory {
    /// Expand `action` into its step list. `Action::None` yields no steps.
    pub fn for_action(action: Action) -> Self {
        let mut c = Choreographer::default();
        match action {
            Action::None => {}
            Action::Forward => walk_forward(&mut c),
            Action::Backward => walk_backward(&mut c),
            Action::Left => spin_anticlockwise(&mut c, TURN_REPEATS),
            Action::Right => spin_clockwise(&mut c, TURN_REPEATS),
            Action::Spin => spin_clockwise(&mut c, SPIN_REPEATS),
            Action::Dance => dance(&mut c),
            Action::Handshake => handshake(&mut c),
            Action::Jump => jump(&mut c),
            Action::Stand => stand(&mut c),
            Action::Sit => sit(&mut c),
            Action::GetDown => get_down(&mut c),
            Action::Stretch => stretch(&mut c),
            Action::DragonBoat => dragon_boat(&mut c),
        }
        Self { action, steps: c.steps }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Nominal run time, ignoring PWM write latency.
    pub fn duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| u64::from(s.delay_ms)).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }
}

impl IntoIterator for Trajectory {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

// ---------------------------------------------------------------------------
// Step list builder
// ---------------------------------------------------------------------------
#[derive(Default)]
struct Choreographer {
    steps: Vec<Step>,
}

impl Choreographer {
    fn pose(&mut self, frame: Keyframe, delay_ms: u32) -> &mut Self {
        self.steps.push(Step { frame, delay_ms });
        self
    }

    fn row(&mut self, row: [i32; 4], delay_ms: u32) -> &mut Self {
        self.pose(Keyframe::from_raw(row), delay_ms)
    }

    /// One row per value of `range`, each followed by `delay_ms`.
    fn sweep<I, F>(&mut self, range: I, delay_ms: u32, row: F) -> &mut Self
    where
        I: IntoIterator<Item = i32>,
        F: Fn(i32) -> [i32; 4],
    {
        for i in range {
            self.row(row(i), delay_ms);
        }
        self
    }

    /// Extra settle time without a new pose.
    fn pause(&mut self, ms: u32) -> &mut Self {
        match self.steps.last_mut() {
            Some(last) => last.delay_ms += ms,
            None => self.steps.push(Step { frame: Keyframe::from_raw([H; 4]), delay_ms: ms }),
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Walking: diagonal pairs (FL+RR, FR+RL) sweep in alternation.
// ---------------------------------------------------------------------------
const FRONT_FWD: i32 = STANDBY_FRONT_ANGLE - STRIDE_SWING;
const FRONT_BACK: i32 = STANDBY_FRONT_ANGLE + STRIDE_SWING;
const REAR_FWD: i32 = STANDBY_REAR_ANGLE - STRIDE_SWING;
const REAR_BACK: i32 = STANDBY_REAR_ANGLE + STRIDE_SWING;

fn walk<A, B>(c: &mut Choreographer, lead: A, trail: B)
where
    A: Fn(i32) -> [i32; 4] + Copy,
    B: Fn(i32) -> [i32; 4] + Copy,
{
    c.pose(Keyframe::standby(), WALK_STEP_MS);
    for _ in 0..WALK_STRIDES {
        c.sweep(1..=WALK_SWEEP, WALK_STEP_MS, lead).pause(WALK_STEP_MS);
        c.sweep(1..=WALK_SWEEP, WALK_STEP_MS, trail).pause(WALK_STEP_MS);
    }
    // Half a lead sweep brings the legs back around standby.
    c.sweep(1..=STRIDE_SWING, WALK_STEP_MS, lead);
    c.pose(Keyframe::standby(), WALK_STEP_MS);
}

fn walk_forward(c: &mut Choreographer) {
    walk(
        c,
        |i| [FRONT_BACK - i, REAR_BACK - i, FRONT_FWD + i + STEP_OFFSET, REAR_FWD + i - STEP_OFFSET],
        |i| [FRONT_FWD + i, REAR_FWD + i, FRONT_BACK - i - STEP_OFFSET, REAR_BACK - i + STEP_OFFSET],
    );
}

fn walk_backward(c: &mut Choreographer) {
    walk(
        c,
        |i| [FRONT_BACK - i + STEP_OFFSET, REAR_BACK - i - STEP_OFFSET, FRONT_FWD + i, REAR_FWD + i],
        |i| [FRONT_FWD + i - STEP_OFFSET, REAR_FWD + i + STEP_OFFSET, FRONT_BACK - i, REAR_BACK - i],
    );
}

// ---------------------------------------------------------------------------
// Turning: each diagonal pair twists out and back in turn.
// ---------------------------------------------------------------------------
const N: i32 = NEUTRAL_ANGLE;
const M: i32 = SWING_ANGLE_M;

fn pair_a_out(i: i32) -> [i32; 4] {
    [N - i, N + i, H, H]
}

fn pair_b_out(i: i32) -> [i32; 4] {
    [H, H, N - i, N + i]
}

fn pair_a_back(i: i32) -> [i32; 4] {
    [N - M + i, N + M - i, H, H]
}

fn pair_b_back(i: i32) -> [i32; 4] {
    [H, H, N - M + i, N + M - i]
}

fn spin(c: &mut Choreographer, repeats: usize, phases: [fn(i32) -> [i32; 4]; 4]) {
    c.pose(Keyframe::uniform(NEUTRAL_ANGLE), ACTION_SPEED_SLOW_FAST_MS);
    for _ in 0..repeats {
        for phase in phases {
            c.sweep(1..=M, SPIN_STEP_MS, phase).pause(SPIN_PAUSE_MS);
        }
    }
    c.pose(Keyframe::standby(), ACTION_SPEED_SLOW_FAST_MS);
}

/// Turn right.
fn spin_clockwise(c: &mut Choreographer, repeats: usize) {
    spin(c, repeats, [pair_a_out, pair_b_out, pair_a_back, pair_b_back]);
}

/// Turn left.
fn spin_anticlockwise(c: &mut Choreographer, repeats: usize) {
    spin(c, repeats, [pair_b_out, pair_a_out, pair_b_back, pair_a_back]);
}

// ---------------------------------------------------------------------------
// Static poses
// ---------------------------------------------------------------------------
fn stand(c: &mut Choreographer) {
    c.pose(Keyframe::standby(), ACTION_SPEED_MID_MS)
        .pose(Keyframe::standby(), ACTION_SPEED_SLOW_MS);
}

fn sit(c: &mut Choreographer) {
    c.row([110, 40, 110, 40], ACTION_SPEED_SLOW_MS);
}

fn get_down(c: &mut Choreographer) {
    c.row([50, 130, 50, 130], ACTION_SPEED_SLOW_MS);
}

// ---------------------------------------------------------------------------
// Composite actions
// ---------------------------------------------------------------------------
const F: i32 = STANDBY_FRONT_ANGLE;
const R: i32 = STANDBY_REAR_ANGLE;

fn jump(c: &mut Choreographer) {
    c.pose(Keyframe::standby(), ACTION_SPEED_FAST_MS)
        .row([N + SWING_ANGLE_S, N - SWING_ANGLE_L, N + SWING_ANGLE_S, N - SWING_ANGLE_L], ACTION_SPEED_SLOW_MS)
        .row([H, R, H, R], WALK_STEP_MS)
        .row([F, H, F, H], ACTION_SPEED_SLOW_MS);
}

fn handshake(c: &mut Choreographer) {
    c.pose(Keyframe::standby(), ACTION_SPEED_FAST_MS);
    // Sit back on the rear legs.
    c.sweep(1..=HANDSHAKE_LIFT, SPIN_STEP_MS, |i| [H, R - i, H, R - i])
        .pause(ACTION_SPEED_MID_MS);
    for _ in 0..HANDSHAKE_WAVES {
        c.row([H, H, 0, H], PAW_WAVE_MS).row([H, H, SWING_ANGLE_S, H], PAW_WAVE_MS);
    }
    c.row([H, H, F, H], 2 * WALK_STEP_MS);
    c.sweep(1..=HANDSHAKE_LIFT, SPIN_STEP_MS, |i| [H, F + i, H, F + i]);
}

fn dance(c: &mut Choreographer) {
    c.pose(Keyframe::standby(), ACTION_SPEED_FAST_MS);
    for _ in 0..DANCE_CYCLES {
        c.sweep((0..15).step_by(3), SWAY_STEP_MS, |i| [F + i, R - i, F - i, R + i])
            .sweep((0..30).step_by(3), SWAY_STEP_MS, |i| [F + 15 - i, R - 15 + i, F - 15 + i, R + 15 - i])
            .sweep((0..15).step_by(3), SWAY_STEP_MS, |i| [F - 15 + i, R + 15 - i, F + 15 - i, R - 15 + i]);
    }
}

fn dragon_boat(c: &mut Choreographer) {
    c.pose(Keyframe::uniform(NEUTRAL_ANGLE), ACTION_SPEED_FAST_MS);
    for _ in 0..DRAGONBOAT_CYCLES {
        c.sweep((0..45).step_by(3), SWAY_STEP_MS, |i| [N - i, N + i, N - i, N + i])
            .sweep((0..90).step_by(3), SWAY_STEP_MS, |i| [45 + i, 135 - i, 45 + i, 135 - i])
            .sweep((0..45).step_by(3), SWAY_STEP_MS, |i| [135 - i, 45 + i, 135 - i, 45 + i]);
    }
    c.pose(Keyframe::standby(), ACTION_SPEED_FAST_MS);
}

fn stretch(c: &mut Choreographer) {
    c.pose(Keyframe::standby(), ACTION_SPEED_MID_MS)
        .row([H, STRETCH_REAR, H, STRETCH_REAR], ACTION_SPEED_MID_MS);
    for _ in 0..STRETCH_PUSHES {
        c.row([H, STRETCH_REAR, H, STRETCH_REAR_FULL], ACTION_SPEED_FAST_MS)
            .row([H, STRETCH_REAR_FULL, H, STRETCH_REAR], ACTION_SPEED_FAST_MS);
    }
    c.pose(Keyframe::standby(), ACTION_SPEED_MID_MS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gait::keyframe::LegTarget;

    fn frames(action: Action) -> Vec<Keyframe> {
        Trajectory::for_action(action).iter().map(|s| s.frame).collect()
    }

    #[test]
    fn none_has_no_steps() {
        assert!(Trajectory::for_action(Action::None).is_empty());
    }

    #[test]
    fn every_action_has_steps_within_servo_range() {
        for action in Action::ALL {
            let t = Trajectory::for_action(action);
            assert!(!t.is_empty(), "{action}");
            for step in &t {
                assert!(!step.frame.is_hold_only(), "{action}: empty frame");
                for target in step.frame.0 {
                    if let LegTarget::Angle(a) = target {
                        assert!((0..=180).contains(&a), "{action}: angle {a}");
                    }
                }
            }
        }
    }

    #[test]
    fn stand_and_sit_poses() {
        let stand = Trajectory::for_action(Action::Stand);
        assert_eq!(
            stand.steps(),
            &[
                Step { frame: Keyframe::new([70, 110, 70, 110]), delay_ms: 500 },
                Step { frame: Keyframe::new([70, 110, 70, 110]), delay_ms: 800 },
            ]
        );
        let sit = Trajectory::for_action(Action::Sit);
        assert_eq!(sit.steps(), &[Step { frame: Keyframe::new([110, 40, 110, 40]), delay_ms: 800 }]);
        assert_eq!(frames(Action::GetDown), vec![Keyframe::new([50, 130, 50, 130])]);
    }

    #[test]
    fn forward_walk_shape() {
        let t = Trajectory::for_action(Action::Forward);
        // standby + 6 strides of two 40-step sweeps + 20-step settle + standby
        assert_eq!(t.len(), 1 + 6 * 80 + 20 + 1);
        assert_eq!(t.duration_ms(), 10 + 6 * (80 * 10 + 20) + 20 * 10 + 10);

        let f = frames(Action::Forward);
        assert_eq!(f[0], Keyframe::standby());
        assert_eq!(f[1], Keyframe::new([89, 129, 56, 86]));
        assert_eq!(f[40], Keyframe::new([50, 90, 95, 125]));
        assert_eq!(f[41], Keyframe::new([51, 91, 84, 134]));
        assert_eq!(*f.last().unwrap(), Keyframe::standby());
    }

    #[test]
    fn backward_mirrors_the_skew() {
        let f = frames(Action::Backward);
        assert_eq!(f[1], Keyframe::new([94, 124, 51, 91]));
        assert_eq!(f[41], Keyframe::new([46, 96, 89, 129]));
        assert_eq!(*f.last().unwrap(), Keyframe::standby());
    }

    #[test]
    fn sweep_pauses_extend_last_step() {
        let t = Trajectory::for_action(Action::Forward);
        assert_eq!(t.steps()[40].delay_ms, 20);
        assert_eq!(t.steps()[39].delay_ms, 10);
    }

    #[test]
    fn turn_and_spin_differ_only_in_repetitions() {
        let right = Trajectory::for_action(Action::Right);
        let spin = Trajectory::for_action(Action::Spin);
        assert_eq!(right.len(), 1 + 4 * 4 * 30 + 1);
        assert_eq!(spin.len(), 1 + 16 * 4 * 30 + 1);
        assert_eq!(right.steps()[..121], spin.steps()[..121]);
    }

    #[test]
    fn left_starts_with_the_other_pair() {
        let left = frames(Action::Left);
        let right = frames(Action::Right);
        assert_eq!(left[0], Keyframe::uniform(90));
        assert_eq!(right[1], Keyframe::from_raw([89, 91, H, H]));
        assert_eq!(left[1], Keyframe::from_raw([H, H, 89, 91]));
        assert_eq!(*left.last().unwrap(), Keyframe::standby());
    }

    #[test]
    fn jump_sequence() {
        let t = Trajectory::for_action(Action::Jump);
        let delays: Vec<u32> = t.iter().map(|s| s.delay_ms).collect();
        assert_eq!(delays, vec![150, 800, 10, 800]);
        assert_eq!(t.steps()[1].frame, Keyframe::new([100, 40, 100, 40]));
        assert_eq!(t.steps()[2].frame, Keyframe::from_raw([H, 110, H, 110]));
    }

    #[test]
    fn handshake_waves_front_right_paw() {
        let f = frames(Action::Handshake);
        assert_eq!(f.len(), 1 + 40 + 2 * 11 + 1 + 40);
        let waves = &f[41..63];
        for pair in waves.chunks(2) {
            assert_eq!(pair[0], Keyframe::from_raw([H, H, 0, H]));
            assert_eq!(pair[1], Keyframe::from_raw([H, H, 10, H]));
        }
    }

    #[test]
    fn stretch_alternates_rear_legs() {
        let f = frames(Action::Stretch);
        assert_eq!(f.len(), 2 + 2 * 6 + 1);
        assert_eq!(f[2], Keyframe::from_raw([H, 140, H, 165]));
        assert_eq!(f[3], Keyframe::from_raw([H, 165, H, 140]));
        assert_eq!(*f.last().unwrap(), Keyframe::standby());
    }

    #[test]
    fn dance_and_dragon_boat_cycle_counts() {
        // 5 + 10 + 5 rows per dance cycle, 15 + 30 + 15 per rowing cycle.
        assert_eq!(Trajectory::for_action(Action::Dance).len(), 1 + 9 * 20);
        assert_eq!(Trajectory::for_action(Action::DragonBoat).len(), 1 + 9 * 60 + 1);
    }
}
