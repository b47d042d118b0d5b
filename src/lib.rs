// RoboDog - Quadruped Gait Controller
//
// Four hobby servos, one per leg, driven by canned trajectories. Callers queue
// actions through `GaitController`; a dedicated thread plays them back in
// order.

pub mod action;
pub mod config;
pub mod controller;
pub mod drivers;
pub mod error;
pub mod gait;
pub mod queue;
pub mod sim;
pub mod tasks;

pub use action::{Action, MotionEvent, ACTION_MAX};
pub use config::GaitConfig;
pub use controller::{ActionHandle, GaitController};
pub use drivers::bank::{Leg, ServoBank, LEG_COUNT};
pub use error::ActionError;
