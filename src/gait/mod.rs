pub mod choreography;
pub mod keyframe;

pub use choreography::{Step, Trajectory};
pub use keyframe::{Keyframe, LegTarget};
