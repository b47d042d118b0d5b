// RoboDog - Error Types

use std::io;

use crate::drivers::bank::Leg;

/// Boxed driver error, so the controller is not generic over the HAL's error type.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Out-of-range action code, or `Action::None`.
    #[error("invalid action parameter")]
    InvalidParam,

    /// The pending queue is at capacity; the action was dropped.
    #[error("action queue full ({capacity} pending)")]
    QueueFull { capacity: usize },

    #[error("{leg} servo PWM write failed")]
    Pwm {
        leg: Leg,
        #[source]
        source: DriverError,
    },

    #[error("invalid servo configuration: {0}")]
    InvalidConfig(String),

    #[error("action task is not running")]
    NotRunning,

    #[error("action task is already running")]
    AlreadyRunning,

    #[error("failed to spawn action task")]
    Spawn(#[source] io::Error),

    /// The execution thread panicked and took the servo handles with it.
    #[error("action task exited abnormally, servo hardware unavailable")]
    WorkerLost,
}

impl ActionError {
    pub(crate) fn pwm<E>(leg: Leg, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Pwm { leg, source: Box::new(source) }
    }
}
