// RoboDog - Host Simulation Backends
//
// Stand-ins for the board's PWM channels and FreeRTOS delay, used by the test
// suite and by the host build of the firmware binary. Every PWM operation is
// appended to a shared log so servo output can be read back.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::config::GaitConfig;
use crate::drivers::bank::{ServoBank, LEG_COUNT};
use crate::drivers::pwm::{PwmChannel, PwmConfig};

// ---------------------------------------------------------------------------
// Simulated PWM
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmOp {
    Init(PwmConfig),
    Set(PwmConfig),
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmWrite {
    pub channel: usize,
    pub op: PwmOp,
}

#[derive(Debug, thiserror::Error)]
#[error("simulated PWM fault on channel {channel}")]
pub struct SimPwmError {
    pub channel: usize,
}

#[derive(Default)]
struct LogInner {
    entries: Vec<PwmWrite>,
    failing: HashSet<usize>,
}

/// Shared, cloneable record of every simulated PWM operation.
#[derive(Clone, Default)]
pub struct PwmLog {
    inner: Arc<Mutex<LogInner>>,
}

impl PwmLog {
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entries(&self) -> Vec<PwmWrite> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duty values committed with `set_config`, in order, across all channels.
    pub fn duty_writes(&self) -> Vec<(usize, u32)> {
        self.lock()
            .entries
            .iter()
            .filter_map(|w| match w.op {
                PwmOp::Set(cfg) => Some((w.channel, cfg.duty)),
                _ => None,
            })
            .collect()
    }

    /// Last duty the channel was initialised or set to.
    pub fn last_duty(&self, channel: usize) -> Option<u32> {
        self.lock().entries.iter().rev().find_map(|w| match w.op {
            PwmOp::Init(cfg) | PwmOp::Set(cfg) if w.channel == channel => Some(cfg.duty),
            _ => None,
        })
    }

    /// Make `init` / `set_config` on `channel` fail from now on.
    pub fn fail_channel(&self, channel: usize) {
        self.lock().failing.insert(channel);
    }

    pub fn heal_channel(&self, channel: usize) {
        self.lock().failing.remove(&channel);
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn record(&self, channel: usize, op: PwmOp) -> Result<(), SimPwmError> {
        let mut inner = self.lock();
        let fallible = matches!(op, PwmOp::Init(_) | PwmOp::Set(_));
        if fallible && inner.failing.contains(&channel) {
            return Err(SimPwmError { channel });
        }
        inner.entries.push(PwmWrite { channel, op });
        Ok(())
    }
}

pub struct SimPwm {
    channel: usize,
    log: PwmLog,
}

impl SimPwm {
    pub fn new(channel: usize, log: PwmLog) -> Self {
        Self { channel, log }
    }
}

impl PwmChannel for SimPwm {
    type Error = SimPwmError;

    fn init(&mut self, config: &PwmConfig) -> Result<(), SimPwmError> {
        self.log.record(self.channel, PwmOp::Init(*config))
    }

    fn set_config(&mut self, config: &PwmConfig) -> Result<(), SimPwmError> {
        self.log.record(self.channel, PwmOp::Set(*config))
    }

    fn start(&mut self) -> Result<(), SimPwmError> {
        self.log.record(self.channel, PwmOp::Start)
    }

    fn stop(&mut self) -> Result<(), SimPwmError> {
        self.log.record(self.channel, PwmOp::Stop)
    }
}

/// One simulated channel per leg, all writing into `log`.
pub fn sim_channels(log: &PwmLog) -> [SimPwm; LEG_COUNT] {
    std::array::from_fn(|i| SimPwm::new(i, log.clone()))
}

/// Four simulated legs with the default channel table and calibration.
pub fn sim_bank(log: &PwmLog) -> ServoBank<SimPwm> {
    ServoBank::from_config(sim_channels(log), &GaitConfig::default())
}

// ---------------------------------------------------------------------------
// Delays
// ---------------------------------------------------------------------------

/// Real-time delay on top of `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms.into()));
    }
}

/// Returns immediately but accumulates the requested time, so trajectories
/// can be executed at full speed and their timing inspected.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    total_ns: Arc<AtomicU64>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ns.load(Ordering::SeqCst) / 1_000_000
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns.fetch_add(ns.into(), Ordering::SeqCst);
    }

    fn delay_us(&mut self, us: u32) {
        self.total_ns.fetch_add(u64::from(us) * 1_000, Ordering::SeqCst);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns.fetch_add(u64::from(ms) * 1_000_000, Ordering::SeqCst);
    }
}
