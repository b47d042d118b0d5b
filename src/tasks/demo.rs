// RoboDog - Bring-up Demo Task
//
// Walks through every action once after power-up so a freshly assembled robot
// can be checked without a voice front end. Enabled with the `action-demo`
// feature; the host binary also uses it.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::action::Action;
use crate::config::STACK_DEMO;
use crate::controller::ActionHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoStep {
    Wait(u64),
    Queue(Action),
}

const SETTLE_MS: u64 = 5000;
const GAP_MS: u64 = 2000;
/// Waits are cut into slices of this length so a cancel is seen promptly.
const CANCEL_SLICE_MS: u64 = 100;

pub const DEMO_SEQUENCE: &[DemoStep] = &[
    DemoStep::Wait(SETTLE_MS),
    DemoStep::Queue(Action::Forward),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Backward),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Left),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Stand),
    DemoStep::Queue(Action::Right),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Stand),
    DemoStep::Queue(Action::Handshake),
    DemoStep::Queue(Action::Stand),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Sit),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Stand),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::GetDown),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Stand),
    DemoStep::Queue(Action::Dance),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Stand),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Stretch),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Stand),
    DemoStep::Wait(GAP_MS),
    DemoStep::Queue(Action::Jump),
];

/// Play `steps` against `handle`, sleeping with `sleep` for waits. Returns how
/// many actions were queued. Stops early once `cancel` is set or an action is
/// rejected (usually because the controller stopped).
pub fn run_sequence<F>(handle: &ActionHandle, steps: &[DemoStep], cancel: &AtomicBool, mut sleep: F) -> usize
where
    F: FnMut(Duration),
{
    let mut queued = 0;
    for step in steps {
        match *step {
            DemoStep::Wait(ms) => {
                let mut left = ms;
                while left > 0 {
                    if cancel.load(Ordering::SeqCst) {
                        log::info!("Demo cancelled");
                        return queued;
                    }
                    let slice = left.min(CANCEL_SLICE_MS);
                    sleep(Duration::from_millis(slice));
                    left -= slice;
                }
            }
            DemoStep::Queue(action) => {
                if cancel.load(Ordering::SeqCst) {
                    log::info!("Demo cancelled");
                    return queued;
                }
                match handle.set(action) {
                    Ok(()) => queued += 1,
                    Err(e) => {
                        log::warn!("Demo stopped at {}: {}", action, e);
                        return queued;
                    }
                }
            }
        }
    }
    queued
}

pub fn demo_task(handle: ActionHandle, cancel: Arc<AtomicBool>) {
    log::info!("Demo task started");
    let queued = run_sequence(&handle, DEMO_SEQUENCE, &cancel, thread::sleep);
    log::info!("Demo task finished, {} actions queued", queued);
}

/// A running demo thread, owned by the controller run that started it.
pub struct DemoTask {
    cancel: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl DemoTask {
    /// Cancel the sequence and wait for the thread to exit. Nothing is queued
    /// by this demo once it returns.
    pub fn stop(self) {
        self.cancel.store(true, Ordering::SeqCst);
        if self.thread.join().is_err() {
            log::error!("Demo task panicked");
        }
    }
}

pub fn spawn(handle: ActionHandle) -> io::Result<DemoTask> {
    let cancel = Arc::new(AtomicBool::new(false));
    let task_cancel = Arc::clone(&cancel);
    let thread = thread::Builder::new()
        .name("demo_task".into())
        .stack_size(STACK_DEMO)
        .spawn(move || demo_task(handle, task_cancel))?;
    Ok(DemoTask { cancel, thread })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GaitConfig;
    use crate::controller::GaitController;
    use crate::sim::{sim_bank, PwmLog, RecordingDelay};

    #[test]
    fn sequence_covers_every_action() {
        for action in Action::ALL {
            assert!(
                DEMO_SEQUENCE.contains(&DemoStep::Queue(action)),
                "{action} missing from demo"
            );
        }
        assert_eq!(DEMO_SEQUENCE.first(), Some(&DemoStep::Wait(SETTLE_MS)));
    }

    #[test]
    fn stops_at_first_rejection() {
        let log = PwmLog::default();
        let ctl = GaitController::new(sim_bank(&log), RecordingDelay::new(), GaitConfig::default());
        let mut slept = Duration::ZERO;

        let queued = run_sequence(&ctl.handle(), DEMO_SEQUENCE, &AtomicBool::new(false), |d| slept += d);

        assert_eq!(queued, 0);
        assert_eq!(slept, Duration::from_millis(SETTLE_MS));
    }

    #[test]
    fn queues_everything_on_a_running_controller() {
        let log = PwmLog::default();
        let mut ctl = GaitController::new(sim_bank(&log), RecordingDelay::new(), GaitConfig::default());
        ctl.init().unwrap();

        let expected = DEMO_SEQUENCE.iter().filter(|s| matches!(s, DemoStep::Queue(_))).count();
        let queued = run_sequence(&ctl.handle(), DEMO_SEQUENCE, &AtomicBool::new(false), |_| {});

        assert_eq!(queued, expected);
        ctl.stop().unwrap();
    }

    #[test]
    fn cancel_interrupts_the_settle_wait() {
        let log = PwmLog::default();
        let mut ctl = GaitController::new(sim_bank(&log), RecordingDelay::new(), GaitConfig::default());
        ctl.init().unwrap();
        let cancel = AtomicBool::new(false);
        let mut slices = 0;

        let queued = run_sequence(&ctl.handle(), DEMO_SEQUENCE, &cancel, |_| {
            slices += 1;
            cancel.store(true, Ordering::SeqCst);
        });

        assert_eq!(queued, 0);
        assert_eq!(slices, 1);
        assert_eq!(ctl.pending(), 0);
        ctl.stop().unwrap();
    }

    #[test]
    fn stopped_demo_thread_exits_without_queueing() {
        let log = PwmLog::default();
        let mut ctl = GaitController::new(sim_bank(&log), RecordingDelay::new(), GaitConfig::default());
        ctl.init().unwrap();

        let demo = spawn(ctl.handle()).unwrap();
        let started = std::time::Instant::now();
        demo.stop();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(ctl.pending(), 0);
        assert!(log.duty_writes().is_empty());
        ctl.stop().unwrap();
    }
}
