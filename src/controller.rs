// RoboDog - Gait Controller
//
// Public entry point for motion. `init` brings up the servos and spawns the
// action task, `set` queues actions for it, `stop` winds it down again.
//
// Thread layout:
//   caller(s) --set--> Mutex<ActionQueue> --pop--> action_task --> ServoBank
//                         |  Condvar wake  ^
//                         +----------------+

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use embedded_hal::delay::DelayNs;

use crate::action::{Action, MotionEvent};
use crate::config::GaitConfig;
use crate::drivers::bank::{ServoBank, LEG_COUNT};
use crate::drivers::pwm::PwmChannel;
use crate::error::ActionError;
use crate::queue::ActionQueue;
use crate::tasks::action::ActionTask;
use crate::tasks::demo::DemoTask;

// ---------------------------------------------------------------------------
// State shared between callers and the action task
// ---------------------------------------------------------------------------

pub(crate) struct Shared {
    pub(crate) queue: Mutex<ActionQueue>,
    pub(crate) wake: Condvar,
    /// Only written while `queue` is locked, so a `set` that saw it set is
    /// guaranteed to land before `stop` clears the queue.
    pub(crate) running: AtomicBool,
}

impl Shared {
    pub(crate) fn new(queue: ActionQueue) -> Self {
        Self { queue: Mutex::new(queue), wake: Condvar::new(), running: AtomicBool::new(false) }
    }

    pub(crate) fn lock_queue(&self) -> MutexGuard<'_, ActionQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Action handle - cloneable producer side
// ---------------------------------------------------------------------------

/// Lets other threads (voice or tool handlers, the demo task) queue actions
/// without owning the controller.
#[derive(Clone)]
pub struct ActionHandle {
    shared: Arc<Shared>,
}

impl ActionHandle {
    /// Queue `action` for execution. Returns as soon as it is queued.
    pub fn set(&self, action: Action) -> Result<(), ActionError> {
        if !action.is_executable() {
            log::warn!("Rejected action {}", action);
            return Err(ActionError::InvalidParam);
        }

        let mut queue = self.shared.lock_queue();
        if !self.shared.running.load(Ordering::SeqCst) {
            return Err(ActionError::NotRunning);
        }
        queue.add_tail(action)?;
        drop(queue);

        self.shared.wake.notify_one();
        log::debug!("Queued {}", action);
        Ok(())
    }

    /// Same as [`set`](Self::set) for a raw action code.
    pub fn set_raw(&self, code: u8) -> Result<(), ActionError> {
        let action = Action::from_raw(code).inspect_err(|_| {
            log::warn!("Rejected action code {}", code);
        })?;
        self.set(action)
    }

    pub fn pending(&self) -> usize {
        self.shared.lock_queue().len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

enum Worker<P: PwmChannel, D> {
    /// Hardware handles are here, no thread running.
    Parked { bank: ServoBank<P>, delay: D },
    Running(JoinHandle<(ServoBank<P>, D)>),
    /// The thread died without handing the hardware back.
    Lost,
}

pub struct GaitController<P, D>
where
    P: PwmChannel + Send + 'static,
    D: DelayNs + Send + 'static,
{
    config: GaitConfig,
    shared: Arc<Shared>,
    worker: Worker<P, D>,
    events: Option<Sender<MotionEvent>>,
    /// Bring-up demo started by the current run, if any.
    demo: Option<DemoTask>,
}

impl<P, D> GaitController<P, D>
where
    P: PwmChannel + Send + 'static,
    D: DelayNs + Send + 'static,
{
    pub fn new(bank: ServoBank<P>, delay: D, config: GaitConfig) -> Self {
        let shared = Arc::new(Shared::new(ActionQueue::new(config.queue_capacity)));
        Self { config, shared, worker: Worker::Parked { bank, delay }, events: None, demo: None }
    }

    /// Report action progress on `events` from the next `init` onwards.
    pub fn with_events(mut self, events: Sender<MotionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Initialise every servo channel and start the action task.
    ///
    /// After a `stop` this can be called again; the channels come back up at
    /// the last pose they held. If the thread cannot be spawned the servo bank
    /// is dropped with it and every later `init` / `stop` returns `WorkerLost`.
    pub fn init(&mut self) -> Result<(), ActionError> {
        self.config.validate()?;

        let (mut bank, delay) = match std::mem::replace(&mut self.worker, Worker::Lost) {
            Worker::Parked { bank, delay } => (bank, delay),
            Worker::Running(handle) => {
                self.worker = Worker::Running(handle);
                return Err(ActionError::AlreadyRunning);
            }
            Worker::Lost => return Err(ActionError::WorkerLost),
        };

        if let Err(e) = bank.init_hardware() {
            self.worker = Worker::Parked { bank, delay };
            return Err(e);
        }

        {
            let mut queue = self.shared.lock_queue();
            queue.init();
            self.shared.running.store(true, Ordering::SeqCst);
        }

        let task = ActionTask::new(
            Arc::clone(&self.shared),
            bank,
            delay,
            self.events.clone(),
            self.config.idle_poll,
            self.config.cancel_slice_ms,
        );
        let spawned = thread::Builder::new()
            .name("action_task".into())
            .stack_size(self.config.stack_size)
            .spawn(move || task.run());

        match spawned {
            Ok(handle) => self.worker = Worker::Running(handle),
            Err(e) => {
                let _queue = self.shared.lock_queue();
                self.shared.running.store(false, Ordering::SeqCst);
                log::error!("Failed to spawn action task: {}", e);
                return Err(ActionError::Spawn(e));
            }
        }

        #[cfg(feature = "action-demo")]
        {
            match crate::tasks::demo::spawn(self.handle()) {
                Ok(demo) => self.demo = Some(demo),
                Err(e) => log::warn!("Demo task not started: {}", e),
            }
        }

        log::info!("Gait controller initialised");
        Ok(())
    }

    pub fn set(&self, action: Action) -> Result<(), ActionError> {
        self.handle().set(action)
    }

    pub fn set_raw(&self, code: u8) -> Result<(), ActionError> {
        self.handle().set_raw(code)
    }

    pub fn handle(&self) -> ActionHandle {
        ActionHandle { shared: Arc::clone(&self.shared) }
    }

    /// Actions queued but not yet started.
    pub fn pending(&self) -> usize {
        self.shared.lock_queue().len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Last committed duty per leg. Only available while parked, the running
    /// task owns the bank otherwise.
    pub fn duties(&self) -> Option<[u32; LEG_COUNT]> {
        match &self.worker {
            Worker::Parked { bank, .. } => Some(bank.duties()),
            _ => None,
        }
    }

    /// Stop the action task at the next step boundary and drop everything
    /// still queued. The servos keep holding their last pose.
    pub fn stop(&mut self) -> Result<(), ActionError> {
        let handle = match std::mem::replace(&mut self.worker, Worker::Lost) {
            Worker::Running(handle) => handle,
            Worker::Parked { bank, delay } => {
                log::debug!("stop: action task not running");
                self.worker = Worker::Parked { bank, delay };
                return Ok(());
            }
            Worker::Lost => return Err(ActionError::WorkerLost),
        };

        // Join the demo first so none of its actions outlive this run.
        if let Some(demo) = self.demo.take() {
            demo.stop();
        }

        {
            let _queue = self.shared.lock_queue();
            self.shared.running.store(false, Ordering::SeqCst);
            self.shared.wake.notify_all();
        }

        let joined = handle.join();
        let dropped = self.shared.lock_queue().clear();
        if dropped > 0 {
            log::info!("Discarded {} pending actions", dropped);
        }

        match joined {
            Ok((bank, delay)) => {
                self.worker = Worker::Parked { bank, delay };
                log::info!("Gait controller stopped");
                Ok(())
            }
            Err(_) => {
                log::error!("Action task panicked, servo hardware lost");
                Err(ActionError::WorkerLost)
            }
        }
    }

    /// Turn every PWM output off. Only valid once stopped.
    pub fn shutdown_outputs(&mut self) -> Result<(), ActionError> {
        match &mut self.worker {
            Worker::Parked { bank, .. } => {
                bank.shutdown();
                log::info!("Servo outputs off");
                Ok(())
            }
            Worker::Running(_) => Err(ActionError::AlreadyRunning),
            Worker::Lost => Err(ActionError::WorkerLost),
        }
    }
}

impl<P, D> Drop for GaitController<P, D>
where
    P: PwmChannel + Send + 'static,
    D: DelayNs + Send + 'static,
{
    fn drop(&mut self) {
        if matches!(self.worker, Worker::Running(_)) {
            if let Err(e) = self.stop() {
                log::error!("stop on drop failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{sim_bank, PwmLog, RecordingDelay, SimPwm};

    fn controller(log: &PwmLog) -> GaitController<SimPwm, RecordingDelay> {
        GaitController::new(sim_bank(log), RecordingDelay::new(), GaitConfig::default())
    }

    #[test]
    fn set_before_init_is_not_running() {
        let log = PwmLog::default();
        let ctl = controller(&log);
        assert!(matches!(ctl.set(Action::Stand), Err(ActionError::NotRunning)));
        assert_eq!(ctl.pending(), 0);
    }

    #[test]
    fn invalid_action_checked_before_running_state() {
        let log = PwmLog::default();
        let ctl = controller(&log);
        assert!(matches!(ctl.set(Action::None), Err(ActionError::InvalidParam)));
        assert!(matches!(ctl.set_raw(14), Err(ActionError::InvalidParam)));
    }

    #[test]
    fn init_twice_is_rejected() {
        let log = PwmLog::default();
        let mut ctl = controller(&log);
        ctl.init().unwrap();
        assert!(matches!(ctl.init(), Err(ActionError::AlreadyRunning)));
        ctl.stop().unwrap();
    }

    #[test]
    fn failed_hardware_init_keeps_controller_usable() {
        let log = PwmLog::default();
        let mut ctl = controller(&log);
        log.fail_channel(2);
        assert!(matches!(ctl.init(), Err(ActionError::Pwm { .. })));
        assert!(!ctl.is_running());

        log.heal_channel(2);
        ctl.init().unwrap();
        assert!(ctl.is_running());
        ctl.stop().unwrap();
    }

    #[test]
    fn invalid_config_is_rejected_before_touching_hardware() {
        let log = PwmLog::default();
        let config = GaitConfig { queue_capacity: 0, ..GaitConfig::default() };
        let mut ctl = GaitController::new(sim_bank(&log), RecordingDelay::new(), config);
        assert!(matches!(ctl.init(), Err(ActionError::InvalidConfig(_))));
        assert!(log.is_empty());
    }

    #[test]
    fn outputs_only_shut_down_when_parked() {
        let log = PwmLog::default();
        let mut ctl = controller(&log);
        ctl.init().unwrap();
        assert!(matches!(ctl.shutdown_outputs(), Err(ActionError::AlreadyRunning)));
        ctl.stop().unwrap();
        ctl.shutdown_outputs().unwrap();
        assert_eq!(log.entries().iter().filter(|w| w.op == crate::sim::PwmOp::Stop).count(), LEG_COUNT);
    }

    #[test]
    fn spawn_failure_loses_the_bank() {
        let log = PwmLog::default();
        let config = GaitConfig { stack_size: usize::MAX / 2, ..GaitConfig::default() };
        let mut ctl = GaitController::new(sim_bank(&log), RecordingDelay::new(), config);

        assert!(matches!(ctl.init(), Err(ActionError::Spawn(_))));
        assert!(!ctl.is_running());
        assert!(matches!(ctl.set(Action::Stand), Err(ActionError::NotRunning)));
        assert!(matches!(ctl.init(), Err(ActionError::WorkerLost)));
        assert!(matches!(ctl.stop(), Err(ActionError::WorkerLost)));
        assert_eq!(ctl.duties(), None);
    }

    #[test]
    fn stop_when_parked_is_a_no_op() {
        let log = PwmLog::default();
        let mut ctl = controller(&log);
        ctl.stop().unwrap();
        assert_eq!(ctl.duties(), Some([639, 639, 861, 861]));
    }
}
