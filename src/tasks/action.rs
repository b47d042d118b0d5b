// RoboDog - Action Execution Task
//
// Pops one action at a time from the shared queue and plays its trajectory on
// the servo bank. While the queue is empty the task blocks on the condvar for
// at most one idle interval, so an idle robot issues no PWM writes.

use std::sync::atomic::Ordering;
use std::sync::mpsc::Sender;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::action::{Action, MotionEvent};
use crate::controller::Shared;
use crate::drivers::bank::ServoBank;
use crate::drivers::pwm::PwmChannel;
use crate::error::ActionError;
use crate::gait::Trajectory;

/// How a single action ended.
#[derive(Debug)]
enum Outcome {
    Completed,
    Cancelled,
    Aborted(ActionError),
}

pub struct ActionTask<P: PwmChannel, D: DelayNs> {
    shared: Arc<Shared>,
    bank: ServoBank<P>,
    delay: D,
    events: Option<Sender<MotionEvent>>,
    idle_poll: Duration,
    cancel_slice_ms: u32,
}

impl<P: PwmChannel, D: DelayNs> ActionTask<P, D> {
    pub(crate) fn new(
        shared: Arc<Shared>,
        bank: ServoBank<P>,
        delay: D,
        events: Option<Sender<MotionEvent>>,
        idle_poll: Duration,
        cancel_slice_ms: u32,
    ) -> Self {
        Self { shared, bank, delay, events, idle_poll, cancel_slice_ms: cancel_slice_ms.max(1) }
    }

    /// Thread body. Returns the servo bank and delay once the running flag is
    /// cleared so the controller can bring the task up again later.
    pub fn run(mut self) -> (ServoBank<P>, D) {
        log::info!("Action task started");

        while self.is_running() {
            if let Some(action) = self.next_action() {
                self.execute(action);
            }
        }

        log::info!("Action task exiting");
        (self.bank, self.delay)
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Pop the queue head, or wait up to one idle interval for something to
    /// arrive and report `None`.
    fn next_action(&self) -> Option<Action> {
        let mut queue = self.shared.lock_queue();
        if let Some(action) = queue.pop_front() {
            return Some(action);
        }
        if !self.is_running() {
            return None;
        }
        let (mut queue, _) = self
            .shared
            .wake
            .wait_timeout(queue, self.idle_poll)
            .unwrap_or_else(PoisonError::into_inner);
        queue.pop_front()
    }

    fn execute(&mut self, action: Action) {
        let trajectory = Trajectory::for_action(action);
        log::info!(
            "Executing {} ({} steps, {} ms)",
            action,
            trajectory.len(),
            trajectory.duration_ms()
        );
        self.emit(MotionEvent::Started(action));

        match self.play(&trajectory) {
            Outcome::Completed => {
                log::info!("{} done", action);
                self.emit(MotionEvent::Completed(action));
            }
            Outcome::Cancelled => {
                log::warn!("{} cancelled by stop", action);
                self.emit(MotionEvent::Cancelled(action));
            }
            Outcome::Aborted(e) => {
                let reason = match std::error::Error::source(&e) {
                    Some(source) => format!("{}: {}", e, source),
                    None => e.to_string(),
                };
                log::error!("{} aborted: {}", action, reason);
                self.emit(MotionEvent::Aborted { action, reason });
            }
        }
    }

    fn play(&mut self, trajectory: &Trajectory) -> Outcome {
        for (i, step) in trajectory.iter().enumerate() {
            if !self.is_running() {
                return Outcome::Cancelled;
            }
            log::trace!("step {} -> {:?}", i, step.frame);
            if let Err(e) = self.bank.set_all(&step.frame) {
                return Outcome::Aborted(e);
            }
            if !self.sleep(step.delay_ms) {
                return Outcome::Cancelled;
            }
        }
        Outcome::Completed
    }

    /// Sleep in cancellation slices. Returns `false` if the running flag was
    /// cleared before the full delay elapsed.
    fn sleep(&mut self, ms: u32) -> bool {
        let mut left = ms;
        while left > 0 {
            if !self.is_running() {
                return false;
            }
            let slice = left.min(self.cancel_slice_ms);
            self.delay.delay_ms(slice);
            left -= slice;
        }
        true
    }

    fn emit(&self, event: MotionEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is listening any more.
            let _ = tx.send(event);
        }
    }
}
