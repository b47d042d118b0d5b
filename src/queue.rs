// RoboDog - Pending Action Queue
//
// Plain FIFO; not synchronised on its own. The controller keeps it behind a
// `Mutex` shared by `set` and the action task.

use std::collections::VecDeque;

use crate::action::Action;
use crate::error::ActionError;

#[derive(Debug)]
pub struct ActionQueue {
    pending: VecDeque<Action>,
    capacity: usize,
}

impl ActionQueue {
    pub fn new(capacity: usize) -> Self {
        Self { pending: VecDeque::with_capacity(capacity), capacity }
    }

    /// Reset to empty.
    pub fn init(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append at the tail. A full queue drops the action.
    pub fn add_tail(&mut self, action: Action) -> Result<(), ActionError> {
        if self.pending.len() >= self.capacity {
            log::error!("Action queue full, dropping {}", action);
            return Err(ActionError::QueueFull { capacity: self.capacity });
        }
        self.pending.push_back(action);
        Ok(())
    }

    pub fn pop_front(&mut self) -> Option<Action> {
        self.pending.pop_front()
    }

    pub fn peek(&self) -> Option<Action> {
        self.pending.front().copied()
    }

    /// Drop everything still pending, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}
