//! One-shot completion slot shared between a background task and its waiters.

use parking_lot::{Condvar, Mutex};

/// A value that is produced once and can be polled or waited on by any
/// number of threads.
#[derive(Debug)]
pub struct Completion<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T: Clone> Completion<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Stores the value and wakes every waiter. Only the first call wins.
    pub fn complete(&self, value: T) {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(value);
            self.ready.notify_all();
        }
    }

    pub fn is_complete(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Non-blocking poll.
    pub fn try_get(&self) -> Option<T> {
        self.slot.lock().clone()
    }

    /// Blocks until the value has been produced.
    pub fn wait(&self) -> T {
        let mut slot = self.slot.lock();
        loop {
            if let Some(value) = slot.as_ref() {
                return value.clone();
            }
            self.ready.wait(&mut slot);
        }
    }
}

impl<T: Clone> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}
