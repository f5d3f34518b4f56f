//! Shared FIFO between submitters and workers.
//!
//! Entries are either real tasks or shutdown requests. Only tasks count
//! towards the pending total that [`TaskQueue::join_timeout`] waits on; a task stays
//! pending from the moment it is pushed until a worker calls
//! [`TaskQueue::mark_done`] for it.

use super::task::Task;
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A queue entry.
pub(crate) enum Entry<T> {
    Task(Task<T>),
    /// Tells exactly one worker to exit.
    Shutdown,
}

impl<T> Entry<T> {
    fn is_task(&self) -> bool {
        matches!(self, Entry::Task(_))
    }
}

pub(crate) struct TaskQueue<T> {
    sender: Sender<Entry<T>>,
    receiver: Receiver<Entry<T>>,
    capacity: Option<usize>,
    pending: Mutex<usize>,
    drained: Condvar,
}

impl<T> TaskQueue<T> {
    /// Create a queue. `None` capacity means unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        let (sender, receiver) = match capacity {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };

        Self {
            sender,
            receiver,
            capacity,
            pending: Mutex::new(0),
            drained: Condvar::new(),
        }
    }

    /// Enqueue an entry, waiting up to `timeout` for space.
    ///
    /// An unbounded queue never waits.
    pub fn push(&self, entry: Entry<T>, timeout: Duration) -> Result<()> {
        let is_task = entry.is_task();
        if is_task {
            *self.pending.lock() += 1;
        }

        match self.sender.send_timeout(entry, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                if is_task {
                    self.mark_done();
                }
                Err(Error::QueueFull { timeout })
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                if is_task {
                    self.mark_done();
                }
                Err(Error::Closed)
            }
        }
    }

    /// Dequeue an entry, waiting up to `timeout`. `None` means nothing arrived.
    pub fn pop(&self, timeout: Duration) -> Option<Entry<T>> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub fn try_pop(&self) -> Option<Entry<T>> {
        self.receiver.try_recv().ok()
    }

    /// Release one pending task.
    pub fn mark_done(&self) {
        let mut pending = self.pending.lock();
        debug_assert!(*pending > 0, "mark_done without a pending task");
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.drained.notify_all();
        }
    }

    /// Block until no task is pending or `timeout` passes.
    ///
    /// Returns true if the pending count reached zero.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.pending.lock();
        while *pending > 0 {
            if self.drained.wait_until(&mut pending, deadline).timed_out() {
                return *pending == 0;
            }
        }
        true
    }

    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }

    /// Entries currently sitting in the channel, shutdown requests included.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
