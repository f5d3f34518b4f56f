// worker thread loop
use super::pool::Shared;
use super::queue::Entry;
use super::task::{Task, TaskError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

pub type WorkerId = usize;

/// Why a worker left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitReason {
    Shutdown,
    Stopped,
    Interrupted,
}

pub(crate) struct Worker<T> {
    pub id: WorkerId,
    interrupted: Arc<AtomicBool>,
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Worker<T> {
    pub fn new(id: WorkerId, interrupted: Arc<AtomicBool>, shared: Arc<Shared<T>>) -> Self {
        Self {
            id,
            interrupted,
            shared,
        }
    }

    // main loop
    pub fn run(&self) -> ExitReason {
        debug!(worker = self.id, "worker started");

        let reason = loop {
            // checked again after every bounded wait and every task
            if self.shared.stop.load(Ordering::Acquire) {
                break ExitReason::Stopped;
            }
            if self.interrupted.load(Ordering::Acquire) {
                break ExitReason::Interrupted;
            }

            match self.shared.queue.pop(self.shared.timeout) {
                None => continue,
                Some(Entry::Shutdown) => break ExitReason::Shutdown,
                Some(Entry::Task(task)) => self.execute_task(task),
            }
        };

        debug!(worker = self.id, reason = ?reason, "worker exiting");
        reason
    }

    fn execute_task(&self, task: Task<T>) {
        let id = task.id;
        let queued_ns = task.enqueued_at.elapsed().as_nanos() as u64;
        let start = Instant::now();

        let outcome = self.shared.panic_handler.execute(|| task.execute());

        let duration_ns = start.elapsed().as_nanos() as u64;
        let metrics = &self.shared.metrics;
        metrics.record_queue_wait(queued_ns);
        metrics.record_task_execution(duration_ns);

        match outcome {
            Ok(Ok(value)) => {
                trace!(worker = self.id, task = %id, duration_ns, "task completed");
                self.shared.record_success(id, value);
            }
            Ok(Err(source)) => {
                metrics.record_task_failure();
                self.shared.record_failure(TaskError::failed(id, source));
            }
            Err(panic) => {
                metrics.record_task_panic();
                self.shared
                    .record_failure(TaskError::panicked(id, panic.message));
            }
        }

        self.shared.queue.mark_done();
    }
}
