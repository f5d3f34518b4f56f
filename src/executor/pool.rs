use super::panic_handler::PanicHandler;
use super::queue::{Entry, TaskQueue};
use super::task::{Task, TaskError, TaskId, TaskIdGenerator};
use super::worker::{Worker, WorkerId};
use crate::config::Config;
use crate::error::{BoxError, Error, Result};
use crate::telemetry::Metrics;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::error::Error as _;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

#[cfg(feature = "telemetry")]
use crate::telemetry::MetricsSnapshot;

/// State shared between the pool handle and its workers.
pub(crate) struct Shared<T> {
    pub queue: TaskQueue<T>,
    pub returns: Mutex<BTreeMap<TaskId, T>>,
    pub exceptions: Mutex<BTreeMap<TaskId, TaskError>>,
    pub stop: AtomicBool,
    /// Workers whose thread has not finished yet.
    pub live: AtomicUsize,
    pub timeout: Duration,
    pub print_exceptions: bool,
    print_lock: Mutex<()>,
    pub panic_handler: PanicHandler,
    pub metrics: Metrics,
}

impl<T> Shared<T> {
    pub fn new(config: &Config) -> Self {
        Self {
            queue: TaskQueue::new(config.queue_capacity),
            returns: Mutex::new(BTreeMap::new()),
            exceptions: Mutex::new(BTreeMap::new()),
            stop: AtomicBool::new(false),
            live: AtomicUsize::new(0),
            timeout: config.timeout,
            print_exceptions: config.print_exceptions,
            print_lock: Mutex::new(()),
            panic_handler: PanicHandler::new(),
            metrics: Metrics::new(),
        }
    }

    pub fn record_success(&self, id: TaskId, value: T) {
        let prev = self.returns.lock().insert(id, value);
        debug_assert!(prev.is_none(), "task {} recorded twice", id);
    }

    pub fn record_failure(&self, err: TaskError) {
        debug!(task = %err.id(), error = %err, "task failed");

        if self.print_exceptions {
            let _guard = self.print_lock.lock();
            let current = thread::current();
            eprintln!("[{}] {}", current.name().unwrap_or("unknown"), err);
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
        }

        let prev = self.exceptions.lock().insert(err.id(), err);
        debug_assert!(prev.is_none(), "task failure recorded twice");
    }

    /// Fail every task still queued. Only valid once no worker is alive.
    fn cancel_leftovers(&self) -> usize {
        let mut cancelled = 0;
        while let Some(entry) = self.queue.try_pop() {
            if let Entry::Task(task) = entry {
                self.metrics.record_task_cancelled();
                self.record_failure(TaskError::cancelled(task.id));
                self.queue.mark_done();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            warn!(cancelled, "cancelled tasks left in the queue with no live worker");
        }
        cancelled
    }
}

struct WorkerHandle {
    id: WorkerId,
    interrupted: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
    }

    fn is_alive(&self) -> bool {
        self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }
}

// Decrements the live-worker count even if the worker thread unwinds.
struct LiveGuard<'a>(&'a AtomicUsize);

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A fixed-size pool of worker threads with batch-style result collection.
///
/// Tasks are closures returning `Result<T, E>`. Each submission gets the
/// next [`TaskId`]; values and errors are kept per id and read back in
/// submission order through [`returns`](Self::returns) and
/// [`exceptions`](Self::exceptions), whatever order the workers finished in.
///
/// ```no_run
/// use fixed_pool::FixedThreadPool;
///
/// let pool = FixedThreadPool::with_threads(4).unwrap();
/// for value in 0..100u64 {
///     pool.submit(move || Ok::<_, std::io::Error>(value + value)).unwrap();
/// }
/// pool.drain();
/// pool.raise_first().unwrap();
/// assert_eq!(pool.returns().len(), 100);
/// pool.close().unwrap();
/// ```
///
/// Dropping the pool calls [`close`](Self::close).
pub struct FixedThreadPool<T> {
    shared: Arc<Shared<T>>,
    workers: Mutex<Vec<WorkerHandle>>,
    ids: TaskIdGenerator,
    submitted: AtomicU64,
    /// False once the pool stops accepting work.
    open: RwLock<bool>,
    size: usize,
    config: Config,
}

impl<T: Send + 'static> FixedThreadPool<T> {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let size = config.worker_threads();
        let shared = Arc::new(Shared::new(&config));
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            match spawn_worker(id, &config, &shared) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shared.stop.store(true, Ordering::Release);
                    for handle in workers.iter_mut() {
                        if let Some(thread) = handle.thread.take() {
                            let _ = thread.join();
                        }
                    }
                    return Err(e);
                }
            }
        }

        info!(
            workers = size,
            timeout_ms = config.timeout.as_millis() as u64,
            "thread pool started"
        );

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            ids: TaskIdGenerator::new(),
            submitted: AtomicU64::new(0),
            open: RwLock::new(true),
            size,
            config,
        })
    }

    /// Pool with `n` workers and otherwise default settings.
    pub fn with_threads(n: usize) -> Result<Self> {
        Self::new(Config::builder().num_threads(n).build()?)
    }

    /// Queue `f` for execution on the next free worker.
    ///
    /// Never runs `f` on the calling thread. Fails with [`Error::Closed`]
    /// once the pool has been closed, stopped or terminated.
    pub fn submit<F, E>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        E: Into<BoxError>,
    {
        let open = self.open.read();
        if !*open {
            return Err(Error::Closed);
        }

        let id = self.ids.next();
        self.shared
            .queue
            .push(Entry::Task(Task::new(id, f)), self.shared.timeout)?;
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.metrics.record_task_submitted();
        Ok(())
    }
}

impl<T> FixedThreadPool<T> {
    /// Block until every task submitted so far has run.
    ///
    /// Workers stay alive and the pool can take more work afterwards. If no
    /// worker is left to run the remaining tasks, they are recorded as
    /// cancelled instead of blocking forever.
    pub fn drain(&self) {
        let timeout = self.shared.timeout;
        while !self.shared.queue.join_timeout(timeout) {
            if !self.is_alive() {
                self.shared.cancel_leftovers();
            }
        }
    }

    /// Bounded [`drain`](Self::drain). Returns true if everything finished.
    pub fn drain_timeout(&self, timeout: Duration) -> bool {
        self.shared.queue.join_timeout(timeout)
    }

    /// Drain, then shut every worker down and wait for it to exit.
    ///
    /// Sends exactly one shutdown entry per live worker. The pool rejects
    /// new submissions afterwards. Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        self.drain();
        *self.open.write() = false;

        // held until every worker is joined so a concurrent close waits too
        let mut workers = self.workers.lock();
        let handles = std::mem::take(&mut *workers);
        if handles.is_empty() {
            return Ok(());
        }

        let live = handles.iter().filter(|h| h.is_alive()).count();
        for _ in 0..live {
            self.push_shutdown()?;
        }

        let result = join_workers(handles);
        self.shared.cancel_leftovers();
        info!(tasks = self.task_count(), "thread pool closed");
        result
    }

    /// Raise the stop signal and wait for every worker to exit.
    ///
    /// Idle workers notice within one queue timeout; a worker in the middle
    /// of a task finishes it first. Tasks still queued are recorded as
    /// cancelled.
    pub fn stop(&self) -> Result<()> {
        *self.open.write() = false;
        self.shared.stop.store(true, Ordering::Release);

        let mut workers = self.workers.lock();
        let handles = std::mem::take(&mut *workers);
        let result = join_workers(handles);
        self.shared.cancel_leftovers();
        info!("thread pool stopped");
        result
    }

    /// Interrupt every worker between tasks, then [`close`](Self::close).
    ///
    /// A task that is already running is not interrupted.
    pub fn terminate(&self) -> Result<()> {
        *self.open.write() = false;
        for worker in self.workers.lock().iter() {
            worker.interrupt();
        }
        debug!("workers interrupted");
        self.close()
    }

    fn push_shutdown(&self) -> Result<()> {
        loop {
            match self.shared.queue.push(Entry::Shutdown, self.shared.timeout) {
                Ok(()) => return Ok(()),
                Err(Error::QueueFull { .. }) if self.is_alive() => continue,
                Err(Error::QueueFull { .. }) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Values of successful tasks, in submission order.
    pub fn returns(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.shared.returns.lock().values().cloned().collect()
    }

    /// Move the recorded values out, in submission order.
    pub fn take_returns(&self) -> Vec<T> {
        std::mem::take(&mut *self.shared.returns.lock())
            .into_values()
            .collect()
    }

    /// Errors of failed tasks, in submission order.
    pub fn exceptions(&self) -> Vec<TaskError> {
        self.shared.exceptions.lock().values().cloned().collect()
    }

    /// Return the failure of the earliest-submitted failed task, if any.
    ///
    /// Only one error is surfaced; the rest stay in
    /// [`exceptions`](Self::exceptions).
    pub fn raise_first(&self) -> Result<()> {
        match self.shared.exceptions.lock().values().next() {
            Some(err) => Err(Error::Task(err.clone())),
            None => Ok(()),
        }
    }

    /// True while any worker thread is still running.
    pub fn is_alive(&self) -> bool {
        self.shared.live.load(Ordering::Acquire) > 0
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Worker handles still owned by the pool. Zero after close or stop.
    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Tasks accepted by [`submit`](Self::submit) so far.
    pub fn task_count(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Tasks submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.shared.queue.pending()
    }

    pub fn is_closed(&self) -> bool {
        !*self.open.read()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(feature = "telemetry")]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl<T> fmt::Debug for FixedThreadPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedThreadPool")
            .field("size", &self.size)
            .field("live", &self.shared.live.load(Ordering::Relaxed))
            .field("pending", &self.shared.queue.pending())
            .field("queued", &self.shared.queue.len())
            .field("capacity", &self.shared.queue.capacity())
            .field("submitted", &self.submitted.load(Ordering::Relaxed))
            .field("ids_issued", &self.ids.issued())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> Drop for FixedThreadPool<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "thread pool did not close cleanly");
        }
    }
}

fn spawn_worker<T: Send + 'static>(
    id: WorkerId,
    config: &Config,
    shared: &Arc<Shared<T>>,
) -> Result<WorkerHandle> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let worker = Worker::new(id, interrupted.clone(), shared.clone());
    let live = shared.clone();
    let name = format!("{}-{}", config.thread_name_prefix, id);

    let mut builder = thread::Builder::new().name(name);
    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }

    shared.live.fetch_add(1, Ordering::AcqRel);
    let spawned = builder.spawn(move || {
        let _live = LiveGuard(&live.live);
        worker.run();
    });

    match spawned {
        Ok(thread) => Ok(WorkerHandle {
            id,
            interrupted,
            thread: Some(thread),
        }),
        Err(e) => {
            shared.live.fetch_sub(1, Ordering::AcqRel);
            Err(Error::Spawn(e))
        }
    }
}

fn join_workers(handles: Vec<WorkerHandle>) -> Result<()> {
    let mut first_panic = None;
    for mut handle in handles {
        if let Some(thread) = handle.thread.take() {
            if thread.join().is_err() {
                warn!(worker = handle.id, "worker thread panicked");
                first_panic.get_or_insert(handle.id);
            }
        }
    }

    match first_panic {
        Some(id) => Err(Error::WorkerPanic(format!("worker {} panicked", id))),
        None => Ok(()),
    }
}
