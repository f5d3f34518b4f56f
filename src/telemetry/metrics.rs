//! Metrics collection for pool monitoring.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// one hour in nanoseconds
const MAX_TRACKED_NS: u64 = 3_600_000_000_000;

/// Pool metrics collector
#[derive(Debug)]
pub struct Metrics {
    tasks_submitted: AtomicU64,
    tasks_executed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_panicked: AtomicU64,
    tasks_cancelled: AtomicU64,

    busy_time_ns: AtomicU64,

    run_histogram: RwLock<Histogram<u64>>,
    wait_histogram: RwLock<Histogram<u64>>,

    start_time: Instant,
}

fn histogram() -> Histogram<u64> {
    Histogram::new_with_max(MAX_TRACKED_NS, 3).expect("Failed to create histogram")
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_executed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            tasks_cancelled: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            run_histogram: RwLock::new(histogram()),
            wait_histogram: RwLock::new(histogram()),
            start_time: Instant::now(),
        }
    }

    pub fn record_task_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a task execution with duration
    pub fn record_task_execution(&self, duration_ns: u64) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);

        self.run_histogram.write().saturating_record(duration_ns);
    }

    /// Record how long a task sat in the queue before a worker took it
    pub fn record_queue_wait(&self, wait_ns: u64) {
        self.wait_histogram.write().saturating_record(wait_ns);
    }

    /// Record a task that returned an error
    pub fn record_task_failure(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a task panic
    pub fn record_task_panic(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a task that never ran because the pool shut down
    pub fn record_task_cancelled(&self) {
        self.tasks_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let run = self.run_histogram.read();
        let wait = self.wait_histogram.read();

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
            avg_run_ns: if run.len() > 0 { run.mean() as u64 } else { 0 },
            p50_run_ns: run.value_at_quantile(0.50),
            p99_run_ns: run.value_at_quantile(0.99),
            max_run_ns: run.max(),
            avg_wait_ns: if wait.len() > 0 { wait.mean() as u64 } else { 0 },
            p99_wait_ns: wait.value_at_quantile(0.99),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.tasks_submitted.store(0, Ordering::Relaxed);
        self.tasks_executed.store(0, Ordering::Relaxed);
        self.tasks_failed.store(0, Ordering::Relaxed);
        self.tasks_panicked.store(0, Ordering::Relaxed);
        self.tasks_cancelled.store(0, Ordering::Relaxed);
        self.busy_time_ns.store(0, Ordering::Relaxed);
        self.run_histogram.write().reset();
        self.wait_histogram.write().reset();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub tasks_submitted: u64,
    pub tasks_executed: u64,
    pub tasks_failed: u64,
    pub tasks_panicked: u64,
    pub tasks_cancelled: u64,
    pub busy_time_ns: u64,
    pub avg_run_ns: u64,
    pub p50_run_ns: u64,
    pub p99_run_ns: u64,
    pub max_run_ns: u64,
    pub avg_wait_ns: u64,
    pub p99_wait_ns: u64,
}

impl MetricsSnapshot {
    /// Executed tasks that produced a value
    pub fn tasks_succeeded(&self) -> u64 {
        self.tasks_executed
            .saturating_sub(self.tasks_failed + self.tasks_panicked)
    }

    /// Share of busy worker time over `workers * uptime` (0.0 to 1.0)
    pub fn utilization(&self, workers: usize) -> f64 {
        let capacity = self.uptime.as_nanos() as f64 * workers as f64;
        if capacity == 0.0 {
            return 0.0;
        }
        (self.busy_time_ns as f64 / capacity).min(1.0)
    }

    /// Calculate tasks per second
    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.tasks_executed as f64 / seconds
    }
}
