//! Telemetry for the thread pool.
//!
//! Counts submitted and finished tasks and records per-task run time and
//! queue wait in histograms. Snapshots can be exported as JSON or printed.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub mod export;

#[cfg(feature = "telemetry")]
pub use metrics::{Metrics, MetricsSnapshot};

#[cfg(feature = "telemetry")]
pub use export::{ConsoleExporter, JsonExporter, MetricsExporter};

// No-op stand-in when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub(crate) mod metrics {
    #[derive(Debug, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self {
            Self
        }

        pub fn record_task_submitted(&self) {}

        pub fn record_task_execution(&self, _: u64) {}

        pub fn record_queue_wait(&self, _: u64) {}

        pub fn record_task_failure(&self) {}

        pub fn record_task_panic(&self) {}

        pub fn record_task_cancelled(&self) {}
    }
}

#[cfg(not(feature = "telemetry"))]
pub(crate) use metrics::Metrics;
