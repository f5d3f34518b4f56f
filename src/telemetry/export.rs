//! Metrics export to JSON files and the console.

use super::metrics::MetricsSnapshot;
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Trait for exporting metrics to different formats
pub trait MetricsExporter: Send + Sync {
    /// Export a metrics snapshot
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()>;
}

/// Export metrics to JSON format
#[derive(Debug)]
pub struct JsonExporter {
    output_path: PathBuf,
}

impl JsonExporter {
    /// Create a new JSON exporter
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// Render a snapshot without writing it anywhere.
    pub fn to_json(snapshot: &MetricsSnapshot) -> Result<String> {
        serde_json::to_string_pretty(&SerializableSnapshot::from(snapshot))
            .map_err(|e| Error::telemetry(format!("JSON serialization failed: {}", e)))
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let json = Self::to_json(snapshot)?;
        std::fs::write(&self.output_path, json)?;
        Ok(())
    }
}

/// Serializable version of MetricsSnapshot
#[derive(Debug, Clone, Serialize)]
struct SerializableSnapshot {
    uptime_secs: f64,
    tasks_submitted: u64,
    tasks_executed: u64,
    tasks_succeeded: u64,
    tasks_failed: u64,
    tasks_panicked: u64,
    tasks_cancelled: u64,
    busy_time_ms: u64,
    avg_run_us: f64,
    p50_run_us: f64,
    p99_run_us: f64,
    max_run_us: f64,
    avg_wait_us: f64,
    p99_wait_us: f64,
    tasks_per_second: f64,
}

impl From<&MetricsSnapshot> for SerializableSnapshot {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            uptime_secs: snapshot.uptime.as_secs_f64(),
            tasks_submitted: snapshot.tasks_submitted,
            tasks_executed: snapshot.tasks_executed,
            tasks_succeeded: snapshot.tasks_succeeded(),
            tasks_failed: snapshot.tasks_failed,
            tasks_panicked: snapshot.tasks_panicked,
            tasks_cancelled: snapshot.tasks_cancelled,
            busy_time_ms: snapshot.busy_time_ns / 1_000_000,
            avg_run_us: snapshot.avg_run_ns as f64 / 1_000.0,
            p50_run_us: snapshot.p50_run_ns as f64 / 1_000.0,
            p99_run_us: snapshot.p99_run_ns as f64 / 1_000.0,
            max_run_us: snapshot.max_run_ns as f64 / 1_000.0,
            avg_wait_us: snapshot.avg_wait_ns as f64 / 1_000.0,
            p99_wait_us: snapshot.p99_wait_ns as f64 / 1_000.0,
            tasks_per_second: snapshot.tasks_per_second(),
        }
    }
}

/// Export metrics to console (stdout)
#[derive(Debug, Default)]
pub struct ConsoleExporter {
    verbose: bool,
}

impl ConsoleExporter {
    /// Create a new console exporter
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl MetricsExporter for ConsoleExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        println!("=== Thread Pool Metrics ===");
        println!("Uptime: {:.2}s", snapshot.uptime.as_secs_f64());
        println!("Tasks submitted: {}", snapshot.tasks_submitted);
        println!("Tasks executed: {}", snapshot.tasks_executed);
        println!("Tasks failed: {}", snapshot.tasks_failed);
        println!("Tasks panicked: {}", snapshot.tasks_panicked);
        println!("Tasks cancelled: {}", snapshot.tasks_cancelled);
        println!("Tasks/sec: {:.2}", snapshot.tasks_per_second());

        if self.verbose {
            println!("\nRun time:");
            println!("  Average: {:.2}μs", snapshot.avg_run_ns as f64 / 1_000.0);
            println!("  P50: {:.2}μs", snapshot.p50_run_ns as f64 / 1_000.0);
            println!("  P99: {:.2}μs", snapshot.p99_run_ns as f64 / 1_000.0);
            println!("  Max: {:.2}μs", snapshot.max_run_ns as f64 / 1_000.0);

            println!("\nQueue wait:");
            println!("  Average: {:.2}μs", snapshot.avg_wait_ns as f64 / 1_000.0);
            println!("  P99: {:.2}μs", snapshot.p99_wait_ns as f64 / 1_000.0);
        }

        println!("===========================");

        Ok(())
    }
}
