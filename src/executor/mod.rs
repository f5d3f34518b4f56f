//! Task execution infrastructure.
//!
//! This module provides the fixed thread pool, its worker threads, the
//! shared task queue and the per-task outcome types.

pub mod panic_handler;
pub mod pool;
pub mod queue;
pub mod task;
pub mod worker;

pub use panic_handler::{PanicHandler, PanicInfo};
pub use pool::FixedThreadPool;
pub use task::{TaskError, TaskErrorKind, TaskId};
