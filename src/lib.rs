//! fixed-pool - a fixed-size thread pool executor
//!
//! Runs batches of independent closures on a fixed set of worker threads
//! and hands back their values and errors in submission order, no matter
//! which worker finished first.
//!
//! # Quick Start
//!
//! ```no_run
//! use fixed_pool::prelude::*;
//!
//! let pool = FixedThreadPool::with_threads(4).unwrap();
//!
//! for value in 0..10u64 {
//!     pool.submit(move || Ok::<_, BoxError>(value * 2)).unwrap();
//! }
//!
//! pool.drain();
//! pool.raise_first().unwrap();
//! println!("Doubled: {:?}", pool.returns());
//!
//! pool.close().unwrap();
//! ```
//!
//! # Shutdown
//!
//! - [`FixedThreadPool::close`]: finish queued work, then retire each worker
//!   with a shutdown entry.
//! - [`FixedThreadPool::stop`]: raise a stop signal; idle workers exit within
//!   one queue timeout.
//! - [`FixedThreadPool::terminate`]: interrupt workers between tasks, then
//!   close.
//!
//! Dropping the pool, or leaving [`scope`], closes it.

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod scope;
pub mod telemetry;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder};
pub use error::{BoxError, Error, Result};
pub use executor::{FixedThreadPool, TaskError, TaskErrorKind, TaskId};
pub use scope::scope;
