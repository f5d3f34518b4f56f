pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{BoxError, Error, Result};
pub use crate::executor::{FixedThreadPool, TaskError, TaskErrorKind, TaskId};
pub use crate::scope::scope;

#[cfg(feature = "telemetry")]
pub use crate::telemetry::{Metrics, MetricsSnapshot};
