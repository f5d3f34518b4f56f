use crate::executor::task::TaskError;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by task closures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("executor is closed")]
    Closed,

    #[error("task queue stayed full for {timeout:?}")]
    QueueFull { timeout: Duration },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("worker panic: {0}")]
    WorkerPanic(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[cfg(feature = "telemetry")]
    #[error("telemetry error: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    #[cfg(feature = "telemetry")]
    pub fn telemetry<S: Into<String>>(msg: S) -> Self {
        Error::Telemetry(msg.into())
    }

    /// The task error carried by this error, if any.
    pub fn as_task_error(&self) -> Option<&TaskError> {
        match self {
            Error::Task(e) => Some(e),
            _ => None,
        }
    }
}
