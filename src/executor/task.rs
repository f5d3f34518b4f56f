//! Task representation and per-task outcomes.

use crate::error::BoxError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Sequence id assigned to a task at submission.
///
/// Ids are unique and strictly increasing per executor, starting at 0, so
/// sorting by id reconstructs submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(id: u64) -> Self {
        TaskId(id)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source shared by every submitting thread.
#[derive(Debug, Default)]
pub(crate) struct TaskIdGenerator {
    next: AtomicU64,
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> TaskId {
        TaskId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

type TaskFn<T> = Box<dyn FnOnce() -> Result<T, BoxError> + Send + 'static>;

/// Internal task representation
pub(crate) struct Task<T> {
    pub(crate) id: TaskId,
    pub(crate) func: TaskFn<T>,
    pub(crate) enqueued_at: Instant,
}

impl<T> Task<T> {
    pub fn new<F, E>(id: TaskId, f: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<BoxError>,
    {
        Task {
            id,
            func: Box::new(move || f().map_err(Into::into)),
            enqueued_at: Instant::now(),
        }
    }

    /// Execute the task
    pub fn execute(self) -> Result<T, BoxError> {
        (self.func)()
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("enqueued_at", &self.enqueued_at)
            .finish()
    }
}

/// Why a task did not produce a value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskErrorKind {
    /// The closure returned `Err`.
    #[error("failed: {0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// The closure panicked.
    #[error("panicked: {message}")]
    Panicked { message: String },

    /// Still queued when the last worker exited.
    #[error("was cancelled before it ran")]
    Cancelled,
}

/// Error recorded for a single task, keyed by its [`TaskId`].
#[derive(Debug, Clone)]
pub struct TaskError {
    id: TaskId,
    kind: TaskErrorKind,
}

impl TaskError {
    pub(crate) fn failed(id: TaskId, source: BoxError) -> Self {
        Self {
            id,
            kind: TaskErrorKind::Failed(Arc::from(source)),
        }
    }

    pub(crate) fn panicked(id: TaskId, message: String) -> Self {
        Self {
            id,
            kind: TaskErrorKind::Panicked { message },
        }
    }

    pub(crate) fn cancelled(id: TaskId) -> Self {
        Self {
            id,
            kind: TaskErrorKind::Cancelled,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> &TaskErrorKind {
        &self.kind
    }

    pub fn is_panic(&self) -> bool {
        matches!(self.kind, TaskErrorKind::Panicked { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, TaskErrorKind::Cancelled)
    }

    /// Downcast the error returned by the closure.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match &self.kind {
            TaskErrorKind::Failed(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {} {}", self.id, self.kind)
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            TaskErrorKind::Failed(source) => {
                let source: &(dyn std::error::Error + 'static) = &**source;
                Some(source)
            }
            _ => None,
        }
    }
}
