//! Error types for tasklet.
//!
//! Every way a task can end badly funnels into [`TaskError`]: work faults,
//! timeouts, external aborts and explicit aborts or cancellations.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The rejection and abort reason type used by tasks.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The task's timeout elapsed before it settled.
    #[error("{0}")]
    Timeout(#[from] TimeoutError),

    /// The task was cancelled through [`Task::cancel`](crate::task::Task::cancel).
    #[error("{0}")]
    Cancelled(#[from] CancelledError),

    /// The task was aborted without a more specific reason, as by
    /// [`Task::stop`](crate::task::Task::stop).
    #[error("Task aborted")]
    Aborted,

    /// A caller-supplied reason.
    #[error("{0}")]
    Reason(String),

    /// The task had already settled when the abort reason was inspected.
    #[error("Task already settled")]
    Settled,

    /// The work function or a continuation panicked.
    #[error("Work panicked: {0}")]
    Panicked(String),

    /// No async runtime was available to drive timers or spawned work.
    #[error("Runtime unavailable: {0}")]
    Runtime(String),

    /// Any other error raised by the work.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Wraps an arbitrary error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Arc::new(error))
    }

    /// Builds a [`TaskError::Panicked`] from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::Panicked(panic_message(payload.as_ref()))
    }

    /// Returns true if this is a timeout fault.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns true if this is a cancellation fault.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl PartialEq for TaskError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::Cancelled(_), Self::Cancelled(_))
            | (Self::Aborted, Self::Aborted)
            | (Self::Settled, Self::Settled) => true,
            (Self::Reason(a), Self::Reason(b))
            | (Self::Panicked(a), Self::Panicked(b))
            | (Self::Runtime(a), Self::Runtime(b)) => a == b,
            (Self::Other(a), Self::Other(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for TaskError {
    fn from(reason: &str) -> Self {
        Self::Reason(reason.to_string())
    }
}

impl From<String> for TaskError {
    fn from(reason: String) -> Self {
        Self::Reason(reason)
    }
}

/// Raised when a task's timeout elapses before it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Task timed out after {}ms", timeout.as_millis())]
pub struct TimeoutError {
    /// The configured timeout.
    pub timeout: Duration,
}

impl TimeoutError {
    /// Creates a new timeout error.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the configured timeout in milliseconds.
    #[must_use]
    pub fn timeout_ms(&self) -> u128 {
        self.timeout.as_millis()
    }
}

/// Raised when a task is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error, Serialize, Deserialize)]
#[error("Task cancelled")]
pub struct CancelledError;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_timeout_error_display() {
        let err = TimeoutError::new(Duration::from_millis(50));
        assert_eq!(err.to_string(), "Task timed out after 50ms");
        assert_eq!(err.timeout_ms(), 50);
    }

    #[test]
    fn test_task_error_from_str() {
        let err = TaskError::from("stop");
        assert_eq!(err, TaskError::Reason("stop".to_string()));
        assert_eq!(err.to_string(), "stop");
    }

    #[test]
    fn test_task_error_kinds() {
        let timeout: TaskError = TimeoutError::new(Duration::from_secs(1)).into();
        let cancelled: TaskError = CancelledError.into();

        assert!(timeout.is_timeout());
        assert!(!timeout.is_cancelled());
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.to_string(), "Task cancelled");
    }

    #[test]
    fn test_from_panic_payloads() {
        let static_str = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(TaskError::from_panic(static_str), TaskError::Panicked("boom".to_string()));

        let owned = std::panic::catch_unwind(|| panic!("{}", String::from("owned"))).unwrap_err();
        assert_eq!(TaskError::from_panic(owned), TaskError::Panicked("owned".to_string()));
    }

    #[test]
    fn test_other_compares_by_identity() {
        let io = TaskError::other(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io, io.clone());
        assert_eq!(io.to_string(), "disk");

        let another = TaskError::other(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_ne!(io, another);
    }

    #[test]
    fn test_timeout_error_serializes() {
        let err = TimeoutError::new(Duration::from_millis(250));
        let json = serde_json::to_value(err).unwrap();
        let back: TimeoutError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }
}
