//! Timeout guard that aborts a task when its deadline passes.

use crate::errors::{TaskError, TimeoutError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// A scheduled abort that fires after a fixed duration unless cancelled.
#[derive(Debug)]
pub struct TimeoutGuard {
    /// The configured duration.
    duration: Duration,
    /// Handle to the timer task.
    handle: JoinHandle<()>,
}

impl TimeoutGuard {
    /// Starts a timer on the current tokio runtime.
    ///
    /// `on_elapsed` receives a [`TimeoutError`] carrying `duration` once the
    /// timer fires.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Runtime`] when called outside a tokio runtime.
    pub fn start<F>(duration: Duration, on_elapsed: F) -> Result<Self, TaskError>
    where
        F: FnOnce(TimeoutError) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|e| TaskError::Runtime(e.to_string()))?;

        let handle = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            debug!(timeout = ?duration, "Timeout elapsed");
            on_elapsed(TimeoutError::new(duration));
        });

        Ok(Self { duration, handle })
    }

    /// Suppresses the pending abort. Has no effect once the timer fired.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Returns the configured duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns true once the timer has fired or been cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
