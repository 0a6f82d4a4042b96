//! Per-task configuration.

use crate::cancellation::AbortSignal;
use std::time::Duration;

/// Configuration for a task. Fixed once the task is built.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// An externally owned signal whose abort also aborts the task.
    pub abort_signal: Option<AbortSignal>,
    /// Whether any abort also rejects the task with the abort reason.
    pub reject_on_abort: bool,
    /// Abort the task with a timeout fault after this long.
    pub timeout: Option<Duration>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            abort_signal: None,
            reject_on_abort: true,
            timeout: None,
        }
    }
}

impl TaskConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridges an external abort signal into the task.
    #[must_use]
    pub fn with_abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort_signal = Some(signal);
        self
    }

    /// Sets whether aborts also reject the task.
    #[must_use]
    pub fn with_reject_on_abort(mut self, reject_on_abort: bool) -> Self {
        self.reject_on_abort = reject_on_abort;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the timeout in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    /// The timeout to enforce; a zero duration disables it.
    pub(crate) fn active_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rejects_on_abort() {
        let config = TaskConfig::default();
        assert!(config.reject_on_abort);
        assert!(config.abort_signal.is_none());
        assert!(config.active_timeout().is_none());
    }

    #[test]
    fn test_builder() {
        let signal = AbortSignal::new();
        let config = TaskConfig::new()
            .with_abort_signal(signal)
            .with_reject_on_abort(false)
            .with_timeout_ms(50);

        assert!(!config.reject_on_abort);
        assert!(config.abort_signal.is_some());
        assert_eq!(config.active_timeout(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_zero_timeout_is_disabled() {
        let config = TaskConfig::new().with_timeout(Duration::ZERO);
        assert_eq!(config.timeout, Some(Duration::ZERO));
        assert!(config.active_timeout().is_none());
    }
}
