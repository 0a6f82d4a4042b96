//! Execution context handed to a task's work function.

use super::core::Core;
use super::id::TaskId;
use super::resolution::{is_resolved_marker, unwrap_resolved_marker, AbortReason};
use crate::cancellation::{AbortSignal, Subscription};
use crate::errors::TaskError;
use std::sync::Arc;

/// Read and observe view of a task's abort state.
///
/// Cancellation is cooperative: the work checks
/// [`is_aborted`](Self::is_aborted) or
/// [`throw_if_aborted`](Self::throw_if_aborted), or subscribes through
/// [`on_aborted`](Self::on_aborted), to stop doing useful work.
pub struct TaskContext<T> {
    core: Arc<Core<T>>,
}

impl<T> TaskContext<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn new(core: Arc<Core<T>>) -> Self {
        Self { core }
    }

    /// Returns the id of the task this context belongs to.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.core.id
    }

    /// Returns the current abort reason, if any.
    #[must_use]
    pub fn abort_reason(&self) -> Option<AbortReason<T>> {
        self.core.signal.reason()
    }

    /// Returns the task's abort signal.
    #[must_use]
    pub fn abort_signal(&self) -> &AbortSignal<AbortReason<T>> {
        &self.core.signal
    }

    /// Returns true once the task is aborted for any reason, including
    /// its own settlement.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.core.signal.is_aborted()
    }

    /// Returns true only if the task was aborted by fulfilling.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.abort_reason()
            .is_some_and(|reason| is_resolved_marker(&reason))
    }

    /// Returns the fulfilled value, if the task fulfilled.
    #[must_use]
    pub fn resolved(&self) -> Option<T> {
        self.abort_reason().and_then(unwrap_resolved_marker)
    }

    /// Registers a listener invoked once with the abort reason.
    ///
    /// Fires immediately if already aborted. The listener is detached when
    /// the task's cleanup runs.
    pub fn on_aborted<F>(&self, listener: F) -> Subscription
    where
        F: FnOnce(&AbortReason<T>) + Send + 'static,
    {
        let subscription = self.core.signal.on_aborted(listener);
        if subscription.is_inert() {
            return subscription;
        }
        let detach = subscription.clone();
        self.core.cleanup.register(
            move || {
                detach.unsubscribe();
            },
            Some("on_aborted"),
        );
        subscription
    }

    /// Registers a listener invoked with the value if the task fulfils.
    pub fn on_resolved<F>(&self, listener: F) -> Subscription
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.on_aborted(move |reason| {
            if let AbortReason::Resolved(value) = reason {
                listener(value.clone());
            }
        })
    }

    /// Returns the abort reason as an error if the task is aborted.
    ///
    /// A task aborted by its own fulfilment yields [`TaskError::Settled`].
    pub fn throw_if_aborted(&self) -> Result<(), TaskError> {
        self.core
            .signal
            .throw_if_aborted()
            .map_err(AbortReason::into_error)
    }

    /// Waits until the task is aborted and returns the reason.
    pub async fn aborted(&self) -> AbortReason<T> {
        self.core.signal.aborted().await
    }

    /// Registers a teardown action run once when the task settles.
    pub fn on_cleanup<F>(&self, name: &str, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.core.cleanup.register(action, Some(name));
    }

    #[cfg(test)]
    pub(crate) fn pending_cleanup_count(&self) -> usize {
        self.core.cleanup.pending_count()
    }
}

impl<T> Clone for TaskContext<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> std::fmt::Debug for TaskContext<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("task_id", &self.core.id)
            .field("signal", &self.core.signal)
            .finish()
    }
}
