//! Continuations and the control they share with the root task.
//!
//! A derived task owns no abort coordinator of its own. It holds the
//! [`TaskControl`] of the task it was derived from, which is itself the
//! root's, so aborting or rejecting anywhere in a chain acts on the root.

use super::core::Task;
use super::deferred::{Deferred, Outcome};
use super::work::FailureHandler;
use crate::errors::TaskError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Abort and reject operations of a root task.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait TaskControl {
    /// Aborts the root task. Later aborts are ignored.
    fn abort(&self, reason: TaskError);

    /// Rejects the root task unless it already settled.
    fn reject(&self, reason: TaskError);
}

impl<T> Task<T>
where
    T: Clone + Send + 'static,
{
    /// Maps the fulfilled value. Rejections pass through unchanged.
    pub fn then<U, F>(&self, f: F) -> Task<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.derive(move |outcome| outcome.map(f))
    }

    /// Maps the fulfilled value with a fallible function.
    pub fn and_then<U, F>(&self, f: F) -> Task<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, TaskError> + Send + 'static,
    {
        self.derive(move |outcome| outcome.and_then(f))
    }

    /// Handles a rejection. Returning `Ok` recovers with a value.
    pub fn catch<F>(&self, handler: F) -> Task<T>
    where
        F: FnOnce(TaskError) -> Result<T, TaskError> + Send + 'static,
    {
        self.derive(move |outcome| outcome.or_else(handler))
    }

    /// Runs `f` once the task settles either way and passes the outcome on.
    pub fn finally<F>(&self, f: F) -> Task<T>
    where
        F: FnOnce() + Send + 'static,
    {
        self.derive(move |outcome| {
            f();
            outcome
        })
    }

    fn derive<U, F>(&self, continuation: F) -> Task<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Outcome<T>) -> Outcome<U> + Send + 'static,
    {
        let deferred = Arc::new(Deferred::new());
        let target = Arc::clone(&deferred);

        self.deferred.on_settled(Box::new(move |outcome| {
            let outcome = outcome.clone();
            let next = std::panic::catch_unwind(AssertUnwindSafe(move || continuation(outcome)))
                .unwrap_or_else(|panic| Err(TaskError::from_panic(panic)));
            target.settle(next);
        }));

        Task::from_parts(deferred, Arc::clone(&self.control))
    }

    /// Invokes `handler` with the reason if this task is rejected.
    pub(crate) fn on_rejected(&self, handler: FailureHandler) {
        self.deferred.on_settled(Box::new(move |outcome| {
            if let Err(error) = outcome {
                handler(error.clone());
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CancelledError;
    use crate::task::{TaskConfig, TaskStatus};
    use futures::executor::block_on;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    fn mocked_root(control: MockTaskControl) -> Task<u32> {
        Task::from_parts(Arc::new(Deferred::new()), Arc::new(control))
    }

    #[test]
    fn test_derived_abort_forwards_to_root_control() {
        let mut control = MockTaskControl::new();
        control
            .expect_abort()
            .withf(|reason| *reason == TaskError::from("stop"))
            .times(1)
            .return_const(());
        control.expect_reject().never();

        let root = mocked_root(control);
        let derived = root.then(|v| v + 1).catch(Err).finally(|| {});
        derived.abort("stop");
    }

    #[test]
    fn test_derived_reject_and_cancel_forward_to_root_control() {
        let mut control = MockTaskControl::new();
        control
            .expect_reject()
            .withf(|reason| *reason == TaskError::from("nope"))
            .times(1)
            .return_const(());
        control
            .expect_abort()
            .withf(TaskError::is_cancelled)
            .times(1)
            .return_const(());

        let root = mocked_root(control);
        let derived = root.and_then(|v| Ok(v.to_string()));
        derived.reject("nope");
        derived.cancel();
    }

    #[tokio::test]
    async fn test_abort_anywhere_in_chain_rejects_root() {
        let (root, _settler) = Task::<u32>::deferred(TaskConfig::default());
        let derived = root.then(|v| v * 2).then(|v| v.to_string());

        derived.abort("stop");

        assert_eq!(root.clone().await, Err(TaskError::from("stop")));
        assert_eq!(derived.await, Err(TaskError::from("stop")));
    }

    #[tokio::test]
    async fn test_cancel_from_derived() {
        let (root, _settler) = Task::<u32>::deferred(TaskConfig::default());
        let derived = root.finally(|| {});

        derived.cancel();

        assert_eq!(root.await, Err(TaskError::Cancelled(CancelledError)));
    }

    #[test]
    fn test_then_maps_value() {
        let task = Task::resolved(20).then(|v| v + 1).then(|v| v * 2);
        assert_eq!(block_on(task), Ok(42));
    }

    #[test]
    fn test_and_then_can_fail() {
        let task = Task::resolved(5).and_then(|v| {
            if v > 1 {
                Err(TaskError::from("too big"))
            } else {
                Ok(v)
            }
        });
        assert_eq!(block_on(task), Err(TaskError::from("too big")));
    }

    #[test]
    fn test_catch_recovers() {
        let task = Task::<u32>::rejected("boom").catch(|error| {
            assert_eq!(error, TaskError::from("boom"));
            Ok(7)
        });
        assert_eq!(block_on(task), Ok(7));
    }

    #[test]
    fn test_catch_skipped_on_fulfilment() {
        let task = Task::resolved(1).catch(|_| Ok(99));
        assert_eq!(block_on(task), Ok(1));
    }

    #[test]
    fn test_then_skipped_on_rejection() {
        let called = Arc::new(Mutex::new(false));
        let called_clone = called.clone();
        let task = Task::<u32>::rejected("boom").then(move |v| {
            *called_clone.lock() = true;
            v
        });

        assert_eq!(block_on(task), Err(TaskError::from("boom")));
        assert!(!*called.lock());
    }

    #[test]
    fn test_finally_runs_and_passes_outcome() {
        let runs = Arc::new(Mutex::new(0));

        let runs_clone = runs.clone();
        let ok = Task::resolved(3).finally(move || *runs_clone.lock() += 1);
        let runs_clone = runs.clone();
        let err = Task::<u32>::rejected("x").finally(move || *runs_clone.lock() += 1);

        assert_eq!(block_on(ok), Ok(3));
        assert_eq!(block_on(err), Err(TaskError::from("x")));
        assert_eq!(*runs.lock(), 2);
    }

    #[test]
    fn test_continuation_panic_rejects_derived() {
        let task = Task::resolved(1).then(|_| -> u32 { panic!("in then") });
        assert_eq!(
            block_on(task),
            Err(TaskError::Panicked("in then".to_string()))
        );
    }

    #[test]
    fn test_continuation_waits_for_settlement() {
        let (root, settler) = Task::<u32>::deferred(TaskConfig::default());
        let derived = root.then(|v| v + 1);
        assert_eq!(derived.status(), TaskStatus::Pending);

        settler.resolve(1);
        assert_eq!(derived.status(), TaskStatus::Fulfilled);
        assert_eq!(block_on(derived), Ok(2));
    }

    #[test]
    fn test_derived_task_has_its_own_id() {
        let root = Task::resolved(1);
        let derived = root.then(|v| v);
        assert_ne!(root.id(), derived.id());
    }

    #[test]
    fn test_on_rejected_only_sees_failures() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        Task::resolved(1).on_rejected(Box::new(move |e| seen_clone.lock().push(e)));
        let seen_clone = seen.clone();
        Task::<u32>::rejected("bad").on_rejected(Box::new(move |e| seen_clone.lock().push(e)));

        assert_eq!(*seen.lock(), vec![TaskError::from("bad")]);
    }
}
