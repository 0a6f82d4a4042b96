//! Test assertions for task outcomes.
//!
//! Each assertion polls the task once with a no-op waker, so it checks the
//! outcome visible right now without waiting.

use futures::task::noop_waker;
use futures::FutureExt;
use std::fmt::Debug;
use std::task::{Context, Poll};
use std::time::Duration;

use crate::errors::{CancelledError, TaskError, TimeoutError};
use crate::task::Task;

/// Polls a clone of `task` once and returns the outcome, if visible.
pub fn poll_now<T>(task: &Task<T>) -> Option<Result<T, TaskError>>
where
    T: Clone + Send + 'static,
{
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    match task.clone().poll_unpin(&mut cx) {
        Poll::Ready(outcome) => Some(outcome),
        Poll::Pending => None,
    }
}

/// Asserts that the task has not settled yet.
pub fn assert_pending<T>(task: &Task<T>)
where
    T: Clone + Send + Debug + 'static,
{
    let outcome = poll_now(task);
    assert!(
        outcome.is_none(),
        "Expected task {} to be pending, got {:?}",
        task.id(),
        outcome
    );
}

/// Asserts that the task fulfilled with `expected`.
pub fn assert_fulfilled_with<T>(task: &Task<T>, expected: &T)
where
    T: Clone + Send + Debug + PartialEq + 'static,
{
    match poll_now(task) {
        Some(Ok(value)) => assert_eq!(
            &value, expected,
            "Task {} fulfilled with the wrong value",
            task.id()
        ),
        other => panic!(
            "Expected task {} to fulfil with {:?}, got {:?}",
            task.id(),
            expected,
            other
        ),
    }
}

/// Asserts that the task rejected with `expected`.
pub fn assert_rejected_with<T>(task: &Task<T>, expected: &TaskError)
where
    T: Clone + Send + Debug + 'static,
{
    match poll_now(task) {
        Some(Err(error)) => assert_eq!(
            &error, expected,
            "Task {} rejected with the wrong reason",
            task.id()
        ),
        other => panic!(
            "Expected task {} to reject with {:?}, got {:?}",
            task.id(),
            expected,
            other
        ),
    }
}

/// Asserts that the task rejected with a [`TimeoutError`] for `timeout`.
pub fn assert_timed_out<T>(task: &Task<T>, timeout: Duration)
where
    T: Clone + Send + Debug + 'static,
{
    assert_rejected_with(task, &TaskError::Timeout(TimeoutError::new(timeout)));
}

/// Asserts that the task rejected with [`CancelledError`].
pub fn assert_cancelled<T>(task: &Task<T>)
where
    T: Clone + Send + Debug + 'static,
{
    assert_rejected_with(task, &TaskError::Cancelled(CancelledError));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskConfig;

    #[test]
    fn test_assertions_on_settled_tasks() {
        assert_fulfilled_with(&Task::resolved(1), &1);
        assert_rejected_with(&Task::<u32>::rejected("x"), &TaskError::from("x"));

        let (task, _settler) = Task::<u32>::deferred(TaskConfig::default());
        assert_pending(&task);
        task.cancel();
        assert_cancelled(&task);
    }

    #[test]
    #[should_panic(expected = "to be pending")]
    fn test_assert_pending_fails_on_settled_task() {
        assert_pending(&Task::resolved(1));
    }
}
