//! Single-assignment settlement cell backing every task.
//!
//! Settlement happens in two steps. [`Deferred::claim`] fixes the outcome,
//! which makes every later settlement attempt a no-op, but keeps it hidden.
//! [`Deferred::publish`] then exposes it to awaiters and continuations. The
//! task core runs the abort broadcast and cleanup between the two.

use super::status::TaskStatus;
use crate::errors::TaskError;
use parking_lot::Mutex;
use std::task::{Context, Poll, Waker};
use tracing::warn;

/// The outcome of a settled task.
pub(crate) type Outcome<T> = Result<T, TaskError>;

/// A continuation run once the outcome is published.
pub(crate) type SettledCallback<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;

enum Slot<T> {
    Pending,
    Claimed(Outcome<T>),
    Published(Outcome<T>),
}

struct DeferredState<T> {
    slot: Slot<T>,
    wakers: Vec<Waker>,
    callbacks: Vec<SettledCallback<T>>,
    /// Whether anyone awaited or chained on the outcome.
    observed: bool,
}

pub(crate) struct Deferred<T> {
    state: Mutex<DeferredState<T>>,
}

impl<T> Deferred<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(DeferredState {
                slot: Slot::Pending,
                wakers: Vec::new(),
                callbacks: Vec::new(),
                observed: false,
            }),
        }
    }

    /// Fixes the outcome without exposing it. Returns false if the cell was
    /// already claimed.
    pub(crate) fn claim(&self, outcome: Outcome<T>) -> bool {
        let mut state = self.state.lock();
        if !matches!(state.slot, Slot::Pending) {
            return false;
        }
        state.slot = Slot::Claimed(outcome);
        true
    }

    /// Exposes a claimed outcome, waking awaiters and running continuations.
    pub(crate) fn publish(&self) {
        let (outcome, wakers, callbacks) = {
            let mut state = self.state.lock();
            let outcome = match std::mem::replace(&mut state.slot, Slot::Pending) {
                Slot::Claimed(outcome) => outcome,
                other => {
                    state.slot = other;
                    return;
                }
            };
            state.slot = Slot::Published(outcome.clone());
            (
                outcome,
                std::mem::take(&mut state.wakers),
                std::mem::take(&mut state.callbacks),
            )
        };

        for waker in wakers {
            waker.wake();
        }
        for callback in callbacks {
            callback(&outcome);
        }
    }

    /// Claims and immediately publishes.
    pub(crate) fn settle(&self, outcome: Outcome<T>) -> bool {
        let claimed = self.claim(outcome);
        if claimed {
            self.publish();
        }
        claimed
    }

    /// Runs `callback` once the outcome is published, or now if it already is.
    pub(crate) fn on_settled(&self, callback: SettledCallback<T>) {
        let outcome = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            state.observed = true;
            match &state.slot {
                Slot::Published(outcome) => outcome.clone(),
                Slot::Pending | Slot::Claimed(_) => {
                    state.callbacks.push(callback);
                    return;
                }
            }
        };

        callback(&outcome);
    }

    pub(crate) fn poll_outcome(&self, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if let Slot::Published(outcome) = &state.slot {
            state.observed = true;
            return Poll::Ready(outcome.clone());
        }

        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }

    /// The status visible to awaiters; a claimed but unpublished outcome is
    /// still pending.
    pub(crate) fn status(&self) -> TaskStatus {
        match &self.state.lock().slot {
            Slot::Published(Ok(_)) => TaskStatus::Fulfilled,
            Slot::Published(Err(_)) => TaskStatus::Rejected,
            Slot::Pending | Slot::Claimed(_) => TaskStatus::Pending,
        }
    }
}

impl<T> Drop for Deferred<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Slot::Published(Err(error)) = &state.slot {
            if !state.observed {
                warn!("Task rejected and the rejection was never observed: {}", error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::task::noop_waker;
    use std::sync::Arc;

    #[test]
    fn test_claim_is_single_assignment() {
        let deferred = Deferred::new();
        assert!(deferred.claim(Ok(1)));
        assert!(!deferred.claim(Ok(2)));
        assert!(!deferred.claim(Err(TaskError::Aborted)));

        deferred.publish();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(deferred.poll_outcome(&mut cx), Poll::Ready(Ok(1)));
    }

    #[test]
    fn test_claimed_outcome_hidden_until_published() {
        let deferred = Deferred::new();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        deferred.claim(Ok(1));
        assert_eq!(deferred.status(), TaskStatus::Pending);
        assert_eq!(deferred.poll_outcome(&mut cx), Poll::Pending);

        deferred.publish();
        assert_eq!(deferred.status(), TaskStatus::Fulfilled);
        assert_eq!(deferred.poll_outcome(&mut cx), Poll::Ready(Ok(1)));
    }

    #[test]
    fn test_callbacks_run_on_publish() {
        let deferred: Deferred<u32> = Deferred::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        deferred.on_settled(Box::new(move |outcome| {
            seen_clone.lock().push(outcome.clone());
        }));
        assert!(seen.lock().is_empty());

        deferred.settle(Err(TaskError::from("boom")));
        assert_eq!(*seen.lock(), vec![Err(TaskError::from("boom"))]);

        // Late registration runs immediately
        let seen_clone = seen.clone();
        deferred.on_settled(Box::new(move |outcome| {
            seen_clone.lock().push(outcome.clone());
        }));
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(deferred.status(), TaskStatus::Rejected);
    }

    #[test]
    fn test_publish_without_claim_is_noop() {
        let deferred: Deferred<u32> = Deferred::new();
        deferred.publish();
        assert_eq!(deferred.status(), TaskStatus::Pending);
    }
}
