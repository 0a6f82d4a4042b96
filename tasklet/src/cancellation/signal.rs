//! Abort signal for cooperative cancellation.

use crate::errors::{panic_message, TaskError};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tracing::warn;

/// A one-shot listener invoked with the abort reason.
pub type AbortListener<R> = Box<dyn FnOnce(&R) + Send>;

struct SignalState<R> {
    /// The abort reason (first one wins).
    reason: Option<R>,
    /// Pending listeners, in registration order.
    listeners: Vec<(u64, AbortListener<R>)>,
    next_id: u64,
}

struct SignalInner<R> {
    state: Mutex<SignalState<R>>,
    notify: Notify,
}

/// A cloneable abort signal carrying a reason of type `R`.
///
/// Aborting is idempotent: only the first reason is kept, and listeners are
/// notified exactly once, synchronously, in registration order. All clones
/// share the same state.
pub struct AbortSignal<R = TaskError> {
    inner: Arc<SignalInner<R>>,
}

impl<R> Clone for AbortSignal<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> Default for AbortSignal<R> {
    fn default() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                state: Mutex::new(SignalState {
                    reason: None,
                    listeners: Vec::new(),
                    next_id: 0,
                }),
                notify: Notify::new(),
            }),
        }
    }
}

impl<R> AbortSignal<R>
where
    R: Clone + Send + 'static,
{
    /// Creates a new signal that is not aborted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborts the signal with a reason.
    ///
    /// Returns false if the signal was already aborted, in which case the
    /// call has no effect. Listener panics are logged and suppressed.
    pub fn abort(&self, reason: R) -> bool {
        let listeners = {
            let mut state = self.inner.state.lock();
            if state.reason.is_some() {
                return false;
            }
            state.reason = Some(reason.clone());
            std::mem::take(&mut state.listeners)
        };

        self.inner.notify.notify_waiters();

        for (_, listener) in listeners {
            invoke(listener, &reason);
        }
        true
    }

    /// Registers a listener to be invoked on abort.
    ///
    /// If already aborted, the listener is invoked immediately and the
    /// returned subscription is inert.
    pub fn on_aborted<F>(&self, listener: F) -> Subscription
    where
        F: FnOnce(&R) + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        let existing = state.reason.clone();
        if let Some(reason) = existing {
            drop(state);
            invoke(Box::new(listener), &reason);
            return Subscription::inert();
        }

        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push((id, Box::new(listener)));
        drop(state);

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || detach(&weak, id))
    }

    /// Returns whether the signal has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.state.lock().reason.is_some()
    }

    /// Returns the abort reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<R> {
        self.inner.state.lock().reason.clone()
    }

    /// Returns the abort reason as an error if the signal is aborted.
    pub fn throw_if_aborted(&self) -> Result<(), R> {
        match self.reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Waits until the signal is aborted and returns the reason.
    pub async fn aborted(&self) -> R {
        loop {
            // Created before the check so a concurrent abort is not missed.
            let notified = self.inner.notify.notified();
            if let Some(reason) = self.reason() {
                return reason;
            }
            notified.await;
        }
    }

    /// Returns the number of listeners still waiting for an abort.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.state.lock().listeners.len()
    }
}

impl<R> std::fmt::Debug for AbortSignal<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("AbortSignal")
            .field("aborted", &state.reason.is_some())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

fn invoke<R>(listener: AbortListener<R>, reason: &R) {
    if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        listener(reason);
    })) {
        warn!("Abort listener panicked: {}", panic_message(panic.as_ref()));
    }
}

fn detach<R>(inner: &Weak<SignalInner<R>>, id: u64) -> bool {
    let Some(inner) = inner.upgrade() else {
        return false;
    };
    // Dropped outside the lock; listeners may own other signals' handles.
    let removed = {
        let mut state = inner.state.lock();
        let index = state
            .listeners
            .iter()
            .position(|(listener_id, _)| *listener_id == id);
        index.map(|index| state.listeners.remove(index))
    };
    removed.is_some()
}

/// Handle returned by [`AbortSignal::on_aborted`] to detach a listener.
///
/// Dropping the handle does not detach the listener. Clones share the same
/// registration, so the listener is detached at most once.
#[derive(Clone)]
pub struct Subscription {
    detach: Arc<Mutex<Option<Box<dyn FnOnce() -> bool + Send>>>>,
}

impl Subscription {
    fn new<F>(detach: F) -> Self
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        Self {
            detach: Arc::new(Mutex::new(Some(Box::new(detach)))),
        }
    }

    fn inert() -> Self {
        Self {
            detach: Arc::new(Mutex::new(None)),
        }
    }

    /// Detaches the listener if it has not fired yet.
    ///
    /// Returns true if a pending listener was removed.
    pub fn unsubscribe(&self) -> bool {
        let detach = self.detach.lock().take();
        detach.is_some_and(|detach| detach())
    }

    /// Returns true if there is nothing left to detach: the listener already
    /// fired on registration or the handle was unsubscribed.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.detach.lock().is_none()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.lock().is_some())
            .finish()
    }
}
