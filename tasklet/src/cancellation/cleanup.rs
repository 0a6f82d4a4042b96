//! Cleanup registry run once a task settles.

use crate::errors::panic_message;
use parking_lot::Mutex;
use tracing::warn;

/// A teardown action.
pub type CleanupAction = Box<dyn FnOnce() + Send>;

/// A cleanup action, with optional name.
struct CleanupEntry {
    /// The action to run.
    action: CleanupAction,
    /// Optional name for diagnostics.
    name: Option<String>,
}

#[derive(Default)]
struct RegistryState {
    entries: Vec<CleanupEntry>,
    drained: bool,
}

/// Registry for teardown actions executed once, in registration order.
///
/// Actions registered after the registry has been drained run immediately,
/// so a late registration never leaks.
#[derive(Default)]
pub struct CleanupRegistry {
    state: Mutex<RegistryState>,
}

impl CleanupRegistry {
    /// Creates a new cleanup registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a cleanup action.
    ///
    /// If a name is provided, it's stored with the action for debugging.
    pub fn register<F>(&self, action: F, name: Option<&str>)
    where
        F: FnOnce() + Send + 'static,
    {
        let entry = CleanupEntry {
            action: Box::new(action),
            name: name.map(String::from),
        };

        let late = {
            let mut state = self.state.lock();
            if state.drained {
                Some(entry)
            } else {
                state.entries.push(entry);
                None
            }
        };

        if let Some(entry) = late {
            run_entry(entry);
        }
    }

    /// Runs all cleanup actions in registration order.
    ///
    /// Only the first call runs anything. Panics are logged, don't stop the
    /// remaining actions, and are returned as `(name, message)` pairs.
    pub fn run_all(&self) -> Vec<(String, String)> {
        let entries = {
            let mut state = self.state.lock();
            if state.drained {
                return Vec::new();
            }
            state.drained = true;
            std::mem::take(&mut state.entries)
        };

        entries.into_iter().filter_map(run_entry).collect()
    }

    /// Returns the number of pending cleanup actions.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns whether the registry has been drained.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.state.lock().drained
    }
}

fn run_entry(entry: CleanupEntry) -> Option<(String, String)> {
    let name = entry.name.unwrap_or_else(|| "<unnamed>".to_string());
    let action = entry.action;

    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(action)) {
        Ok(()) => None,
        Err(panic) => {
            let msg = format!("Cleanup action panicked: {}", panic_message(panic.as_ref()));
            warn!("{}: {}", name, msg);
            Some((name, msg))
        }
    }
}

impl std::fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CleanupRegistry")
            .field("pending_count", &state.entries.len())
            .field("drained", &state.drained)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_registry_creation() {
        let registry = CleanupRegistry::new();
        assert_eq!(registry.pending_count(), 0);
        assert!(!registry.is_drained());
    }

    #[test]
    fn test_registry_register() {
        let registry = CleanupRegistry::new();
        registry.register(|| {}, Some("test"));
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn test_registry_fifo_order() {
        let registry = CleanupRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 1..=3 {
            let order = order.clone();
            registry.register(move || order.lock().push(i), None);
        }

        registry.run_all();

        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_registry_runs_once() {
        let registry = CleanupRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        registry.register(
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            },
            Some("count"),
        );

        registry.run_all();
        registry.run_all();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.pending_count(), 0);
        assert!(registry.is_drained());
    }

    #[test]
    fn test_register_after_drain_runs_immediately() {
        let registry = CleanupRegistry::new();
        registry.run_all();

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        registry.register(
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            },
            None,
        );

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_registry_continues_on_failure() {
        let registry = CleanupRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter1 = counter.clone();
        registry.register(
            move || {
                counter1.fetch_add(1, Ordering::SeqCst);
            },
            Some("first"),
        );

        registry.register(|| panic!("Intentional"), Some("panics"));

        let counter2 = counter.clone();
        registry.register(
            move || {
                counter2.fetch_add(1, Ordering::SeqCst);
            },
            Some("third"),
        );

        let failures = registry.run_all();

        // All actions attempted
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "panics");
    }
}
