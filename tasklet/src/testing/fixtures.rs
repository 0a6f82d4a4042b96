//! Test fixtures for tasks.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::task::{Settler, Task, TaskConfig, TaskContext};

/// Installs a test-friendly `tracing` subscriber.
///
/// Honors `RUST_LOG` and defaults to `tasklet=debug`. Safe to call from
/// every test; only the first call installs anything.
pub fn init_tracing() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "tasklet=debug".parse() {
        filter = filter.add_directive(directive);
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Records events in the order they happen.
///
/// Clones share the same log, so a clone can be moved into a listener
/// while the test keeps the original.
#[derive(Debug)]
pub struct Recorder<E> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E> Clone for Recorder<E> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<E> Default for Recorder<E> {
    fn default() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<E> Recorder<E>
where
    E: Clone + Send + 'static,
{
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn record(&self, event: E) {
        self.events.lock().push(event);
    }

    /// Returns a closure that records `event` when called.
    pub fn hook(&self, event: E) -> impl FnOnce() + Send + 'static {
        let recorder = self.clone();
        move || recorder.record(event)
    }

    /// Returns the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<E> {
        self.events.lock().clone()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forgets all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// A task whose settler and context are held by the test.
pub struct TaskFixture<T> {
    /// The task under test.
    pub task: Task<T>,
    /// Settles the task.
    pub settler: Settler<T>,
    /// The context its work function received.
    pub context: TaskContext<T>,
}

impl<T> TaskFixture<T>
where
    T: Clone + Send + 'static,
{
    /// Creates a fixture with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TaskConfig::default())
    }

    /// Creates a fixture with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the work function was never invoked.
    #[must_use]
    pub fn with_config(config: TaskConfig) -> Self {
        let mut slot = None;
        let task = Task::with_config(config, |settler, context| {
            slot = Some((settler, context));
        });
        let (settler, context) = slot.expect("work function runs during construction");
        Self {
            task,
            settler,
            context,
        }
    }
}

impl<T> std::fmt::Debug for TaskFixture<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskFixture")
            .field("task", &self.task)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl<T> Default for TaskFixture<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
