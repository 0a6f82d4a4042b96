//! The task core: settlement, abort coordination and construction.

use super::chain::TaskControl;
use super::config::TaskConfig;
use super::context::TaskContext;
use super::deferred::Deferred;
use super::id::TaskId;
use super::resolution::{tag_resolved, AbortReason};
use super::status::TaskStatus;
use super::work::{IntoWork, Work};
use crate::cancellation::{forward_abort, AbortSignal, CleanupRegistry, TimeoutGuard};
use crate::errors::{CancelledError, TaskError};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tracing::{debug, trace};

/// A work function, type-erased for the shared initializer.
type WorkFn<'a, T> = Box<dyn FnOnce(Settler<T>, TaskContext<T>) -> Work + 'a>;

/// State owned by a root task.
pub(crate) struct Core<T> {
    pub(crate) id: TaskId,
    pub(crate) deferred: Arc<Deferred<T>>,
    pub(crate) signal: AbortSignal<AbortReason<T>>,
    pub(crate) cleanup: CleanupRegistry,
}

impl<T> Core<T>
where
    T: Clone + Send + 'static,
{
    fn new() -> Self {
        Self {
            id: TaskId::new(),
            deferred: Arc::new(Deferred::new()),
            signal: AbortSignal::new(),
            cleanup: CleanupRegistry::new(),
        }
    }

    pub(crate) fn resolve(&self, value: T) {
        let claimed = self.deferred.claim(Ok(value.clone()));
        if claimed {
            debug!(task_id = %self.id, "Task fulfilled");
        }
        self.finish(claimed, tag_resolved(value));
    }

    pub(crate) fn reject(&self, reason: TaskError) {
        let claimed = self.deferred.claim(Err(reason.clone()));
        if claimed {
            debug!(task_id = %self.id, reason = %reason, "Task rejected");
        }
        self.finish(claimed, AbortReason::Aborted(reason));
    }

    /// Only the attempt that won the claim aborts, drains cleanup and
    /// publishes, so the abort reason always matches the outcome and
    /// awaiters observe it after both.
    fn finish(&self, claimed: bool, reason: AbortReason<T>) {
        if claimed {
            self.signal.abort(reason);
            self.cleanup.run_all();
            self.deferred.publish();
        }
    }

    pub(crate) fn abort(&self, reason: TaskError) {
        if self.signal.abort(AbortReason::Aborted(reason)) {
            trace!(task_id = %self.id, "Task aborted");
        }
    }
}

impl<T> TaskControl for Core<T>
where
    T: Clone + Send + 'static,
{
    fn abort(&self, reason: TaskError) {
        Core::abort(self, reason);
    }

    fn reject(&self, reason: TaskError) {
        Core::reject(self, reason);
    }
}

/// Wires configuration and runs the work function.
fn init<T>(config: TaskConfig, work: Option<WorkFn<'_, T>>) -> Arc<Core<T>>
where
    T: Clone + Send + 'static,
{
    let core = Arc::new(Core::new());
    let reject_on_abort = config.reject_on_abort;
    let timeout = config.active_timeout();
    debug!(task_id = %core.id, reject_on_abort, timeout = ?timeout, "Task created");

    if let Some(external) = &config.abort_signal {
        if let Some(reason) = external.reason() {
            if reject_on_abort {
                core.reject(reason);
            } else {
                core.abort(reason);
            }
        } else {
            let link = forward_abort(external, &core.signal, |reason| {
                AbortReason::Aborted(reason.clone())
            });
            core.cleanup.register(
                move || {
                    link.unsubscribe();
                },
                Some("abort_signal"),
            );
        }
    }

    if reject_on_abort {
        let weak = Arc::downgrade(&core);
        core.signal.on_aborted(move |reason| {
            if let (Some(core), AbortReason::Aborted(error)) = (weak.upgrade(), reason) {
                core.reject(error.clone());
            }
        });
    }

    if let Some(timeout) = timeout {
        let signal = core.signal.clone();
        match TimeoutGuard::start(timeout, move |error| {
            signal.abort(AbortReason::Aborted(error.into()));
        }) {
            Ok(guard) => core.cleanup.register(move || guard.cancel(), Some("timeout")),
            Err(error) => core.reject(error),
        }
    }

    if let Some(work) = work {
        let settler = Settler::new(Arc::clone(&core));
        let context = TaskContext::new(Arc::clone(&core));
        match std::panic::catch_unwind(AssertUnwindSafe(move || work(settler, context))) {
            Ok(Work::Started) => {}
            Ok(Work::Failed(error)) => core.reject(error),
            Ok(Work::Inner(attach)) => {
                let outer = Arc::clone(&core);
                attach(Box::new(move |error| outer.reject(error)));
            }
            Err(panic) => core.reject(TaskError::from_panic(panic)),
        }
    }

    core
}

/// Settlement handle passed to a work function.
///
/// Settling also aborts the task (with the resolution tag on fulfilment)
/// and runs its cleanup. Only the first settlement takes effect.
pub struct Settler<T> {
    core: Arc<Core<T>>,
}

impl<T> Settler<T>
where
    T: Clone + Send + 'static,
{
    fn new(core: Arc<Core<T>>) -> Self {
        Self { core }
    }

    /// Fulfils the task with `value`.
    pub fn resolve(&self, value: T) {
        self.core.resolve(value);
    }

    /// Rejects the task with `reason`.
    pub fn reject(&self, reason: impl Into<TaskError>) {
        self.core.reject(reason.into());
    }
}

impl<T> Clone for Settler<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> std::fmt::Debug for Settler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settler").field("task_id", &self.core.id).finish()
    }
}

/// A cancellable asynchronous result.
///
/// `Task` is a cloneable handle that resolves to `Result<T, TaskError>`
/// when awaited. Besides settling through its work function, it can be
/// aborted by the caller, by an external [`AbortSignal`], or by a timeout.
/// By default every abort also rejects the task.
///
/// Tasks derived through [`then`](Task::then), [`catch`](Task::catch) and
/// friends share the root task's [`abort`](Task::abort) and
/// [`reject`](Task::reject).
///
/// ```rust,ignore
/// let task = Task::from_fn_with_config(
///     TaskConfig::new().with_timeout_ms(500),
///     |ctx| async move {
///         ctx.throw_if_aborted()?;
///         Ok(fetch().await)
///     },
/// );
/// let len = task.then(|body| body.len());
/// len.cancel(); // rejects the root with `CancelledError`
/// ```
pub struct Task<T> {
    id: TaskId,
    pub(crate) deferred: Arc<Deferred<T>>,
    pub(crate) control: Arc<dyn TaskControl + Send + Sync>,
}

impl<T> Task<T>
where
    T: Clone + Send + 'static,
{
    /// Creates a task running `work` with the default configuration.
    ///
    /// `work` runs synchronously, before this returns. It receives a
    /// [`Settler`] and a [`TaskContext`] and may return `()`, a
    /// `Result<(), E>` (an `Err` rejects the task), or an inner [`Task`]
    /// whose failure rejects this one. A panic rejects the task with
    /// [`TaskError::Panicked`].
    pub fn new<W, R>(work: W) -> Self
    where
        W: FnOnce(Settler<T>, TaskContext<T>) -> R,
        R: IntoWork,
    {
        Self::with_config(TaskConfig::default(), work)
    }

    /// Creates a task running `work` with the given configuration.
    pub fn with_config<W, R>(config: TaskConfig, work: W) -> Self
    where
        W: FnOnce(Settler<T>, TaskContext<T>) -> R,
        R: IntoWork,
    {
        let work: WorkFn<'_, T> = Box::new(move |settler: Settler<T>, context: TaskContext<T>| {
            work(settler, context).into_work()
        });
        Self::from_core(&init(config, Some(work)))
    }

    /// Creates a task without a work function. It settles only through
    /// [`reject`](Task::reject), or through an abort when
    /// `reject_on_abort` is set.
    #[must_use]
    pub fn from_config(config: TaskConfig) -> Self {
        Self::from_core(&init(config, None))
    }

    /// Creates a task without a work function and returns its settler.
    #[must_use]
    pub fn deferred(config: TaskConfig) -> (Self, Settler<T>) {
        let core = init(config, None);
        (Self::from_core(&core), Settler::new(core))
    }

    /// Creates a task from an async function with the default configuration.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(TaskContext<T>) -> Fut,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self::from_fn_with_config(TaskConfig::default(), f)
    }

    /// Creates a task from an async function.
    ///
    /// The future returned by `f` is spawned on the current tokio runtime
    /// and settles the task with its output. A panic rejects the task with
    /// [`TaskError::Panicked`]. Outside a runtime the task is rejected with
    /// [`TaskError::Runtime`].
    pub fn from_fn_with_config<F, Fut>(config: TaskConfig, f: F) -> Self
    where
        F: FnOnce(TaskContext<T>) -> Fut,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self::with_config(config, move |settler, context| -> Result<(), TaskError> {
            let runtime = Handle::try_current().map_err(|e| TaskError::Runtime(e.to_string()))?;
            let future = f(context);
            runtime.spawn(async move {
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(Ok(value)) => settler.resolve(value),
                    Ok(Err(error)) => settler.reject(error),
                    Err(panic) => settler.reject(TaskError::from_panic(panic)),
                }
            });
            Ok(())
        })
    }

    /// Creates a task already fulfilled with `value`.
    pub fn resolved(value: T) -> Self {
        Self::new(move |settler, _| settler.resolve(value))
    }

    /// Creates a task already rejected with `reason`.
    pub fn rejected(reason: impl Into<TaskError>) -> Self {
        let reason = reason.into();
        Self::new(move |settler: Settler<T>, _| settler.reject(reason))
    }

    fn from_core(core: &Arc<Core<T>>) -> Self {
        let control: Arc<dyn TaskControl + Send + Sync> = Arc::<Core<T>>::clone(core);
        Self {
            id: core.id,
            deferred: Arc::clone(&core.deferred),
            control,
        }
    }

    pub(crate) fn from_parts(
        deferred: Arc<Deferred<T>>,
        control: Arc<dyn TaskControl + Send + Sync>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            deferred,
            control,
        }
    }

    /// Returns this handle's id. Derived tasks get their own id.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the settlement status visible to awaiters.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.deferred.status()
    }

    /// Returns true once the outcome is visible to awaiters.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status().is_terminal()
    }

    /// Aborts the root task with `reason`. Later aborts are ignored.
    pub fn abort(&self, reason: impl Into<TaskError>) {
        self.control.abort(reason.into());
    }

    /// Rejects the root task with `reason`, unless it already settled.
    pub fn reject(&self, reason: impl Into<TaskError>) {
        self.control.reject(reason.into());
    }

    /// Aborts the root task with [`CancelledError`].
    pub fn cancel(&self) {
        self.abort(CancelledError);
    }

    /// Aborts the root task without a specific reason, using
    /// [`TaskError::Aborted`].
    pub fn stop(&self) {
        self.abort(TaskError::Aborted);
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            deferred: Arc::clone(&self.deferred),
            control: Arc::clone(&self.control),
        }
    }
}

impl<T> Future for Task<T>
where
    T: Clone + Send + 'static,
{
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.deferred.poll_outcome(cx)
    }
}

impl<T> std::fmt::Debug for Task<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}
