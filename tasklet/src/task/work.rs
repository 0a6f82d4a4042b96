//! What a work function hands back to the task that invoked it.

use super::Task;
use crate::errors::TaskError;

/// Handler invoked with the failure of an inner task.
pub type FailureHandler = Box<dyn FnOnce(TaskError) + Send>;

/// The synchronous result of running a work function.
pub enum Work {
    /// The work function returned normally.
    Started,
    /// The work function failed before returning; the task is rejected.
    Failed(TaskError),
    /// The work function returned an inner task. Its failure rejects the
    /// outer task.
    Inner(Box<dyn FnOnce(FailureHandler) + Send>),
}

impl std::fmt::Debug for Work {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "Started"),
            Self::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
            Self::Inner(_) => write!(f, "Inner(..)"),
        }
    }
}

/// Conversion from a work function's return value into [`Work`].
pub trait IntoWork {
    /// Performs the conversion.
    fn into_work(self) -> Work;
}

impl IntoWork for Work {
    fn into_work(self) -> Work {
        self
    }
}

impl IntoWork for () {
    fn into_work(self) -> Work {
        Work::Started
    }
}

impl<E> IntoWork for Result<(), E>
where
    E: Into<TaskError>,
{
    fn into_work(self) -> Work {
        match self {
            Ok(()) => Work::Started,
            Err(error) => Work::Failed(error.into()),
        }
    }
}

impl<U> IntoWork for Task<U>
where
    U: Clone + Send + 'static,
{
    fn into_work(self) -> Work {
        Work::Inner(Box::new(move |on_failure| self.on_rejected(on_failure)))
    }
}
