//! Resolution tagging for the abort channel.
//!
//! Settling a task also aborts it, so the abort reason has to tell "finished
//! with a value" apart from "stopped for another reason". A fulfilment is
//! recorded as [`AbortReason::Resolved`], everything else as
//! [`AbortReason::Aborted`].

use crate::errors::TaskError;
use std::fmt;

/// The reason a task's abort signal fired.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason<T> {
    /// The task fulfilled with this value.
    Resolved(T),
    /// The task was aborted or rejected with this error.
    Aborted(TaskError),
}

impl<T> AbortReason<T> {
    /// Returns true if this is the resolution tag.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        is_resolved_marker(self)
    }

    /// Returns the fulfilled value, if this is the resolution tag.
    #[must_use]
    pub fn resolved_value(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Aborted(_) => None,
        }
    }

    /// Returns the abort error, unless this is the resolution tag.
    #[must_use]
    pub fn error(&self) -> Option<&TaskError> {
        match self {
            Self::Resolved(_) => None,
            Self::Aborted(error) => Some(error),
        }
    }

    /// Converts into an error; the resolution tag becomes [`TaskError::Settled`].
    #[must_use]
    pub fn into_error(self) -> TaskError {
        match self {
            Self::Resolved(_) => TaskError::Settled,
            Self::Aborted(error) => error,
        }
    }
}

impl<T> From<TaskError> for AbortReason<T> {
    fn from(error: TaskError) -> Self {
        Self::Aborted(error)
    }
}

impl<T> fmt::Display for AbortReason<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(_) => write!(f, "resolved"),
            Self::Aborted(error) => write!(f, "{error}"),
        }
    }
}

/// Tags a fulfilled value for the abort channel.
pub fn tag_resolved<T>(value: T) -> AbortReason<T> {
    AbortReason::Resolved(value)
}

/// Returns true if `reason` is the resolution tag.
pub fn is_resolved_marker<T>(reason: &AbortReason<T>) -> bool {
    matches!(reason, AbortReason::Resolved(_))
}

/// Extracts the fulfilled value from a resolution tag.
pub fn unwrap_resolved_marker<T>(reason: AbortReason<T>) -> Option<T> {
    match reason {
        AbortReason::Resolved(value) => Some(value),
        AbortReason::Aborted(_) => None,
    }
}
