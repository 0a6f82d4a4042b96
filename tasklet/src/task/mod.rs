//! Cancellable asynchronous tasks.
//!
//! This module provides:
//! - Task, the awaitable handle with abort, reject and cancel
//! - Settler and TaskContext, handed to a task's work function
//! - TaskConfig for external signals, timeouts and reject-on-abort
//! - then/and_then/catch/finally continuations sharing the root's control
//! - AbortReason and the resolution tag helpers

mod chain;
mod config;
mod context;
mod core;
mod deferred;
mod id;
mod resolution;
mod status;
mod work;


pub use config::TaskConfig;
pub use context::TaskContext;
pub use self::core::{Settler, Task};
pub use id::TaskId;
pub use resolution::{is_resolved_marker, tag_resolved, unwrap_resolved_marker, AbortReason};
pub use status::TaskStatus;
pub use work::{FailureHandler, IntoWork, Work};
