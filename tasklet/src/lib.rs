//! # Tasklet
//!
//! Cancellable asynchronous tasks for tokio.
//!
//! A [`Task`](task::Task) is an awaitable result that can be stopped from the
//! outside. Tasklet provides:
//!
//! - **Cooperative abort**: `abort`, `cancel`, external signals and timeouts
//!   all funnel through one first-reason-wins abort signal
//! - **Reject on abort**: by default any abort also rejects the task
//! - **Execution context**: the running work observes aborts through
//!   `is_aborted`, `throw_if_aborted` and `on_aborted`
//! - **Chained control**: tasks derived with `then`, `catch` and `finally`
//!   abort and reject the root task
//! - **Run-once cleanup**: timers and listeners are torn down when the task
//!   settles
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tasklet::prelude::*;
//!
//! let task = Task::from_fn_with_config(
//!     TaskConfig::new().with_timeout_ms(500),
//!     |ctx| async move {
//!         let page = fetch_page().await;
//!         ctx.throw_if_aborted()?;
//!         Ok(page)
//!     },
//! );
//!
//! let words = task.then(|page| page.split_whitespace().count());
//! words.cancel(); // rejects the whole chain with `CancelledError`
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod errors;
pub mod task;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{
        forward_abort, AbortSignal, CleanupRegistry, Subscription, TimeoutGuard,
    };
    pub use crate::errors::{CancelledError, TaskError, TimeoutError};
    pub use crate::task::{
        AbortReason, IntoWork, Settler, Task, TaskConfig, TaskContext, TaskId,
        TaskStatus, Work,
    };
}
