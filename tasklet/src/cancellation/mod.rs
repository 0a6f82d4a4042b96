//! Structured cancellation and cleanup utilities.
//!
//! This module provides:
//! - AbortSignal for cooperative, first-reason-wins aborts
//! - forward_abort for linking an external signal into an internal one
//! - CleanupRegistry for run-once teardown
//! - TimeoutGuard for deadline-driven aborts

mod bridge;
mod cleanup;
mod signal;
mod timeout;

pub use bridge::forward_abort;
pub use cleanup::{CleanupAction, CleanupRegistry};
pub use signal::{AbortListener, AbortSignal, Subscription};
pub use timeout::TimeoutGuard;
