//! Testing utilities for tasks and abort signals.
//!
//! This module provides:
//! - Tracing setup for tests
//! - A call recorder for listeners and cleanup actions
//! - A fixture exposing a task's settler and context
//! - Poll-level assertions on task outcomes

mod assertions;
mod fixtures;

pub use assertions::{
    assert_cancelled, assert_fulfilled_with, assert_pending, assert_rejected_with,
    assert_timed_out, poll_now,
};
pub use fixtures::{init_tracing, Recorder, TaskFixture};
