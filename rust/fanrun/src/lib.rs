//! Fan-out execution of a fixed set of independent tasks behind a join barrier.
//!
//! The crate dispatches every task of a [`TaskSet`] to its own executor thread (or,
//! when [`RunOptions::max_workers`] is set, to a fixed set of workers draining a
//! shared queue), then blocks the caller until each task has signalled completion.
//! The aggregate [`RunResult`] reports one [`TaskOutcome`] per task, in task order.
//!
//! A task failure or panic never aborts its siblings; callers that want the first
//! failure as an error use [`RunResult::into_result`].
//!
//! The [`stream`] module covers the single-producer case: a producer thread emits
//! an ordered sequence of messages and closes the stream, and the consumer iterates
//! until the stream ends.
//!
//! ```rust,no_run
//! use std::sync::Mutex;
//! use fanrun::TaskSet;
//!
//! let seen = Mutex::new(Vec::new());
//! let tasks = TaskSet::from_payloads(["Alice", "Bob", "Charlie"], |name| {
//!     seen.lock().unwrap().push(name.to_string());
//! });
//! let result = fanrun::run(tasks).unwrap();
//! assert_eq!(result.completed(), 3);
//! assert_eq!(seen.into_inner().unwrap().len(), 3);
//! ```

pub mod options;
pub mod outcome;
pub mod runner;
pub mod stream;
pub mod task;

pub use fanrun_common::{Error, ErrorKind, Result};
pub use options::RunOptions;
pub use outcome::{RunResult, TaskOutcome, TaskReport};
pub use runner::Runner;
pub use task::{Task, TaskError, TaskSet};

/// Runs every task concurrently, one executor per task, and waits for all of them.
///
/// Equivalent to `Runner::default().run(tasks)`.
pub fn run(tasks: TaskSet<'_>) -> Result<RunResult> {
    Runner::default().run(tasks)
}
