//! Runner configuration.

use serde::{Deserialize, Serialize};

use fanrun_common::{Result, verify_arg};

/// Default prefix for executor thread names.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "fanrun-exec";

/// Options controlling how a [`Runner`](crate::Runner) dispatches tasks.
///
/// Missing fields deserialize to their defaults, so a partial JSON document such as
/// `{"max_workers": 4}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptions {
    /// Upper bound on concurrently running executors.
    ///
    /// `None` spawns one executor per task. `Some(k)` with `k` smaller than the
    /// number of tasks runs them on `k` workers draining a shared queue.
    pub max_workers: Option<usize>,
    /// Executor threads are named `<prefix>-<index>`. An empty prefix leaves the
    /// threads unnamed. NUL bytes are rejected by [`validate`](Self::validate).
    pub thread_name_prefix: String,
    /// Stack size for executor threads; `None` keeps the platform default.
    pub stack_size: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            max_workers: None,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }
}

impl RunOptions {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    pub fn with_unbounded_workers(mut self) -> Self {
        self.max_workers = None;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Checks that every configured limit is usable.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_workers) = self.max_workers {
            verify_arg!(max_workers, max_workers != 0);
        }
        if let Some(stack_size) = self.stack_size {
            verify_arg!(stack_size, stack_size != 0);
        }
        let thread_name_prefix = &self.thread_name_prefix;
        verify_arg!(thread_name_prefix, !thread_name_prefix.contains('\0'));
        Ok(())
    }

    /// Number of executors to start for `task_count` tasks.
    pub fn executor_count(&self, task_count: usize) -> usize {
        match self.max_workers {
            Some(max) => max.min(task_count),
            None => task_count,
        }
    }

    pub(crate) fn thread_builder(&self, index: usize) -> std::thread::Builder {
        let mut builder = std::thread::Builder::new();
        if !self.thread_name_prefix.is_empty() {
            builder = builder.name(format!("{}-{index}", self.thread_name_prefix));
        }
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder
    }
}
