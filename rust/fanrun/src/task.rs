//! Units of work and the ordered sets they are dispatched in.

use std::panic::{AssertUnwindSafe, catch_unwind};

use fanrun_common::error::StdErrorBoxed;

use crate::outcome::TaskOutcome;

type WorkFn<'a> = Box<dyn FnOnce() -> Result<(), TaskError> + Send + 'a>;

/// A single unit of work: a label plus the closure producing its side effect.
///
/// The closure may borrow data owned by the caller (lifetime `'a`); the runner
/// guarantees that every closure has finished before [`Runner::run`] returns.
///
/// [`Runner::run`]: crate::Runner::run
pub struct Task<'a> {
    label: String,
    work: WorkFn<'a>,
}

impl<'a> Task<'a> {
    /// Creates a task that cannot fail.
    pub fn new<F>(label: impl Into<String>, f: F) -> Task<'a>
    where
        F: FnOnce() + Send + 'a,
    {
        Task {
            label: label.into(),
            work: Box::new(move || {
                f();
                Ok(())
            }),
        }
    }

    /// Creates a task whose closure reports failure through its return value.
    pub fn fallible<F, E>(label: impl Into<String>, f: F) -> Task<'a>
    where
        F: FnOnce() -> Result<(), E> + Send + 'a,
        E: Into<TaskError>,
    {
        Task {
            label: label.into(),
            work: Box::new(move || f().map_err(Into::into)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the task on the current thread, converting a panic into
    /// [`TaskOutcome::Panicked`].
    pub(crate) fn execute(self) -> TaskOutcome {
        match catch_unwind(AssertUnwindSafe(self.work)) {
            Ok(Ok(())) => TaskOutcome::Succeeded,
            Ok(Err(e)) => TaskOutcome::Failed(e),
            Err(payload) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
        }
    }
}

impl std::fmt::Debug for Task<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("label", &self.label).finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// An ordered, fixed-length collection of tasks.
///
/// A task's identity is its position in the set. The set is consumed when it is
/// dispatched, so it cannot change once a run has started.
#[derive(Debug, Default)]
pub struct TaskSet<'a> {
    tasks: Vec<Task<'a>>,
}

impl<'a> TaskSet<'a> {
    pub fn new() -> TaskSet<'a> {
        TaskSet { tasks: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> TaskSet<'a> {
        TaskSet {
            tasks: Vec::with_capacity(capacity),
        }
    }

    /// Builds one task per payload item; each task calls `f` with its item.
    ///
    /// Task labels are the items' `Display` representations.
    pub fn from_payloads<P, F>(items: impl IntoIterator<Item = P>, f: F) -> TaskSet<'a>
    where
        P: std::fmt::Display + Send + 'a,
        F: Fn(P) + Send + Sync + 'a,
    {
        Self::from_labeled_payloads(items, |p| p.to_string(), f)
    }

    /// Like [`from_payloads`](Self::from_payloads), with labels produced by `label`.
    pub fn from_labeled_payloads<P, L, F>(
        items: impl IntoIterator<Item = P>,
        label: L,
        f: F,
    ) -> TaskSet<'a>
    where
        P: Send + 'a,
        L: Fn(&P) -> String,
        F: Fn(P) + Send + Sync + 'a,
    {
        let f = std::sync::Arc::new(f);
        items
            .into_iter()
            .map(|item| {
                let f = f.clone();
                Task::new(label(&item), move || f(item))
            })
            .collect()
    }

    /// Appends a task and returns its index.
    pub fn push(&mut self, task: Task<'a>) -> usize {
        self.tasks.push(task);
        self.tasks.len() - 1
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(Task::label)
    }

    pub(crate) fn into_tasks(self) -> Vec<Task<'a>> {
        self.tasks
    }
}

impl<'a> FromIterator<Task<'a>> for TaskSet<'a> {
    fn from_iter<I: IntoIterator<Item = Task<'a>>>(iter: I) -> Self {
        TaskSet {
            tasks: iter.into_iter().collect(),
        }
    }
}

impl<'a> Extend<Task<'a>> for TaskSet<'a> {
    fn extend<I: IntoIterator<Item = Task<'a>>>(&mut self, iter: I) {
        self.tasks.extend(iter);
    }
}

/// The error a fallible task reports.
///
/// Any `std::error::Error + Send + Sync` converts into it; plain messages go
/// through [`TaskError::msg`].
pub struct TaskError(StdErrorBoxed);

impl TaskError {
    pub fn msg(message: impl std::fmt::Display) -> TaskError {
        TaskError(message.to_string().into())
    }

    pub fn into_inner(self) -> StdErrorBoxed {
        self.0
    }
}

impl<E> From<E> for TaskError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: E) -> Self {
        TaskError(Box::new(e))
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::fmt::Debug for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_outcomes() {
        assert!(matches!(
            Task::new("ok", || ()).execute(),
            TaskOutcome::Succeeded
        ));

        let failed = Task::fallible("io", || {
            Err(std::io::Error::other("disk on fire"))
        })
        .execute();
        match failed {
            TaskOutcome::Failed(e) => assert_eq!(e.to_string(), "disk on fire"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let panicked = Task::new("boom", || panic!("exploded at {}", 42)).execute();
        match panicked {
            TaskOutcome::Panicked(msg) => assert_eq!(msg, "exploded at 42"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_task_error_msg() {
        let res: Result<(), TaskError> = Err(TaskError::msg("no recipient"));
        let outcome = Task::fallible("msg", || res).execute();
        assert!(matches!(outcome, TaskOutcome::Failed(ref e) if e.to_string() == "no recipient"));
    }

    #[test]
    fn test_task_set_from_payloads() {
        let set = TaskSet::from_payloads(["Alice", "Bob"], |_name| ());
        assert_eq!(set.len(), 2);
        assert_eq!(set.labels().collect::<Vec<_>>(), vec!["Alice", "Bob"]);

        let mut set = TaskSet::with_capacity(1);
        assert!(set.is_empty());
        assert_eq!(set.push(Task::new("first", || ())), 0);
        assert_eq!(set.push(Task::new("second", || ())), 1);
    }
}
