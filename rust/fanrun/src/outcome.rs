//! Per-task outcomes and the aggregate result of a run.

use std::time::Duration;

use fanrun_common::{Error, Result};

use crate::task::TaskError;

/// How a single task ended.
#[derive(Debug)]
pub enum TaskOutcome {
    /// The task ran to completion without reporting an error.
    Succeeded,
    /// The task ran to completion and returned an error.
    Failed(TaskError),
    /// The task panicked; the payload message is kept.
    Panicked(String),
    /// The task never ran because its executor could not be started.
    Abandoned,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded)
    }

    /// `true` if the task ran to the end, whatever its result.
    pub fn is_completed(&self) -> bool {
        !matches!(self, TaskOutcome::Abandoned)
    }
}

/// The outcome of one task together with its identity.
#[derive(Debug)]
pub struct TaskReport {
    pub index: usize,
    pub label: String,
    pub outcome: TaskOutcome,
}

impl TaskReport {
    fn into_error(self) -> Option<Error> {
        match self.outcome {
            TaskOutcome::Succeeded => None,
            TaskOutcome::Failed(e) => {
                Some(Error::task_failed(self.index, self.label, e.into_inner()))
            }
            TaskOutcome::Panicked(message) => {
                Some(Error::task_panicked(self.index, self.label, message))
            }
            TaskOutcome::Abandoned => Some(Error::task_failed(
                self.index,
                self.label,
                "executor was never started".into(),
            )),
        }
    }
}

/// Aggregate result of a run: one [`TaskReport`] per task, ordered by task index.
#[derive(Debug)]
pub struct RunResult {
    reports: Vec<TaskReport>,
    completed: usize,
    elapsed: Duration,
}

impl RunResult {
    pub(crate) fn new(reports: Vec<TaskReport>, elapsed: Duration) -> RunResult {
        let completed = reports.iter().filter(|r| r.outcome.is_completed()).count();
        RunResult {
            reports,
            completed,
            elapsed,
        }
    }

    /// Number of tasks that ran to the end, successfully or not.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Number of tasks in the run.
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// `true` if every task ran to the end.
    pub fn is_complete(&self) -> bool {
        self.completed == self.reports.len()
    }

    /// Number of tasks that succeeded.
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Reports of the tasks that did not succeed, in task order.
    pub fn failures(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports.iter().filter(|r| !r.outcome.is_success())
    }

    /// The lowest-index task that did not succeed.
    pub fn first_failure(&self) -> Option<&TaskReport> {
        self.failures().next()
    }

    pub fn reports(&self) -> &[TaskReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<TaskReport> {
        self.reports
    }

    /// Wall-clock time from dispatch to the join barrier.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Turns the first failure (lowest task index) into an error.
    ///
    /// Returns the result unchanged if every task succeeded.
    pub fn into_result(self) -> Result<RunResult> {
        if self.succeeded() == self.len() {
            return Ok(self);
        }
        let error = self
            .reports
            .into_iter()
            .find_map(TaskReport::into_error)
            .expect("at least one failed task");
        Err(error)
    }
}
