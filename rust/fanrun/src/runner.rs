//! The fan-out task runner.
//!
//! [`Runner::run`] dispatches a [`TaskSet`] and blocks the caller at a join barrier
//! until every task has signalled completion. Two dispatch strategies exist:
//!
//! 1. **Fan-out** (default): one executor thread per task, no admission control.
//! 2. **Worker pool**: when [`RunOptions::max_workers`] is smaller than the number
//!    of tasks, a fixed set of workers drains a shared queue of tasks.
//!
//! Both strategies share the same bookkeeping. A fresh
//! [`CompletionLatch`] is created for every run and issues one
//! [`CompletionToken`] per task. An executor first delivers the task's outcome
//! through a oneshot slot, then completes the token. Once the latch reports all
//! tokens, every outcome slot is already filled, so collecting the
//! [`RunResult`] never blocks.
//!
//! Executors run inside [`std::thread::scope`], which lets tasks borrow data owned
//! by the caller.

use std::{thread, time::Instant};

use fanrun_common::{Error, Result};
use fanrun_workflow::{
    channel,
    latch::{CompletionLatch, CompletionToken, LatchReport},
    oneshot::{self, OneshotReceiver, OneshotSender},
};

use crate::{
    options::RunOptions,
    outcome::{RunResult, TaskOutcome, TaskReport},
    task::{Task, TaskSet},
};

/// Dispatches task sets according to its [`RunOptions`].
///
/// A runner holds no threads between runs; it can be shared and reused freely.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    options: RunOptions,
}

impl Runner {
    /// Creates a runner, validating `options`.
    pub fn new(options: RunOptions) -> Result<Runner> {
        options.validate()?;
        Ok(Runner { options })
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Runs every task of `tasks` concurrently and waits until all of them are done.
    ///
    /// Task failures and panics are recorded in the returned [`RunResult`] and never
    /// abort sibling tasks. Returns [`ErrorKind::IncompleteRun`] if some executors
    /// could not be started; the tasks that did start have finished by then.
    ///
    /// [`ErrorKind::IncompleteRun`]: fanrun_common::ErrorKind::IncompleteRun
    pub fn run(&self, tasks: TaskSet<'_>) -> Result<RunResult> {
        let task_count = tasks.len();
        let executors = self.options.executor_count(task_count);
        let labels = tasks.labels().map(str::to_string).collect::<Vec<_>>();

        let started = Instant::now();
        let (latch, tokens) = CompletionLatch::new(task_count);
        let mut slots = Vec::with_capacity(task_count);
        let items = tasks
            .into_tasks()
            .into_iter()
            .zip(tokens)
            .map(|(task, token)| {
                let (tx, rx) = oneshot::channel();
                slots.push(rx);
                WorkItem {
                    task,
                    token,
                    outcome: tx,
                }
            })
            .collect::<Vec<_>>();

        log::debug!("dispatching {task_count} task(s) on {executors} executor(s)");
        let report = if executors < task_count {
            self.run_pooled(items, latch, executors)
        } else {
            self.run_fan_out(items, latch)
        };
        let elapsed = started.elapsed();
        log::debug!(
            "join barrier reached after {elapsed:?}: {} completed, {} released",
            report.completed,
            report.released
        );

        if !report.is_complete() {
            return Err(Error::incomplete_run(report.expected, report.completed));
        }
        Ok(RunResult::new(collect_reports(labels, slots), elapsed))
    }

    fn run_fan_out(&self, items: Vec<WorkItem<'_>>, latch: CompletionLatch) -> LatchReport {
        thread::scope(|scope| {
            for item in items {
                let index = item.token.index();
                let spawned = self
                    .options
                    .thread_builder(index)
                    .spawn_scoped(scope, move || item.execute());
                if let Err(e) = spawned {
                    log::error!("failed to start executor for task #{index}: {e}");
                }
            }
            latch.wait()
        })
    }

    fn run_pooled(
        &self,
        items: Vec<WorkItem<'_>>,
        latch: CompletionLatch,
        workers: usize,
    ) -> LatchReport {
        let (tx, rx) = channel::unbounded();
        for item in items {
            // The receiver is alive, so the queue cannot reject the item.
            let _ = tx.send(item);
        }
        tx.close();

        thread::scope(|scope| {
            for worker in 0..workers {
                let rx = rx.clone();
                let spawned = self
                    .options
                    .thread_builder(worker)
                    .spawn_scoped(scope, move || worker_loop(worker, rx));
                if let Err(e) = spawned {
                    log::error!("failed to start worker #{worker}: {e}");
                }
            }
            // Without any live worker the queued items are discarded here, which
            // releases their tokens.
            drop(rx);
            latch.wait()
        })
    }
}

fn worker_loop(worker: usize, rx: channel::Receiver<WorkItem<'_>>) {
    let mut executed = 0usize;
    while let Some(item) = rx.recv() {
        item.execute();
        executed += 1;
    }
    log::trace!("worker #{worker} drained the queue after {executed} task(s)");
}

fn collect_reports(
    labels: Vec<String>,
    slots: Vec<OneshotReceiver<TaskOutcome>>,
) -> Vec<TaskReport> {
    labels
        .into_iter()
        .zip(slots)
        .enumerate()
        .map(|(index, (label, slot))| TaskReport {
            index,
            label,
            outcome: slot.recv().unwrap_or(TaskOutcome::Abandoned),
        })
        .collect()
}

/// A task bound to its completion token and outcome slot.
struct WorkItem<'a> {
    task: Task<'a>,
    token: CompletionToken,
    outcome: OneshotSender<TaskOutcome>,
}

impl WorkItem<'_> {
    fn execute(self) {
        let WorkItem {
            task,
            token,
            outcome,
        } = self;
        let index = token.index();
        let label = task.label().to_string();
        let result = task.execute();
        match &result {
            TaskOutcome::Succeeded => log::trace!("task #{index} '{label}' completed"),
            TaskOutcome::Failed(e) => log::warn!("task #{index} '{label}' failed: {e}"),
            TaskOutcome::Panicked(msg) => log::warn!("task #{index} '{label}' panicked: {msg}"),
            TaskOutcome::Abandoned => {}
        }
        // The outcome must be in place before the token lets the coordinator through.
        let _ = outcome.send(result);
        token.complete();
    }
}
