use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use fanrun::{ErrorKind, RunOptions, Runner, Task, TaskOutcome, TaskSet};

#[test]
fn test_run_returns_after_every_task() {
    fastrand::seed(7_341_221);
    for _ in 0..10 {
        let n = fastrand::usize(1..24);
        let finished = AtomicUsize::new(0);
        let tasks = (0..n)
            .map(|i| {
                let finished = &finished;
                let delay = Duration::from_millis(fastrand::u64(0..20));
                Task::new(format!("task-{i}"), move || {
                    thread::sleep(delay);
                    finished.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect::<TaskSet>();

        let result = fanrun::run(tasks).unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), n);
        assert_eq!(result.completed(), n);
        assert_eq!(result.len(), n);
        assert!(result.is_complete());
    }
}

#[test]
fn test_completed_count_matches_atomic_counter() {
    for n in [1, 2, 5, 64] {
        let counter = AtomicUsize::new(0);
        let tasks = TaskSet::from_payloads(0..n, |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let result = fanrun::run(tasks).unwrap();
        assert_eq!(result.completed(), n);
        assert_eq!(counter.load(Ordering::SeqCst), n);
    }
}

#[test]
fn test_tasks_run_in_parallel() {
    let delay = Duration::from_millis(500);
    let tasks = TaskSet::from_payloads(0..4, |_| thread::sleep(delay));

    let start = Instant::now();
    let result = fanrun::run(tasks).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(result.completed(), 4);
    assert!(elapsed >= delay);
    assert!(elapsed < delay * 3, "took {elapsed:?}");
    assert!(result.elapsed() <= elapsed);
}

#[test]
fn test_named_tasks_append_to_shared_collection() {
    let names = Mutex::new(Vec::new());
    let tasks = TaskSet::from_payloads(["Alice", "Bob", "Charlie"], |name| {
        names.lock().unwrap().push(name.to_string());
    });

    let result = fanrun::run(tasks).unwrap();
    assert_eq!(result.completed(), 3);

    let names = names.into_inner().unwrap();
    assert_eq!(names.len(), 3);
    let names = names.into_iter().collect::<HashSet<_>>();
    let expected = ["Alice", "Bob", "Charlie"]
        .into_iter()
        .map(String::from)
        .collect::<HashSet<_>>();
    assert_eq!(names, expected);
}

#[test]
fn test_empty_task_set_returns_immediately() {
    let start = Instant::now();
    let result = fanrun::run(TaskSet::new()).unwrap();
    assert_eq!(result.completed(), 0);
    assert!(result.is_empty());
    assert!(start.elapsed() < Duration::from_secs(1));

    let pooled = Runner::new(RunOptions::default().with_max_workers(2)).unwrap();
    assert_eq!(pooled.run(TaskSet::new()).unwrap().completed(), 0);
}

#[test]
fn test_failures_do_not_abort_siblings() {
    let ran = AtomicUsize::new(0);
    let mut tasks = TaskSet::new();
    for i in 0..6 {
        let ran = &ran;
        tasks.push(Task::fallible(format!("task-{i}"), move || {
            thread::sleep(Duration::from_millis(10));
            ran.fetch_add(1, Ordering::SeqCst);
            match i {
                1 => Err(fanrun::TaskError::msg("recipient unknown")),
                4 => panic!("corrupt payload"),
                _ => Ok(()),
            }
        }));
    }

    let result = fanrun::run(tasks).unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 6);
    assert_eq!(result.completed(), 6);
    assert_eq!(result.succeeded(), 4);
    assert_eq!(
        result.failures().map(|r| r.index).collect::<Vec<_>>(),
        vec![1, 4]
    );

    let err = result.into_result().unwrap_err();
    assert_eq!(
        err.to_string(),
        "task #1 'task-1' failed: recipient unknown"
    );
}

#[test]
fn test_worker_pool_caps_concurrency() {
    const WORKERS: usize = 3;
    let active = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);
    let tasks = TaskSet::from_payloads(0..15, |_| {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(15));
        active.fetch_sub(1, Ordering::SeqCst);
    });

    let runner = Runner::new(RunOptions::default().with_max_workers(WORKERS)).unwrap();
    let result = runner.run(tasks).unwrap();

    assert_eq!(result.completed(), 15);
    assert!(peak.load(Ordering::SeqCst) <= WORKERS);
    assert_eq!(active.load(Ordering::SeqCst), 0);
    let indices = result.reports().iter().map(|r| r.index).collect::<Vec<_>>();
    assert_eq!(indices, (0..15).collect::<Vec<_>>());
}

#[test]
fn test_worker_pool_reports_failures_by_index() {
    let tasks = (0..8)
        .map(|i| {
            Task::fallible(format!("job-{i}"), move || {
                if i % 3 == 0 {
                    Err(std::io::Error::other(format!("job {i} failed")))
                } else {
                    Ok(())
                }
            })
        })
        .collect::<TaskSet>();

    let runner = Runner::new(RunOptions::default().with_max_workers(2)).unwrap();
    let result = runner.run(tasks).unwrap();
    assert_eq!(result.completed(), 8);
    for report in result.reports() {
        let failed = matches!(report.outcome, TaskOutcome::Failed(_));
        assert_eq!(failed, report.index % 3 == 0, "{report:?}");
        assert_eq!(report.label, format!("job-{}", report.index));
    }
}

#[test]
fn test_caller_keeps_payload_ownership() {
    let people = vec![String::from("Alice"), String::from("Bob")];
    let lengths = Mutex::new(0usize);
    let tasks = TaskSet::from_payloads(people.iter(), |name| {
        *lengths.lock().unwrap() += name.len();
    });
    fanrun::run(tasks).unwrap();
    assert_eq!(*lengths.lock().unwrap(), 8);
    assert_eq!(people.len(), 2);
}

/// Executor threads with this stack size cannot be created.
const UNSPAWNABLE_STACK: usize = 1 << 46;

#[test]
fn test_fan_out_spawn_failure_is_incomplete_run() {
    let ran = AtomicUsize::new(0);
    let tasks = TaskSet::from_payloads(0..3, |_| {
        ran.fetch_add(1, Ordering::SeqCst);
    });
    let runner = Runner::new(RunOptions::default().with_stack_size(UNSPAWNABLE_STACK)).unwrap();
    let err = runner.run(tasks).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::IncompleteRun {
            expected: 3,
            completed: 0
        }
    ));
    assert_eq!(err.to_string(), "incomplete run: 0 of 3 tasks completed");
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_pool_spawn_failure_is_incomplete_run() {
    let ran = AtomicUsize::new(0);
    let tasks = TaskSet::from_payloads(0..5, |_| {
        ran.fetch_add(1, Ordering::SeqCst);
    });
    let runner = Runner::new(
        RunOptions::default()
            .with_max_workers(2)
            .with_stack_size(UNSPAWNABLE_STACK),
    )
    .unwrap();
    let err = runner.run(tasks).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::IncompleteRun {
            expected: 5,
            completed: 0
        }
    ));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}
