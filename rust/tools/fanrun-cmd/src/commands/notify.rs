//! Notify command implementation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    io::{self, Write},
    sync::Mutex,
    thread,
    time::Duration,
};

use fanrun::{RunOptions, RunResult, Runner, Task, TaskSet};

use crate::utils::{format_elapsed, load_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    /// Only logged; entries without an age are accepted.
    #[serde(default)]
    pub age: u32,
}

impl Person {
    fn new(name: &str, age: u32) -> Person {
        Person {
            name: name.to_string(),
            age,
        }
    }
}

pub fn default_people() -> Vec<Person> {
    vec![
        Person::new("Alice", 25),
        Person::new("Bob", 62),
        Person::new("Charlie", 22),
        Person::new("Diana", 45),
    ]
}

pub fn run(
    people: Option<String>,
    options: Option<String>,
    delay_ms: u64,
    max_workers: Option<usize>,
) -> Result<()> {
    let people = match people {
        Some(path) => load_json::<Vec<Person>>(&path)?,
        None => default_people(),
    };
    let options = load_options(options.as_deref(), max_workers)?;
    let runner = Runner::new(options)?;

    let out = Mutex::new(io::stdout());
    let result = notify_all(&people, &runner, Duration::from_millis(delay_ms), &out)?;

    println!(
        "completed {}/{} in {}",
        result.completed(),
        result.len(),
        format_elapsed(result.elapsed())
    );
    result.into_result()?;
    Ok(())
}

/// Loads runner options from an optional JSON file, then applies the
/// `--max-workers` override.
pub fn load_options(path: Option<&str>, max_workers: Option<usize>) -> Result<RunOptions> {
    let mut options = match path {
        Some(path) => load_json::<RunOptions>(path)?,
        None => RunOptions::default(),
    };
    if let Some(max_workers) = max_workers {
        options = options.with_max_workers(max_workers);
    }
    options.validate()?;
    Ok(options)
}

/// Sends one simulated notification per person and waits until all are done.
pub fn notify_all<W: Write + Send>(
    people: &[Person],
    runner: &Runner,
    delay: Duration,
    out: &Mutex<W>,
) -> Result<RunResult> {
    let tasks = people
        .iter()
        .map(|person| {
            Task::fallible(person.name.clone(), move || -> io::Result<()> {
                log::trace!("notifying {} (age {})", person.name, person.age);
                thread::sleep(delay);
                let mut out = out.lock().unwrap_or_else(|e| e.into_inner());
                writeln!(out, "- notified {}", person.name)
            })
        })
        .collect::<TaskSet>();

    log::debug!("dispatching {} notifications", tasks.len());
    Ok(runner.run(tasks)?)
}
