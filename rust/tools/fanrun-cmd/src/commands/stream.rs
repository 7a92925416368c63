//! Stream command implementation

use anyhow::Result;
use std::{
    io::{self, Write},
    thread,
    time::Duration,
};

use fanrun::stream;

pub fn run(count: usize, interval_ms: u64) -> Result<()> {
    let mut out = io::stdout().lock();
    consume(count, Duration::from_millis(interval_ms), &mut out)?;
    Ok(())
}

/// Starts a worker that reports `count` finished tasks, one per `interval`, and
/// prints each message until the worker closes the stream.
pub fn consume<W: Write>(count: usize, interval: Duration, out: &mut W) -> Result<usize> {
    writeln!(out, "waiting for worker...")?;
    let mut messages = stream::spawn("worker", move |tx| {
        for i in 1..=count {
            thread::sleep(interval);
            tx.send(format!("task {i} done"))?;
        }
        tx.close();
        Ok(())
    })?;

    for msg in messages.by_ref() {
        writeln!(out, "received: {msg}")?;
    }
    let received = messages.finish()?;
    log::debug!("worker closed the stream after {received} messages");
    writeln!(out, "all done")?;
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_prints_every_message() {
        let mut out = Vec::new();
        let received = consume(3, Duration::from_millis(20), &mut out).unwrap();
        assert_eq!(received, 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "waiting for worker...\n\
             received: task 1 done\n\
             received: task 2 done\n\
             received: task 3 done\n\
             all done\n"
        );
    }

    #[test]
    fn test_consume_empty_stream() {
        let mut out = Vec::new();
        assert_eq!(consume(0, Duration::from_secs(5), &mut out).unwrap(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "waiting for worker...\nall done\n"
        );
    }
}
