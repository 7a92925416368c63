//! Single-producer message streams.
//!
//! A producer emits an ordered sequence of messages and then closes the stream; the
//! consumer iterates over the [`Stream`] until it ends. The number of messages is
//! decided by the producer alone: the consumer simply observes end-of-stream.
//!
//! ```rust,no_run
//! let mut stream = fanrun::stream::spawn("worker", |tx| {
//!     for i in 1..=3 {
//!         tx.send(format!("task {i} done"))?;
//!     }
//!     tx.close();
//!     Ok(())
//! })
//! .unwrap();
//! for msg in stream.by_ref() {
//!     println!("received: {msg}");
//! }
//! stream.finish().unwrap();
//! ```

use std::thread::JoinHandle;

use fanrun_common::{Error, Result};
use fanrun_workflow::channel::{self as mpmc, Receiver, Sender};

use crate::task::panic_message;

/// Starts `producer` on a dedicated thread named `name` and returns the consumer end.
///
/// The stream buffers without limit, so the producer never waits for the consumer.
pub fn spawn<T, F>(name: impl Into<String>, producer: F) -> Result<Stream<T>>
where
    T: Send + 'static,
    F: FnOnce(StreamSender<T>) -> Result<()> + Send + 'static,
{
    let (tx, stream) = channel();
    stream.with_producer(name.into(), tx, producer)
}

/// Like [`spawn`], but the producer blocks once `capacity` messages are waiting.
pub fn spawn_bounded<T, F>(
    name: impl Into<String>,
    capacity: usize,
    producer: F,
) -> Result<Stream<T>>
where
    T: Send + 'static,
    F: FnOnce(StreamSender<T>) -> Result<()> + Send + 'static,
{
    let (tx, stream) = bounded(capacity)?;
    stream.with_producer(name.into(), tx, producer)
}

/// Creates an unbounded stream for callers that run the producer themselves.
pub fn channel<T>() -> (StreamSender<T>, Stream<T>) {
    let (tx, rx) = mpmc::unbounded();
    (StreamSender(tx), Stream::new(rx))
}

/// Creates a stream buffering at most `capacity` messages.
pub fn bounded<T>(capacity: usize) -> Result<(StreamSender<T>, Stream<T>)> {
    let (tx, rx) = mpmc::bounded(capacity)?;
    Ok((StreamSender(tx), Stream::new(rx)))
}

/// The producer end of a stream.
///
/// Dropping it ends the stream just like [`close`](Self::close), so a producer that
/// panics or returns early never leaves the consumer waiting.
pub struct StreamSender<T>(Sender<T>);

impl<T> StreamSender<T> {
    /// Appends a message to the stream.
    ///
    /// Fails with [`ErrorKind::Disconnected`] once the consumer has gone away.
    ///
    /// [`ErrorKind::Disconnected`]: fanrun_common::ErrorKind::Disconnected
    pub fn send(&self, msg: T) -> Result<()> {
        self.0
            .send(msg)
            .map_err(|_| Error::disconnected("stream consumer is gone"))
    }

    /// Signals end-of-stream.
    pub fn close(self) {
        self.0.close();
    }
}

/// The consumer end of a stream: a blocking iterator over the messages in the
/// order they were sent.
///
/// Dropping a stream that owns a producer thread hangs up on the producer and joins
/// it; an error or panic it reports is logged. Use [`finish`](Self::finish) to
/// observe the producer's result instead.
pub struct Stream<T> {
    rx: Option<Receiver<T>>,
    producer: Option<Producer>,
    received: usize,
}

struct Producer {
    name: String,
    handle: JoinHandle<Result<()>>,
}

impl Producer {
    fn join(self, received: usize) -> Result<usize> {
        let Producer { name, handle } = self;
        match handle.join() {
            Ok(res) => {
                log::debug!("stream producer '{name}' finished after {received} message(s)");
                res.map(|()| received)
            }
            Err(payload) => Err(Error::producer_panicked(
                name,
                panic_message(payload.as_ref()),
            )),
        }
    }
}

impl<T> Stream<T> {
    fn new(rx: Receiver<T>) -> Stream<T> {
        Stream {
            rx: Some(rx),
            producer: None,
            received: 0,
        }
    }

    fn with_producer<F>(mut self, name: String, tx: StreamSender<T>, producer: F) -> Result<Self>
    where
        T: Send + 'static,
        F: FnOnce(StreamSender<T>) -> Result<()> + Send + 'static,
    {
        if name.contains('\0') {
            return Err(Error::invalid_arg(
                "name",
                "stream producer name must not contain NUL bytes",
            ));
        }
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || producer(tx))
            .map_err(|e| Error::io(format!("spawn stream producer '{name}'"), e))?;
        log::debug!("stream producer '{name}' started");
        self.producer = Some(Producer { name, handle });
        Ok(self)
    }

    /// Number of messages taken from the stream so far.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Stops consuming and waits for the producer thread, if any.
    ///
    /// Messages still buffered are discarded and further sends by the producer fail.
    /// Returns the number of messages received, or the producer's error. A panicking
    /// producer is reported as [`ErrorKind::ProducerPanicked`].
    ///
    /// [`ErrorKind::ProducerPanicked`]: fanrun_common::ErrorKind::ProducerPanicked
    pub fn finish(mut self) -> Result<usize> {
        self.rx = None;
        match self.producer.take() {
            Some(producer) => producer.join(self.received),
            None => Ok(self.received),
        }
    }
}

impl<T> Iterator for Stream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let msg = self.rx.as_ref()?.recv()?;
        self.received += 1;
        Some(msg)
    }
}

impl<T> Drop for Stream<T> {
    fn drop(&mut self) {
        // Hang up first so a producer blocked on a full stream wakes up.
        self.rx = None;
        if let Some(producer) = self.producer.take() {
            let name = producer.name.clone();
            if let Err(e) = producer.join(self.received) {
                log::warn!("stream producer '{name}' dropped with an error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
        time::Duration,
    };

    use fanrun_common::ErrorKind;

    use super::*;

    #[test]
    fn test_receives_in_order_then_ends() {
        let mut stream = spawn("ordered", |tx| {
            for i in 1..=3 {
                thread::sleep(Duration::from_millis(10));
                tx.send(format!("task {i} done"))?;
            }
            tx.close();
            Ok(())
        })
        .unwrap();

        let messages = stream.by_ref().collect::<Vec<_>>();
        assert_eq!(messages, vec!["task 1 done", "task 2 done", "task 3 done"]);
        assert_eq!(stream.next(), None);
        assert_eq!(stream.finish().unwrap(), 3);
    }

    #[test]
    fn test_drop_without_close_ends_stream() {
        let stream = spawn("dropper", |tx| {
            tx.send(1u32)?;
            Ok(())
        })
        .unwrap();
        assert_eq!(stream.collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_producer_panic_is_reported() {
        let mut stream = spawn::<u32, _>("panicky", |tx| {
            tx.send(7)?;
            panic!("producer blew up");
        })
        .unwrap();
        assert_eq!(stream.next(), Some(7));
        assert_eq!(stream.next(), None);
        let err = stream.finish().unwrap_err();
        match err.kind() {
            ErrorKind::ProducerPanicked { name, message } => {
                assert_eq!(name, "panicky");
                assert_eq!(message, "producer blew up");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_finish_early_disconnects_producer() {
        let mut stream = spawn_bounded("endless", 1, |tx| {
            let mut i = 0u64;
            loop {
                tx.send(i)?;
                i += 1;
            }
        })
        .unwrap();
        assert_eq!(stream.next(), Some(0));
        let err = stream.finish().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Disconnected { .. }));
    }

    #[test]
    fn test_drop_joins_producer() {
        let exited = Arc::new(AtomicBool::new(false));
        let mut stream = spawn_bounded("dropped", 1, {
            let exited = exited.clone();
            move |tx| {
                let res = (0u64..).try_for_each(|i| tx.send(i));
                exited.store(true, Ordering::SeqCst);
                res
            }
        })
        .unwrap();
        assert_eq!(stream.next(), Some(0));
        drop(stream);
        assert!(exited.load(Ordering::SeqCst));
    }

    #[test]
    fn test_nul_in_name_is_invalid() {
        let err = spawn::<u8, _>("w\0", |_| Ok(())).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
        let err = spawn_bounded::<u8, _>("a\0b", 2, |_| Ok(())).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_manual_channel() {
        let (tx, stream) = channel();
        let h = thread::spawn(move || {
            tx.send("a").unwrap();
            tx.send("b").unwrap();
            tx.close();
        });
        assert_eq!(stream.collect::<Vec<_>>(), vec!["a", "b"]);
        h.join().unwrap();
    }

    #[test]
    fn test_zero_capacity_is_invalid() {
        assert!(bounded::<u8>(0).is_err());
        assert!(spawn_bounded::<u8, _>("none", 0, |_| Ok(())).is_err());
    }
}
