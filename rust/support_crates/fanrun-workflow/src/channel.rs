//! A blocking multi-producer, multi-consumer FIFO channel.
//!
//! Messages are delivered in the order they were sent. The channel tracks how many
//! [`Sender`] and [`Receiver`] handles are alive:
//!
//! - When the last sender goes away (dropped or [`Sender::close`]d), the channel is
//!   *half-closed*: receivers drain what is buffered and then observe end-of-stream.
//! - When the last receiver goes away, the channel is *closed*: buffered messages are
//!   discarded and every send fails, handing the message back.
//!
//! Use [`unbounded`] for an infinite buffer, or [`bounded`] to make senders block
//! once `capacity` messages are buffered.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use fanrun_common::{Result, verify_arg};

/// Creates a channel with an unlimited buffer: [`Sender::send`] never blocks.
pub fn unbounded<T>() -> (Sender<T>, Receiver<T>) {
    let queue = Arc::new(Queue::new(None));
    (Sender(queue.clone()), Receiver(queue))
}

/// Creates a channel buffering at most `capacity` messages.
///
/// A zero capacity (rendezvous channel) is not supported.
pub fn bounded<T>(capacity: usize) -> Result<(Sender<T>, Receiver<T>)> {
    verify_arg!(capacity, capacity != 0);
    let queue = Arc::new(Queue::new(Some(capacity)));
    Ok((Sender(queue.clone()), Receiver(queue)))
}

/// The sending half of a channel. Clone it to add producers.
pub struct Sender<T>(Arc<Queue<T>>);

impl<T> Sender<T> {
    /// Sends a message, blocking while a bounded channel is full.
    ///
    /// Returns the message back if every receiver is gone. `Ok` does not mean the
    /// message will be received: the last receiver may hang up right after.
    pub fn send(&self, msg: T) -> std::result::Result<(), SendError<T>> {
        self.0.enqueue(msg).map_err(SendError)
    }

    /// Sends a message without blocking.
    pub fn try_send(&self, msg: T) -> std::result::Result<(), TrySendError<T>> {
        self.0.try_enqueue(msg)
    }

    /// Closes this producer's side of the channel.
    ///
    /// Once every sender is closed or dropped, receivers see end-of-stream after
    /// draining the buffered messages.
    pub fn close(self) {
        drop(self);
    }

    /// `true` if no receiver is alive any more.
    pub fn is_disconnected(&self) -> bool {
        self.0.state.lock().unwrap().receivers == 0
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.0.add_sender();
        Sender(self.0.clone())
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.0.drop_sender();
    }
}

/// The receiving half of a channel. Clone it to add consumers; each message is
/// delivered to exactly one of them.
pub struct Receiver<T>(Arc<Queue<T>>);

impl<T> Receiver<T> {
    /// Blocks until a message is available.
    ///
    /// Returns `None` once the channel is half-closed and fully drained.
    pub fn recv(&self) -> Option<T> {
        self.0.dequeue()
    }

    /// Receives a message without blocking.
    pub fn try_recv(&self) -> std::result::Result<T, TryRecvError> {
        self.0.try_dequeue()
    }

    /// Number of buffered messages. May be stale immediately.
    pub fn len(&self) -> usize {
        self.0.state.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A blocking iterator that ends at end-of-stream.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter(self)
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        self.0.add_receiver();
        Receiver(self.0.clone())
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.0.drop_receiver();
    }
}

impl<T> IntoIterator for Receiver<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter(self)
    }
}

impl<'a, T> IntoIterator for &'a Receiver<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Borrowing blocking iterator over a [`Receiver`].
pub struct Iter<'a, T>(&'a Receiver<T>);

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.recv()
    }
}

/// Owning blocking iterator over a [`Receiver`].
pub struct IntoIter<T>(Receiver<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.recv()
    }
}

/// Every receiver has been dropped; the message is returned.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SendError<T>(pub T);

impl<T> std::fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sending on a closed channel")
    }
}

impl<T: std::fmt::Debug> std::error::Error for SendError<T> {}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TrySendError<T> {
    /// A bounded channel is at capacity.
    Full(T),
    /// Every receiver has been dropped.
    Disconnected(T),
}

impl<T> std::fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrySendError::Full(_) => write!(f, "channel is full"),
            TrySendError::Disconnected(_) => write!(f, "channel is disconnected"),
        }
    }
}

impl<T: std::fmt::Debug> std::error::Error for TrySendError<T> {}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
    /// Nothing buffered, but senders are still alive.
    Empty,
    /// Nothing buffered and every sender is gone.
    Disconnected,
}

impl std::fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TryRecvError::Empty => write!(f, "channel is empty"),
            TryRecvError::Disconnected => write!(f, "channel is empty and disconnected"),
        }
    }
}

impl std::error::Error for TryRecvError {}

struct Queue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

struct QueueState<T> {
    queue: VecDeque<T>,
    capacity: Option<usize>,
    senders: usize,
    receivers: usize,
}

impl<T> QueueState<T> {
    fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.queue.len() >= cap)
    }
}

impl<T> Queue<T> {
    fn new(capacity: Option<usize>) -> Queue<T> {
        Queue {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                capacity,
                senders: 1,
                receivers: 1,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn add_sender(&self) {
        let mut state = self.state.lock().unwrap();
        assert_ne!(state.senders, 0, "adding a sender to a half-closed channel");
        state.senders += 1;
    }

    fn drop_sender(&self) {
        let mut state = self.state.lock().unwrap();
        assert_ne!(state.senders, 0, "sender count underflow");
        state.senders -= 1;
        if state.senders == 0 {
            log::trace!(
                "channel half-closed with {} buffered message(s)",
                state.queue.len()
            );
            drop(state);
            self.not_empty.notify_all();
        }
    }

    fn add_receiver(&self) {
        let mut state = self.state.lock().unwrap();
        assert_ne!(state.receivers, 0, "adding a receiver to a closed channel");
        state.receivers += 1;
    }

    fn drop_receiver(&self) {
        let mut state = self.state.lock().unwrap();
        assert_ne!(state.receivers, 0, "receiver count underflow");
        state.receivers -= 1;
        if state.receivers == 0 {
            let discarded = std::mem::take(&mut state.queue);
            drop(state);
            if !discarded.is_empty() {
                log::trace!("channel closed, discarding {} message(s)", discarded.len());
            }
            self.not_full.notify_all();
        }
    }

    fn enqueue(&self, item: T) -> std::result::Result<(), T> {
        let mut state = self
            .not_full
            .wait_while(self.state.lock().unwrap(), |s| s.receivers != 0 && s.is_full())
            .unwrap();
        if state.receivers == 0 {
            return Err(item);
        }
        state.queue.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    fn try_enqueue(&self, item: T) -> std::result::Result<(), TrySendError<T>> {
        let mut state = self.state.lock().unwrap();
        if state.receivers == 0 {
            return Err(TrySendError::Disconnected(item));
        }
        if state.is_full() {
            return Err(TrySendError::Full(item));
        }
        state.queue.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    fn dequeue(&self) -> Option<T> {
        let mut state = self
            .not_empty
            .wait_while(self.state.lock().unwrap(), |s| {
                s.queue.is_empty() && s.senders != 0
            })
            .unwrap();
        let item = state.queue.pop_front();
        drop(state);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    fn try_dequeue(&self) -> std::result::Result<T, TryRecvError> {
        let mut state = self.state.lock().unwrap();
        match state.queue.pop_front() {
            Some(item) => {
                drop(state);
                self.not_full.notify_one();
                Ok(item)
            }
            None if state.senders == 0 => Err(TryRecvError::Disconnected),
            None => Err(TryRecvError::Empty),
        }
    }
}
