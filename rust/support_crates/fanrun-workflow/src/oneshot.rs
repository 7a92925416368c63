//! A single-value slot shared by exactly one sender and one receiver.
//!
//! The sender is consumed by [`OneshotSender::send`], so at most one value is ever
//! delivered. Dropping the sender without sending closes the slot, and the receiver
//! observes `None` instead of blocking forever.
//!
//! ## Slot Lifecycle
//!
//! 1. Empty: waiting for the sender
//! 2. Filled: a value was sent and can be taken
//! 3. Closed: the value was taken, or the sender went away without sending

use std::{
    sync::{Arc, Condvar, Mutex},
    time::Duration,
};

/// Creates a connected sender/receiver pair.
pub fn channel<T>() -> (OneshotSender<T>, OneshotReceiver<T>) {
    let slot = Arc::new(Slot::new());
    (
        OneshotSender(Some(slot.clone())),
        OneshotReceiver(slot),
    )
}

/// The sending half. Not clonable.
pub struct OneshotSender<T>(Option<Arc<Slot<T>>>);

impl<T> OneshotSender<T> {
    /// Stores `value` in the slot and wakes the receiver.
    ///
    /// Returns `Err(value)` if the receiver has already been dropped.
    pub fn send(mut self, value: T) -> Result<(), T> {
        let slot = self.0.take().expect("sender used once");
        if Arc::strong_count(&slot) == 1 {
            return Err(value);
        }
        slot.fill(value);
        Ok(())
    }
}

impl<T> Drop for OneshotSender<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.0.take() {
            slot.close();
        }
    }
}

/// The receiving half. Not clonable.
pub struct OneshotReceiver<T>(Arc<Slot<T>>);

impl<T> OneshotReceiver<T> {
    /// Blocks until the slot is filled or closed.
    ///
    /// Returns `None` if the sender was dropped without sending or the value was
    /// already taken.
    pub fn recv(&self) -> Option<T> {
        self.0.wait(None).unwrap_or(None)
    }

    /// Like [`recv`](Self::recv), but gives up after `timeout`.
    ///
    /// Returns `Err(Pending)` if the slot is still empty when the timeout elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>, Pending> {
        self.0.wait(Some(timeout))
    }

    /// Takes the value without blocking.
    ///
    /// Returns `Err(Pending)` if the sender has neither sent nor been dropped yet.
    pub fn try_recv(&self) -> Result<Option<T>, Pending> {
        self.0.state.lock().unwrap().try_take()
    }

    /// Returns `true` while the sender is alive and has not sent.
    pub fn is_pending(&self) -> bool {
        matches!(*self.0.state.lock().unwrap(), State::Empty)
    }
}

/// The slot has not been filled or closed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending;

impl std::fmt::Display for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "oneshot value is not ready yet")
    }
}

impl std::error::Error for Pending {}

struct Slot<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> Slot<T> {
    fn new() -> Slot<T> {
        Slot {
            state: Mutex::new(State::Empty),
            ready: Condvar::new(),
        }
    }

    fn fill(&self, value: T) {
        let mut state = self.state.lock().unwrap();
        if let State::Empty = *state {
            *state = State::Filled(value);
        }
        drop(state);
        self.ready.notify_all();
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap();
        if let State::Empty = *state {
            *state = State::Closed;
        }
        drop(state);
        self.ready.notify_all();
    }

    fn wait(&self, timeout: Option<Duration>) -> Result<Option<T>, Pending> {
        let guard = self.state.lock().unwrap();
        let is_empty = |state: &mut State<T>| matches!(state, State::Empty);
        let mut guard = match timeout {
            None => self.ready.wait_while(guard, is_empty).unwrap(),
            Some(timeout) => {
                let (guard, res) = self
                    .ready
                    .wait_timeout_while(guard, timeout, is_empty)
                    .unwrap();
                if res.timed_out() {
                    return Err(Pending);
                }
                guard
            }
        };
        guard.try_take()
    }
}

enum State<T> {
    Empty,
    Filled(T),
    Closed,
}

impl<T> State<T> {
    fn try_take(&mut self) -> Result<Option<T>, Pending> {
        match std::mem::replace(self, State::Closed) {
            State::Empty => {
                *self = State::Empty;
                Err(Pending)
            }
            State::Filled(value) => Ok(Some(value)),
            State::Closed => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::{OneshotReceiver, OneshotSender, Pending, channel};

    #[test]
    fn test_oneshot_send_sync() {
        fn is_send_sync<T: Send + Sync>() {}
        is_send_sync::<OneshotSender<String>>();
        is_send_sync::<OneshotReceiver<String>>();
    }

    #[test]
    fn test_send_then_recv() {
        let (tx, rx) = channel::<usize>();
        assert!(rx.is_pending());
        assert_eq!(rx.try_recv(), Err(Pending));
        tx.send(7).unwrap();
        assert!(!rx.is_pending());
        assert_eq!(rx.recv(), Some(7));
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_recv_across_threads() {
        let (tx, rx) = channel::<&str>();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            tx.send("done").unwrap();
        });
        assert_eq!(rx.recv(), Some("done"));
    }

    #[test]
    fn test_timeout_then_value() {
        let (tx, rx) = channel::<u32>();
        let h = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            tx.send(1).unwrap();
        });
        assert_eq!(rx.recv_timeout(Duration::from_millis(10)), Err(Pending));
        assert!(rx.is_pending());
        assert_eq!(rx.recv(), Some(1));
        h.join().unwrap();
    }

    #[test]
    fn test_dropped_sender_closes() {
        let (tx, rx) = channel::<u32>();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            drop(tx);
        });
        assert_eq!(rx.recv(), None);
        assert_eq!(rx.try_recv(), Ok(None));
    }

    #[test]
    fn test_send_to_dropped_receiver() {
        let (tx, rx) = channel::<u32>();
        drop(rx);
        assert_eq!(tx.send(5), Err(5));
    }
}
