//! Completion latch: a join barrier over a fixed number of completion tokens.
//!
//! A [`CompletionLatch`] is created together with exactly `count` tokens. Each
//! [`CompletionToken`] signals the latch exactly once, either explicitly via
//! [`CompletionToken::complete`] or implicitly when it is dropped unused (a
//! *release*). The coordinator calls [`CompletionLatch::wait`], which blocks until
//! all tokens have signalled and reports how many completed versus released.
//!
//! ## Counting Guarantees
//!
//! - Tokens are not `Clone` and [`complete`](CompletionToken::complete) consumes
//!   the token, so one token can never be counted twice.
//! - A token that is dropped without completing (e.g. the closure owning it was
//!   never started) still signals, so the latch can never wait for a lost token.
//! - A latch created with zero tokens is immediately done.
//!
//! The latch state is tracked with atomics; the waiting side parks on a
//! [`OnceLock`] that is set by whichever token signals last.

use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicUsize, Ordering},
};

/// The coordinator side of a completion barrier.
///
/// Created by [`CompletionLatch::new`] along with its tokens. The latch is owned by
/// a single coordinator and is consumed by [`wait`](Self::wait), so its lifetime is
/// scoped to one barrier.
pub struct CompletionLatch {
    inner: Arc<LatchState>,
}

impl CompletionLatch {
    /// Creates a latch expecting `count` signals and returns it with the `count`
    /// tokens, indexed `0..count`.
    pub fn new(count: usize) -> (CompletionLatch, Vec<CompletionToken>) {
        let inner = Arc::new(LatchState {
            expected: count,
            remaining: AtomicUsize::new(count),
            completed: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            done: OnceLock::new(),
        });
        if count == 0 {
            let _ = inner.done.set(());
        }
        let tokens = (0..count)
            .map(|index| CompletionToken {
                latch: inner.clone(),
                index,
                signalled: false,
            })
            .collect();
        (CompletionLatch { inner }, tokens)
    }

    /// Number of tokens this latch was created with.
    pub fn expected(&self) -> usize {
        self.inner.expected
    }

    /// Number of tokens that have not signalled yet.
    ///
    /// The value may be stale by the time the caller acts on it.
    pub fn remaining(&self) -> usize {
        self.inner.remaining.load(Ordering::Acquire)
    }

    /// Returns `true` once every token has signalled.
    pub fn is_done(&self) -> bool {
        self.inner.done.get().is_some()
    }

    /// Blocks the calling thread until all tokens have signalled.
    ///
    /// Returns immediately when the latch was created with zero tokens or when
    /// every token has already signalled.
    pub fn wait(self) -> LatchReport {
        if self.inner.remaining.load(Ordering::Acquire) != 0 {
            self.inner.done.wait();
        }
        let report = LatchReport {
            expected: self.inner.expected,
            completed: self.inner.completed.load(Ordering::Acquire),
            released: self.inner.released.load(Ordering::Acquire),
        };
        debug_assert_eq!(report.completed + report.released, report.expected);
        report
    }
}

/// Counts observed by [`CompletionLatch::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchReport {
    /// Number of tokens issued.
    pub expected: usize,
    /// Tokens signalled through [`CompletionToken::complete`].
    pub completed: usize,
    /// Tokens dropped without completing.
    pub released: usize,
}

impl LatchReport {
    /// `true` when every issued token completed and none was released.
    pub fn is_complete(&self) -> bool {
        self.completed == self.expected
    }
}

/// A one-time completion signal for a single unit of work.
///
/// Moving the token into an executor ties the executor's completion to the latch.
pub struct CompletionToken {
    latch: Arc<LatchState>,
    index: usize,
    signalled: bool,
}

impl CompletionToken {
    /// Position of this token among the tokens issued by its latch.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Signals that the unit of work finished, whether it succeeded or failed.
    pub fn complete(mut self) {
        self.signalled = true;
        self.latch.signal(Signal::Completed);
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        if !self.signalled {
            self.signalled = true;
            log::trace!("completion token #{} released without completing", self.index);
            self.latch.signal(Signal::Released);
        }
    }
}

impl std::fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionToken")
            .field("index", &self.index)
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Signal {
    Completed,
    Released,
}

struct LatchState {
    expected: usize,
    /// Tokens that have not signalled yet.
    remaining: AtomicUsize,
    completed: AtomicUsize,
    released: AtomicUsize,
    /// Set by the last signalling token.
    done: OnceLock<()>,
}

impl LatchState {
    fn signal(&self, signal: Signal) {
        match signal {
            Signal::Completed => self.completed.fetch_add(1, Ordering::AcqRel),
            Signal::Released => self.released.fetch_add(1, Ordering::AcqRel),
        };
        let prev = self.remaining.fetch_sub(1, Ordering::AcqRel);
        assert_ne!(prev, 0, "completion latch signalled more times than issued");
        if prev == 1 {
            let _ = self.done.set(());
        }
    }
}
