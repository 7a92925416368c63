//! Synchronization building blocks for the fanrun task runner.
//!
//! # Key Components
//!
//! - [`latch`] - A completion latch counting exactly one signal per issued
//!   [`latch::CompletionToken`]; the join barrier of a run
//! - [`oneshot`] - A single-value slot used to hand a task outcome from an
//!   executor back to the coordinator
//! - [`channel`] - Multi-producer, multi-consumer FIFO channel with bounded and
//!   unbounded variants; feeds worker pools and producer/consumer streams
//!
//! All primitives are blocking and thread-based. None of them keep global state:
//! each instance lives exactly as long as the handles referring to it.

pub mod channel;
pub mod latch;
pub mod oneshot;
