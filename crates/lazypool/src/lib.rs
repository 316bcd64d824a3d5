#![doc = include_str!("../README.md")]

mod error;
mod item;
mod pool;
mod processor;
pub mod source;
mod tracker;

pub use error::{Error, Result};
pub use item::WorkItem;
pub use pool::{CancelPolicy, PoolConfig, Summary, WorkerPool};
pub use processor::{Outcome, OutcomeReceiver, OutcomeSender, Processor, outcome_channel};
pub use tracker::{Completion, CompletionTracker, Settled, Tally};

// Re-exported so callers do not need a direct `tokio-util` dependency to drive
// cancellation.
pub use tokio_util::sync::CancellationToken;
