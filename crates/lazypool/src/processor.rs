//! The per-item processing contract and the outcomes workers report.

use crate::Error;
use core::{fmt, future::Future};
use tokio::sync::mpsc;

/// Processes one payload at a time on behalf of a worker.
///
/// A single processor instance is shared by every worker of a pool, so
/// implementations must be `Sync`. Returning `Err` marks the item as failed;
/// it is reported and never retried. A panic inside `process` is caught at the
/// worker boundary and treated the same way.
pub trait Processor<T>: Send + Sync + 'static {
    type Output: Send + 'static;
    type Error: fmt::Display + Send + 'static;

    fn process(
        &self,
        payload: T,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Result of processing one item, emitted by the worker that handled it.
#[derive(Debug)]
pub enum Outcome<O> {
    Completed { worker_id: usize, output: O },
    Failed { worker_id: usize, error: Error },
}

impl<O> Outcome<O> {
    pub const fn worker_id(&self) -> usize {
        match self {
            Self::Completed { worker_id, .. } | Self::Failed { worker_id, .. } => *worker_id,
        }
    }

    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Channel through which workers publish [`Outcome`]s.
///
/// Unbounded so that a slow consumer never stalls a worker between finishing
/// an item and settling its completion.
pub type OutcomeSender<O> = mpsc::UnboundedSender<Outcome<O>>;
pub type OutcomeReceiver<O> = mpsc::UnboundedReceiver<Outcome<O>>;

pub fn outcome_channel<O>() -> (OutcomeSender<O>, OutcomeReceiver<O>) {
    mpsc::unbounded_channel()
}
