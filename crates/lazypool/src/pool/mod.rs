//! Lazily provisioned worker pool.
//!
//! ## Structure
//!
//! - [`manager`] - [`WorkerPool`], which wires the pieces together for one run
//!   and sequences shutdown.
//! - `dispatcher` - routes each source item to an idle worker, or claims a
//!   provisioning slot to grow the pool first.
//! - `provisioner` - issues up to `max_workers` slots and starts one worker per
//!   claimed slot.
//! - `worker` - the per-worker receive/process/report loop.
//!
//! ```text
//!   source ──► dispatcher ──ready queue──◄── worker 0..k
//!                  │                            ▲
//!                  └── slot ◄── provisioner ────┘ (spawn on claim)
//! ```

mod dispatcher;
pub mod manager;
mod provisioner;
mod worker;


use crate::{Error, Result, Tally};

pub use manager::WorkerPool;

/// What workers do with in-flight items once cancellation fires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CancelPolicy {
    /// Items already handed to a worker run to completion. Only source items
    /// that were never dispatched are abandoned.
    #[default]
    FinishInFlight,
    /// In-flight processing is dropped as soon as cancellation is observed and
    /// the item counts as abandoned.
    Abandon,
}

/// Validated pool configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    max_workers: usize,
    cancel_policy: CancelPolicy,
}

impl PoolConfig {
    /// Creates a configuration allowing up to `max_workers` concurrent workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `max_workers` is zero.
    pub fn new(max_workers: usize) -> Result<Self> {
        if max_workers == 0 {
            return Err(Error::InvalidConfig {
                reason: "max_workers must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            max_workers,
            cancel_policy: CancelPolicy::default(),
        })
    }

    #[must_use]
    pub const fn with_cancel_policy(mut self, cancel_policy: CancelPolicy) -> Self {
        self.cancel_policy = cancel_policy;
        self
    }

    pub const fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub const fn cancel_policy(&self) -> CancelPolicy {
        self.cancel_policy
    }
}

/// What happened during one [`WorkerPool::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub workers_started: usize,
    /// Whether dispatch stopped because the cancellation token fired.
    pub cancelled: bool,
}

impl Summary {
    pub(crate) const fn new(tally: Tally, workers_started: usize, cancelled: bool) -> Self {
        Self {
            dispatched: tally.dispatched,
            succeeded: tally.succeeded,
            failed: tally.failed,
            abandoned: tally.abandoned,
            workers_started,
            cancelled,
        }
    }
}
