//! Run orchestration for the lazily provisioned worker pool.
//!
//! This module defines [`WorkerPool`], which owns a processor and a pool
//! configuration and drives one finite batch through them. A run wires
//! together the source pump, the provisioner, the dispatcher and the worker
//! tasks, then sequences shutdown so that [`WorkerPool::run`] only returns once
//! every dispatched item has settled and every worker has exited.
//!
//! Workers are never started up front. The first item (and every item that
//! arrives while all running workers are busy) may claim a provisioning slot,
//! until `max_workers` slots have been handed out.

use super::{
    PoolConfig, Summary,
    dispatcher::{Dispatcher, Halt},
    provisioner::provision,
    worker::WorkerContext,
};
use crate::{CompletionTracker, OutcomeSender, Processor, Result, source};
use core::{
    marker::PhantomData,
    sync::atomic::{AtomicUsize, Ordering},
};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Upper bound on the ready queue. Workers beyond it wait to announce
/// themselves, racing cancellation like any other announcement.
const READY_QUEUE_CAPACITY: usize = 1024;

/// A bounded pool of lazily started workers sharing one [`Processor`].
///
/// Outcomes of individual items are published on the [`OutcomeSender`] given
/// at construction; the channel closes once the run has finished and every
/// worker is gone.
pub struct WorkerPool<T, P: Processor<T>> {
    config: PoolConfig,
    processor: Arc<P>,
    outcomes: OutcomeSender<P::Output>,
    _payload: PhantomData<fn(T)>,
}

impl<T, P> WorkerPool<T, P>
where
    T: Send + 'static,
    P: Processor<T>,
{
    pub fn new(config: PoolConfig, processor: P, outcomes: OutcomeSender<P::Output>) -> Self {
        Self {
            config,
            processor: Arc::new(processor),
            outcomes,
            _payload: PhantomData,
        }
    }

    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Processes every item of `source`, then drains.
    ///
    /// - Dispatch stops when the source is exhausted, when it yields an error,
    ///   or when `cancel` fires.
    /// - The hand-off to workers is then closed; workers finish what they hold
    ///   (subject to the [`CancelPolicy`](super::CancelPolicy)) and exit.
    /// - Returns once the completion tracker has drained and all worker tasks
    ///   have ended.
    ///
    /// # Errors
    ///
    /// Returns the source's [`Error::Source`](crate::Error::Source) if reading
    /// input failed. Items dispatched before the failure are still drained
    /// before the error is returned. Per-item failures are not errors here;
    /// they are reported as outcomes and counted in the [`Summary`].
    pub async fn run<S>(self, source: S, cancel: CancellationToken) -> Result<Summary>
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        let max_workers = self.config.max_workers();
        let tracker = CompletionTracker::new();
        let tasks = TaskTracker::new();
        let started = Arc::new(AtomicUsize::new(0));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Starting run with up to {max_workers} workers ({:?})",
            self.config.cancel_policy()
        );

        // === Phase 0: Wire up channels and background tasks ===
        let (items, pump) = source::spawn_pump(source, cancel.clone());
        // Each worker has at most one pending announcement, so this only
        // fills up for pools larger than the cap.
        let (ready_tx, ready_rx) = mpsc::channel(max_workers.min(READY_QUEUE_CAPACITY));
        let (slot_tx, slot_rx) = mpsc::channel(1);

        let ctx = WorkerContext {
            ready_tx,
            processor: self.processor,
            outcomes: self.outcomes,
            cancel: cancel.clone(),
            policy: self.config.cancel_policy(),
        };
        tasks.spawn(provision(
            max_workers,
            slot_tx,
            ctx,
            tasks.clone(),
            Arc::clone(&started),
        ));

        // === Phase 1: Dispatch until the source ends or we are cancelled ===
        let halt = Dispatcher::new(items, ready_rx, slot_rx, tracker.clone(), cancel.clone())
            .run()
            .await;

        // === Phase 2: Wait for every dispatched item to settle ===
        tracker.close();
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Dispatch halted ({halt:?}), draining {} outstanding items",
            tracker.outstanding()
        );
        tracker.wait().await;

        // === Phase 3: Wait for workers to observe the closed hand-off ===
        tasks.close();
        tasks.wait().await;
        pump.abort();

        let summary = Summary::new(
            tracker.tally(),
            started.load(Ordering::Acquire),
            matches!(halt, Halt::Cancelled),
        );

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Run finished: {} dispatched, {} succeeded, {} failed, {} abandoned, {} workers",
            summary.dispatched,
            summary.succeeded,
            summary.failed,
            summary.abandoned,
            summary.workers_started
        );

        match halt {
            Halt::SourceFailed(e) => Err(e),
            Halt::Exhausted | Halt::Cancelled => Ok(summary),
        }
    }
}
