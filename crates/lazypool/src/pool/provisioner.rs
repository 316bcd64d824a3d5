use super::worker::{WorkerContext, worker_loop};
use crate::Processor;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::task::TaskTracker;

/// Permission to start one more worker.
///
/// Claiming the slot is a rendezvous with the provisioner: the worker is only
/// spawned once the dispatcher calls [`WorkerSlot::claim`]. A slot dropped
/// unclaimed stops provisioning for good.
#[derive(Debug)]
pub(crate) struct WorkerSlot {
    worker_id: usize,
    claim: oneshot::Sender<()>,
}

impl WorkerSlot {
    pub const fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Consumes the slot. Returns `false` if the provisioner already stopped.
    pub fn claim(self) -> bool {
        self.claim.send(()).is_ok()
    }
}

/// Issues up to `max_workers` slots, one at a time, and spawns a worker on
/// `tasks` for each claimed slot.
///
/// Returning drops `slot_tx`, which closes the provisioning channel: after the
/// last slot, or as soon as the dispatcher stops listening or cancellation
/// fires.
pub(crate) async fn provision<T, P>(
    max_workers: usize,
    slot_tx: mpsc::Sender<WorkerSlot>,
    ctx: WorkerContext<T, P>,
    tasks: TaskTracker,
    started: Arc<AtomicUsize>,
) where
    T: Send + 'static,
    P: Processor<T>,
{
    for worker_id in 0..max_workers {
        let (claim, claimed) = oneshot::channel();

        let offered = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => false,
            res = slot_tx.send(WorkerSlot { worker_id, claim }) => res.is_ok(),
        };
        if !offered {
            return;
        }

        let claimed = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => false,
            res = claimed => res.is_ok(),
        };
        if !claimed {
            #[cfg(feature = "tracing")]
            tracing::trace!("Slot {worker_id} never claimed, provisioning stopped");
            return;
        }

        started.fetch_add(1, Ordering::AcqRel);

        let fut = worker_loop(worker_id, ctx.clone());
        #[cfg(feature = "tracing")]
        let fut = {
            use tracing::Instrument;
            let span = tracing::debug_span!("worker", worker_id);
            fut.instrument(span)
        };
        tasks.spawn(fut);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("All {max_workers} worker slots issued, provisioning closed");
}
