use super::{provisioner::WorkerSlot, worker::ReadyWorker};
use crate::{CompletionTracker, Error, Result, WorkItem};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why dispatch stopped.
#[derive(Debug)]
pub(crate) enum Halt {
    /// The source ran out of items.
    Exhausted,
    Cancelled,
    /// The source failed; no further items were read.
    SourceFailed(Error),
}

/// Routes source items to workers, growing the pool on demand.
///
/// For each item the dispatcher races a direct hand-off to an idle worker
/// against claiming a provisioning slot. Once the provisioning channel closes
/// only the direct hand-off remains and the dispatcher waits for a worker to
/// free up. Dropping the dispatcher closes the hand-off: idle workers see their
/// slot vanish and exit.
pub(crate) struct Dispatcher<T> {
    items: mpsc::Receiver<Result<T>>,
    ready_rx: mpsc::Receiver<ReadyWorker<T>>,
    /// `None` once every slot has been issued.
    slots: Option<mpsc::Receiver<WorkerSlot>>,
    tracker: CompletionTracker,
    cancel: CancellationToken,
}

impl<T: Send + 'static> Dispatcher<T> {
    pub const fn new(
        items: mpsc::Receiver<Result<T>>,
        ready_rx: mpsc::Receiver<ReadyWorker<T>>,
        slots: mpsc::Receiver<WorkerSlot>,
        tracker: CompletionTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            items,
            ready_rx,
            slots: Some(slots),
            tracker,
            cancel,
        }
    }

    /// Dispatches until the source ends, fails, or cancellation fires.
    ///
    /// Consumes the dispatcher so the hand-off is closed on return.
    pub async fn run(mut self) -> Halt {
        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Halt::Cancelled,
                next = self.items.recv() => next,
            };

            let payload = match next {
                Some(Ok(payload)) => payload,
                Some(Err(e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Source failed, halting dispatch: {e}");
                    return Halt::SourceFailed(e);
                }
                None => return Halt::Exhausted,
            };

            // Track before hand-off: no worker can see the item before the
            // outstanding count includes it.
            let item = WorkItem::new(payload, self.tracker.track());

            if let Err(_item) = self.dispatch(item).await {
                #[cfg(feature = "tracing")]
                tracing::debug!("Dispatch aborted, item abandoned");
                return Halt::Cancelled;
            }
        }
    }

    /// Hands `item` to a worker. Gives the item back if dispatch was aborted
    /// by cancellation or because no worker is left to take it.
    async fn dispatch(&mut self, mut item: WorkItem<T>) -> core::result::Result<(), WorkItem<T>> {
        loop {
            let ready = tokio::select! {
                () = self.cancel.cancelled() => return Err(item),
                ready = self.ready_rx.recv() => ready,
                slot = next_slot(&mut self.slots), if self.slots.is_some() => match slot {
                    Some(slot) => {
                        self.spin_up(slot);
                        self.next_ready().await
                    }
                    None => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!("Provisioning channel closed");
                        self.slots = None;
                        continue;
                    }
                },
            };

            let Some(ReadyWorker {
                worker_id: _worker_id,
                slot,
            }) = ready
            else {
                return Err(item);
            };

            match slot.send(item) {
                Ok(()) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Handed item to worker {_worker_id}");
                    return Ok(());
                }
                // The worker left between announcing itself and now.
                Err(returned) => item = returned,
            }
        }
    }

    fn spin_up(&mut self, slot: WorkerSlot) {
        let _worker_id = slot.worker_id();
        if slot.claim() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Spinning up worker {_worker_id}");
        } else {
            self.slots = None;
        }
    }

    /// Blocking hand-off: waits for whichever worker frees up first.
    async fn next_ready(&mut self) -> Option<ReadyWorker<T>> {
        tokio::select! {
            () = self.cancel.cancelled() => None,
            ready = self.ready_rx.recv() => ready,
        }
    }
}

async fn next_slot(slots: &mut Option<mpsc::Receiver<WorkerSlot>>) -> Option<WorkerSlot> {
    match slots {
        Some(rx) => rx.recv().await,
        None => core::future::pending().await,
    }
}
