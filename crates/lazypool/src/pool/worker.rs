use super::CancelPolicy;
use crate::{Error, Outcome, OutcomeSender, Processor, WorkItem};
use core::{any::Any, panic::AssertUnwindSafe};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// An idle worker waiting for its next item.
///
/// The dispatcher fills `slot` with exactly one item. If the worker has gone
/// away in the meantime, the send hands the item back to the dispatcher.
pub(crate) struct ReadyWorker<T> {
    pub worker_id: usize,
    pub slot: oneshot::Sender<WorkItem<T>>,
}

/// Everything a worker needs besides its id. Shared by the provisioner, which
/// clones one per spawned worker.
pub(crate) struct WorkerContext<T, P: Processor<T>> {
    pub ready_tx: mpsc::Sender<ReadyWorker<T>>,
    pub processor: Arc<P>,
    pub outcomes: OutcomeSender<P::Output>,
    pub cancel: CancellationToken,
    pub policy: CancelPolicy,
}

impl<T, P: Processor<T>> Clone for WorkerContext<T, P> {
    fn clone(&self) -> Self {
        Self {
            ready_tx: self.ready_tx.clone(),
            processor: Arc::clone(&self.processor),
            outcomes: self.outcomes.clone(),
            cancel: self.cancel.clone(),
            policy: self.policy,
        }
    }
}

/// Worker task: announce readiness, take one item, process it, repeat.
///
/// The loop ends when the hand-off is closed (the dispatcher dropped the ready
/// queue, so either the announcement fails or the pending slot is dropped) or
/// when cancellation fires while the worker is idle. What happens to an item
/// that is already running when cancellation fires depends on the
/// [`CancelPolicy`].
pub(crate) async fn worker_loop<T, P>(worker_id: usize, ctx: WorkerContext<T, P>)
where
    T: Send + 'static,
    P: Processor<T>,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    loop {
        let (slot, mut item_rx) = oneshot::channel();

        let announced = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => false,
            res = ctx.ready_tx.send(ReadyWorker { worker_id, slot }) => res.is_ok(),
        };
        if !announced {
            break;
        }

        // Under `FinishInFlight` an item that already reached the slot wins
        // over cancellation, including one sent while cancellation was being
        // observed.
        let item = match ctx.policy {
            CancelPolicy::FinishInFlight => tokio::select! {
                biased;
                item = &mut item_rx => item.ok(),
                () = ctx.cancel.cancelled() => take_raced_item(&mut item_rx),
            },
            CancelPolicy::Abandon => tokio::select! {
                biased;
                () = ctx.cancel.cancelled() => None,
                item = &mut item_rx => item.ok(),
            },
        };

        let Some(item) = item else {
            break;
        };

        run_item(worker_id, item, &ctx).await;
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}

/// Closes the slot and returns an item the dispatcher managed to send before
/// the close. After this the dispatcher's send fails and the item stays with
/// the dispatcher.
fn take_raced_item<T>(item_rx: &mut oneshot::Receiver<WorkItem<T>>) -> Option<WorkItem<T>> {
    item_rx.close();
    item_rx.try_recv().ok()
}

async fn run_item<T, P>(worker_id: usize, item: WorkItem<T>, ctx: &WorkerContext<T, P>)
where
    T: Send + 'static,
    P: Processor<T>,
{
    let (payload, completion) = item.into_parts();
    let work = AssertUnwindSafe(ctx.processor.process(payload)).catch_unwind();

    let result = match ctx.policy {
        CancelPolicy::FinishInFlight => work.await,
        CancelPolicy::Abandon => tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} abandoned in-flight item");
                // Dropping the completion records the item as abandoned.
                drop(completion);
                return;
            }
            res = work => res,
        },
    };

    let outcome = match result {
        Ok(Ok(output)) => Outcome::Completed { worker_id, output },
        Ok(Err(e)) => Outcome::Failed {
            worker_id,
            error: Error::Processing {
                reason: e.to_string(),
            },
        },
        Err(panic) => Outcome::Failed {
            worker_id,
            error: Error::Panicked {
                reason: panic_message(&*panic),
            },
        },
    };

    let completed = outcome.is_completed();
    #[cfg(feature = "tracing")]
    if let Outcome::Failed { error, .. } = &outcome {
        tracing::debug!("Worker {worker_id} item failed: {error}");
    }

    // Report before settling so the outcome is observable by the time the
    // tracker drains.
    if let Err(_e) = ctx.outcomes.send(outcome) {
        #[cfg(feature = "tracing")]
        tracing::debug!("Worker {worker_id} has no outcome receiver");
    }

    if completed {
        completion.succeed();
    } else {
        completion.fail();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompletionTracker, outcome_channel};

    struct Echo;

    impl Processor<u32> for Echo {
        type Output = u32;
        type Error = String;

        async fn process(&self, payload: u32) -> core::result::Result<u32, String> {
            Ok(payload)
        }
    }

    fn context(
        cancel: &CancellationToken,
    ) -> (
        WorkerContext<u32, Echo>,
        mpsc::Receiver<ReadyWorker<u32>>,
        crate::OutcomeReceiver<u32>,
    ) {
        let (ready_tx, ready_rx) = mpsc::channel(1);
        let (outcomes, reports) = outcome_channel();
        let ctx = WorkerContext {
            ready_tx,
            processor: Arc::new(Echo),
            outcomes,
            cancel: cancel.clone(),
            policy: CancelPolicy::FinishInFlight,
        };
        (ctx, ready_rx, reports)
    }

    #[test]
    fn raced_item_is_taken_after_close() {
        let tracker = CompletionTracker::new();
        let (slot, mut item_rx) = oneshot::channel();
        assert!(slot.send(WorkItem::new(7, tracker.track())).is_ok());

        let item = take_raced_item(&mut item_rx).unwrap();
        assert_eq!(*item.payload(), 7);
    }

    #[test]
    fn closed_slot_hands_the_item_back() {
        let tracker = CompletionTracker::new();
        let (slot, mut item_rx) = oneshot::channel::<WorkItem<u32>>();

        assert!(take_raced_item(&mut item_rx).is_none());
        let returned = slot.send(WorkItem::new(7, tracker.track())).unwrap_err();
        assert_eq!(*returned.payload(), 7);
    }

    #[tokio::test]
    async fn finish_in_flight_runs_an_item_sent_as_cancellation_fires() {
        let cancel = CancellationToken::new();
        let (ctx, mut ready_rx, mut reports) = context(&cancel);
        let tracker = CompletionTracker::new();

        let worker = tokio::spawn(worker_loop(0, ctx));
        let ready = ready_rx.recv().await.unwrap();

        cancel.cancel();
        assert!(ready.slot.send(WorkItem::new(3, tracker.track())).is_ok());
        worker.await.unwrap();

        let outcome = reports.recv().await.unwrap();
        assert!(matches!(outcome, Outcome::Completed { output: 3, .. }));
        tracker.close();
        let tally = tracker.tally();
        assert_eq!((tally.succeeded, tally.abandoned), (1, 0));
    }

    #[tokio::test]
    async fn cancelled_idle_worker_refuses_later_items() {
        let cancel = CancellationToken::new();
        let (ctx, mut ready_rx, _reports) = context(&cancel);
        let tracker = CompletionTracker::new();

        let worker = tokio::spawn(worker_loop(0, ctx));
        let ready = ready_rx.recv().await.unwrap();

        cancel.cancel();
        worker.await.unwrap();

        let returned = ready
            .slot
            .send(WorkItem::new(3, tracker.track()))
            .unwrap_err();
        assert_eq!(*returned.payload(), 3);
    }
}
