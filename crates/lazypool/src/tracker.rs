//! Outstanding-item accounting for a single run.
//!
//! The [`CompletionTracker`] counts items that were handed to the pool but have
//! not finished yet. Every tracked item owns a [`Completion`] guard; settling
//! (or dropping) the guard decrements the count exactly once. The top-level
//! caller closes the tracker once no further items will be dispatched and then
//! awaits [`CompletionTracker::wait`], which resolves only when the tracker is
//! both closed and drained.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Shared {
    outstanding: AtomicUsize,
    closed: AtomicBool,
    dispatched: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    abandoned: AtomicUsize,
    drained: Notify,
}

/// How a tracked item finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settled {
    Succeeded,
    Failed,
    /// Dropped before (or while) being processed.
    Abandoned,
}

/// Final per-run counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub abandoned: usize,
}

impl Tally {
    /// Number of items whose completion has been signaled.
    pub const fn settled(&self) -> usize {
        self.succeeded + self.failed + self.abandoned
    }
}

/// Shared counter of dispatched-but-unfinished items.
///
/// Cloning is cheap; all clones observe the same counters.
#[derive(Clone, Debug, Default)]
pub struct CompletionTracker {
    shared: Arc<Shared>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more outstanding item and returns its completion guard.
    ///
    /// The increment is visible before this call returns, so it
    /// happens-before any hand-off of the returned guard to another task.
    pub fn track(&self) -> Completion {
        debug_assert!(
            !self.is_closed(),
            "item tracked after the tracker was closed"
        );
        self.shared.dispatched.fetch_add(1, Ordering::Relaxed);
        self.shared.outstanding.fetch_add(1, Ordering::AcqRel);
        Completion {
            shared: Arc::clone(&self.shared),
            settled: Settled::Abandoned,
        }
    }

    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.load(Ordering::Acquire)
    }

    /// Marks the end of dispatch. No item may be tracked afterwards.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.drained.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Returns `true` once the tracker is closed and nothing is outstanding.
    pub fn is_drained(&self) -> bool {
        self.is_closed() && self.outstanding() == 0
    }

    /// Waits until the tracker is closed and every tracked item has settled.
    pub async fn wait(&self) {
        loop {
            let notified = self.shared.drained.notified();
            let mut notified = core::pin::pin!(notified);
            // Register before checking so a concurrent settle cannot slip
            // between the check and the await.
            notified.as_mut().enable();

            if self.is_drained() {
                return;
            }
            notified.await;
        }
    }

    pub fn tally(&self) -> Tally {
        Tally {
            dispatched: self.shared.dispatched.load(Ordering::Acquire),
            succeeded: self.shared.succeeded.load(Ordering::Acquire),
            failed: self.shared.failed.load(Ordering::Acquire),
            abandoned: self.shared.abandoned.load(Ordering::Acquire),
        }
    }
}

/// Completion handle for one tracked item.
///
/// Consumed by [`Completion::succeed`] or [`Completion::fail`]. A guard that is
/// dropped without being settled counts as [`Settled::Abandoned`], so every
/// tracked item signals exactly once no matter which path drops it.
#[must_use = "dropping a completion marks the item as abandoned"]
#[derive(Debug)]
pub struct Completion {
    shared: Arc<Shared>,
    settled: Settled,
}

impl Completion {
    pub fn succeed(self) {
        self.settle(Settled::Succeeded);
    }

    pub fn fail(self) {
        self.settle(Settled::Failed);
    }

    fn settle(mut self, settled: Settled) {
        self.settled = settled;
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        let counter = match self.settled {
            Settled::Succeeded => &self.shared.succeeded,
            Settled::Failed => &self.shared.failed,
            Settled::Abandoned => &self.shared.abandoned,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if self.shared.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.drained.notify_waiters();
        }
    }
}
