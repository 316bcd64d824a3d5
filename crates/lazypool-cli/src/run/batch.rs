use super::{delay::DelayProcessor, report::report};
use anyhow::bail;
use futures::Stream;
use lazypool::{CancellationToken, PoolConfig, Summary, WorkerPool, outcome_channel};
use tokio::io::AsyncWrite;

/// Runs one batch of delay lines from `input` and reports every item on `out`
/// and `err`.
///
/// Per-item failures are reported and do not fail the batch.
///
/// # Errors
///
/// - The input could not be read.
/// - Writing a report line failed.
/// - `cancel` fired before the input was exhausted. The error is returned only
///   after every dispatched item has settled.
pub async fn run_batch<S, W, E>(
    pool: PoolConfig,
    input: S,
    cancel: CancellationToken,
    out: W,
    err: E,
) -> anyhow::Result<Summary>
where
    S: Stream<Item = lazypool::Result<String>> + Send + 'static,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let (outcomes, reports) = outcome_channel();
    let pool = WorkerPool::new(pool, DelayProcessor, outcomes);

    // The outcome channel closes once every worker has exited, so reporting
    // ends right after the run.
    let (result, reported) = tokio::join!(pool.run(input, cancel), report(reports, out, err));

    let reported = reported?;
    tracing::debug!(
        "Reported {} completed and {} failed items",
        reported.completed,
        reported.failed
    );

    let summary = result?;
    if summary.cancelled {
        bail!(
            "Interrupted: {} of {} dispatched items finished, {} abandoned",
            summary.succeeded + summary.failed,
            summary.dispatched,
            summary.abandoned
        );
    }

    Ok(summary)
}
