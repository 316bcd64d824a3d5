use lazypool::{Outcome, OutcomeReceiver};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Line counts written by [`report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reported {
    pub completed: usize,
    pub failed: usize,
}

/// Writes each completed payload to `out` and each failure to `err`, one line
/// per item, until every worker has dropped its outcome sender.
///
/// Lines are flushed as they are written so progress is visible while the
/// batch is still running.
pub async fn report<W, E>(
    mut outcomes: OutcomeReceiver<String>,
    mut out: W,
    mut err: E,
) -> std::io::Result<Reported>
where
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut reported = Reported::default();

    while let Some(outcome) = outcomes.recv().await {
        match outcome {
            Outcome::Completed { output, .. } => {
                out.write_all(output.as_bytes()).await?;
                out.write_all(b"\n").await?;
                out.flush().await?;
                reported.completed += 1;
            }
            Outcome::Failed { worker_id, error } => {
                tracing::debug!("Worker {worker_id} reported failure: {error}");
                let line = format!("error: {error}\n");
                err.write_all(line.as_bytes()).await?;
                err.flush().await?;
                reported.failed += 1;
            }
        }
    }

    Ok(reported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazypool::{Error, outcome_channel};

    #[tokio::test]
    async fn splits_successes_and_failures() {
        let (tx, rx) = outcome_channel();
        tx.send(Outcome::Completed {
            worker_id: 0,
            output: "10".to_string(),
        })
        .unwrap();
        tx.send(Outcome::Failed {
            worker_id: 1,
            error: Error::Processing {
                reason: "line \"x\" is not a number".to_string(),
            },
        })
        .unwrap();
        tx.send(Outcome::Completed {
            worker_id: 1,
            output: "5".to_string(),
        })
        .unwrap();
        drop(tx);

        let mut out = Vec::new();
        let mut err = Vec::new();
        let reported = report(rx, &mut out, &mut err).await.unwrap();

        assert_eq!(
            reported,
            Reported {
                completed: 2,
                failed: 1
            }
        );
        assert_eq!(String::from_utf8(out).unwrap(), "10\n5\n");
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "error: Processing failed: line \"x\" is not a number\n"
        );
    }

    #[tokio::test]
    async fn no_outcomes_writes_nothing() {
        let (tx, rx) = outcome_channel::<String>();
        drop(tx);

        let mut out = Vec::new();
        let mut err = Vec::new();
        let reported = report(rx, &mut out, &mut err).await.unwrap();

        assert_eq!(reported, Reported::default());
        assert!(out.is_empty() && err.is_empty());
    }
}
