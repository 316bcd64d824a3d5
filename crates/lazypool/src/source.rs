//! Line-oriented input sources.
//!
//! A source is any [`Stream`] of `Result<T>`. The stream ends when the input is
//! exhausted; an `Err` item is fatal and is the last thing the pool reads from
//! it. This module provides the line reader used by the CLI and the pump task
//! that runs a source next to the dispatcher.

use crate::{Error, Result};
use futures::{Stream, StreamExt};
use std::path::Path;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_stream::wrappers::LinesStream;
use tokio_util::sync::CancellationToken;

/// Path that selects standard input instead of a file.
pub const STDIN_PATH: &str = "-";

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Splits `reader` into lines, one payload per line (without the line
/// terminator).
pub fn lines<R>(reader: R) -> impl Stream<Item = Result<String>> + Send + 'static
where
    R: AsyncRead + Send + Unpin + 'static,
{
    LinesStream::new(BufReader::new(reader).lines()).map(|line| line.map_err(Error::from))
}

/// Opens `path` (or stdin for [`STDIN_PATH`]) as a line source.
///
/// # Errors
///
/// Returns [`Error::Source`] if the file cannot be opened. Nothing has been
/// dispatched at that point, so callers treat this as fatal.
pub async fn open(path: &Path) -> Result<impl Stream<Item = Result<String>> + Send + 'static> {
    let reader: BoxedReader = if path.as_os_str() == STDIN_PATH {
        Box::new(tokio::io::stdin())
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::Source {
                context: format!("failed to open {}: {e}", path.display()),
            })?;
        Box::new(file)
    };

    Ok(lines(reader))
}

/// Runs `source` on its own task, forwarding items into a small bounded
/// channel until the source ends, fails, the receiver is dropped, or `cancel`
/// fires.
pub(crate) fn spawn_pump<S, T>(
    source: S,
    cancel: CancellationToken,
) -> (mpsc::Receiver<Result<T>>, JoinHandle<()>)
where
    S: Stream<Item = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        let mut source = core::pin::pin!(source);

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Source cancelled");
                    break;
                }
                next = source.next() => next,
            };

            let Some(next) = next else {
                #[cfg(feature = "tracing")]
                tracing::debug!("Source exhausted");
                break;
            };

            let fatal = next.is_err();
            if tx.send(next).await.is_err() {
                // Dispatcher is gone; nobody is left to consume.
                break;
            }
            if fatal {
                break;
            }
        }
    });

    (rx, handle)
}
