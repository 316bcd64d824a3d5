use super::batch::run_batch;
use lazypool::{CancellationToken, PoolConfig, Summary, source};
use std::collections::HashSet;

struct Batch {
    result: anyhow::Result<Summary>,
    out: String,
    err: String,
}

async fn run_lines(
    input: impl Into<Vec<u8>>,
    max_workers: usize,
    cancel: CancellationToken,
) -> Batch {
    let input = std::io::Cursor::new(input.into());
    let mut out = Vec::new();
    let mut err = Vec::new();

    let result = run_batch(
        PoolConfig::new(max_workers).unwrap(),
        source::lines(input),
        cancel,
        &mut out,
        &mut err,
    )
    .await;

    Batch {
        result,
        out: String::from_utf8(out).unwrap(),
        err: String::from_utf8(err).unwrap(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_file_prints_good_lines_and_reports_the_bad_one() {
    let batch = run_lines("10\n20\nnotanumber\n5\n15\n", 2, CancellationToken::new()).await;

    // Per-item failures still exit successfully.
    let summary = batch.result.unwrap();
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);

    let printed: HashSet<&str> = batch.out.lines().collect();
    assert_eq!(printed, HashSet::from(["10", "20", "5", "15"]));
    assert_eq!(batch.err.lines().count(), 1);
    assert!(
        batch.err.contains("\"notanumber\" is not a number"),
        "{}",
        batch.err
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn empty_file_prints_nothing() {
    let batch = run_lines("", 3, CancellationToken::new()).await;

    let summary = batch.result.unwrap();
    assert_eq!(summary.workers_started, 0);
    assert!(batch.out.is_empty() && batch.err.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hundred_zero_delays_on_one_worker() {
    let batch = run_lines("0\n".repeat(100), 1, CancellationToken::new()).await;

    let summary = batch.result.unwrap();
    assert_eq!(summary.workers_started, 1);
    assert_eq!(summary.succeeded, 100);
    assert_eq!(batch.out.lines().filter(|l| *l == "0").count(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interrupted_run_is_an_error() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let batch = run_lines("10\n20\n", 2, cancel).await;

    let err = batch.result.unwrap_err();
    assert!(err.to_string().starts_with("Interrupted"), "{err}");
    assert!(batch.out.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unreadable_input_is_an_error_after_draining() {
    // The second line is not valid UTF-8, so reading it fails.
    let batch = run_lines(b"1\n\xff\xfe\n3\n".to_vec(), 2, CancellationToken::new()).await;

    let err = batch.result.unwrap_err();
    assert!(
        matches!(
            err.downcast_ref::<lazypool::Error>(),
            Some(lazypool::Error::Source { .. })
        ),
        "{err:?}"
    );
    assert_eq!(batch.out, "1\n");
}
