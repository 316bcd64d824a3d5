use core::{convert::Infallible, hint::black_box};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::stream;
use lazypool::{CancellationToken, PoolConfig, Processor, WorkerPool, outcome_channel};
use tokio::runtime::Builder;

struct Noop;

impl Processor<u64> for Noop {
    type Output = u64;
    type Error = Infallible;

    async fn process(&self, payload: u64) -> Result<u64, Infallible> {
        Ok(black_box(payload))
    }
}

struct Yielding;

impl Processor<u64> for Yielding {
    type Output = u64;
    type Error = Infallible;

    async fn process(&self, payload: u64) -> Result<u64, Infallible> {
        tokio::task::yield_now().await;
        Ok(black_box(payload))
    }
}

async fn run_batch<P>(processor: P, max_workers: usize, items: u64)
where
    P: Processor<u64, Output = u64>,
{
    let (tx, mut rx) = outcome_channel();
    let pool = WorkerPool::new(PoolConfig::new(max_workers).unwrap(), processor, tx);
    let source = stream::iter((0..items).map(Ok));

    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });
    let summary = pool.run(source, CancellationToken::new()).await.unwrap();
    drain.await.unwrap();
    assert_eq!(summary.succeeded as u64, items);
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = Builder::new_multi_thread().enable_all().build().unwrap();
    const ITEMS: u64 = 10_000;

    let mut group = c.benchmark_group("dispatch/noop");
    group.throughput(Throughput::Elements(ITEMS));
    for workers in [1, 4, 16, 64] {
        group.bench_function(format!("workers/{workers}"), |b| {
            b.to_async(&rt).iter(|| run_batch(Noop, workers, ITEMS));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("dispatch/yielding");
    group.throughput(Throughput::Elements(ITEMS));
    for workers in [1, 4, 16, 64] {
        group.bench_function(format!("workers/{workers}"), |b| {
            b.to_async(&rt).iter(|| run_batch(Yielding, workers, ITEMS));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
