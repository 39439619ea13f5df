//! Dispatch pipeline benchmarks
//!
//! - Reducer chain fold in isolation (no Store overhead)
//! - Store throughput: dispatch until the projection sees the last state
//! - Middleware overhead
//! - Async producer forwarding
//!
//! Run with: `cargo bench`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup
#![allow(dead_code)] // Benchmark data structures may have unused fields

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use futures::StreamExt;
use unistore_core::composition::combine_reducers;
use unistore_core::{
    middleware_fn, reducer_fn, Action, BoxMiddleware, BoxReducer, Dispatch, Reducer,
};
use unistore_runtime::Store;

const BATCH: u64 = 1_000;

#[derive(Clone, Debug, Default)]
struct BenchState {
    counter: u64,
    data: Vec<u8>, // For testing state size impact
}

#[derive(Clone, Debug)]
enum BenchAction {
    Increment,
    Reset,
}

fn counter_reducer() -> BoxReducer<BenchState, BenchAction> {
    Box::new(reducer_fn(|state: Option<&BenchState>, action: &BenchAction| {
        let mut next = state.cloned().unwrap_or_else(|| BenchState {
            counter: 0,
            data: vec![0; 1024], // 1KB of data
        });
        match action {
            BenchAction::Increment => next.counter += 1,
            BenchAction::Reset => next.counter = 0,
        }
        next
    }))
}

fn noop_middleware() -> BoxMiddleware<BenchState, BenchAction> {
    Box::new(middleware_fn(
        |state: Option<&BenchState>, action: &BenchAction, _: &dyn Dispatch<BenchAction>| {
            black_box((state.map(|s| s.counter), action));
        },
    ))
}

/// Benchmark the reducer fold without a store
fn benchmark_reducer_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("reducer_chain");
    group.throughput(Throughput::Elements(1));

    let single = counter_reducer();
    let chain = combine_reducers(vec![counter_reducer(), counter_reducer(), counter_reducer()]);

    group.bench_function("single", |b| {
        let state = BenchState::default();
        b.iter(|| single.reduce(Some(&state), black_box(&BenchAction::Increment)));
    });

    group.bench_function("three_combined", |b| {
        let state = BenchState::default();
        b.iter(|| chain.reduce(Some(&state), black_box(&BenchAction::Increment)));
    });

    group.finish();
}

/// Dispatch a batch and wait until the projection observes the last state
async fn dispatch_batch(store: &Store<BenchState, BenchAction>) {
    let mut counters = store.observe(|state: &BenchState| state.counter);
    let start = store.state(|state| state.map_or(0, |s| s.counter));

    for _ in 0..BATCH {
        store
            .dispatch(BenchAction::Increment)
            .expect("Pipeline stopped");
    }

    while let Some(counter) = counters.next().await {
        if counter >= start + BATCH {
            break;
        }
    }
}

/// Benchmark Store throughput (actions/sec)
fn benchmark_store_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_throughput");
    group.throughput(Throughput::Elements(BATCH));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build runtime");
    let _guard = runtime.enter();

    group.bench_function("reducers_only", |b| {
        let store = Store::new(vec![counter_reducer()], None);
        b.to_async(&runtime).iter(|| dispatch_batch(&store));
    });

    group.bench_function("with_middlewares", |b| {
        let store = Store::new(
            vec![counter_reducer()],
            Some(vec![noop_middleware(), noop_middleware()]),
        );
        b.to_async(&runtime).iter(|| dispatch_batch(&store));
    });

    group.bench_function("reset_then_batch", |b| {
        let store = Store::new(vec![counter_reducer()], None);
        b.to_async(&runtime).iter_batched(
            || {
                store.dispatch(BenchAction::Reset).expect("Pipeline stopped");
            },
            |()| dispatch_batch(&store),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark async producer forwarding
fn benchmark_async_producer(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_producer");
    group.throughput(Throughput::Elements(BATCH));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build runtime");
    let _guard = runtime.enter();

    group.bench_function("stream_of_increments", |b| {
        let store = Store::new(vec![counter_reducer()], None);

        b.to_async(&runtime).iter(|| async {
            let mut counters = store.observe(|state: &BenchState| state.counter);
            let start = store.state(|state| state.map_or(0, |s| s.counter));

            let increments = futures::stream::iter((0..BATCH).map(|_| BenchAction::Increment));
            store
                .dispatch(Action::stream(increments))
                .expect("Pipeline stopped");

            while let Some(counter) = counters.next().await {
                if counter >= start + BATCH {
                    break;
                }
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_reducer_chain,
    benchmark_store_throughput,
    benchmark_async_producer,
);
criterion_main!(benches);
