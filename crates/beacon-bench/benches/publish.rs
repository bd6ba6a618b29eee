//! Publish fan-out benchmarks for Beacon.
//!
//! These benchmarks measure synchronous delivery cost per subscriber count.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Instant;
use tenvis_beacon_adapters::BroadcastChannel;
use tenvis_beacon_bench::counting_subscribers;
use tenvis_beacon_core::{AnyChannel, Channel, PubChannel, SimpleChannel, SubChannel, Subscription};

/// Benchmark publish to N subscribers.
fn bench_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout");

    for subscribers in [0usize, 1, 10, 100, 1000] {
        let channel = SimpleChannel::<u64>::new();
        let (_hits, _subscriptions) = counting_subscribers(&channel, subscribers);

        group.throughput(Throughput::Elements(subscribers.max(1) as u64));
        group.bench_with_input(
            BenchmarkId::new("simple", subscribers),
            &subscribers,
            |b, _| b.iter(|| channel.publish(black_box(42))),
        );
    }

    group.finish();
}

/// Benchmark the cost of type erasure on the publish path.
fn bench_erased(c: &mut Criterion) {
    let mut group = c.benchmark_group("erased");

    let channel = SimpleChannel::<u64>::new();
    let (_hits, _subscriptions) = counting_subscribers(&channel, 10);
    let erased: AnyChannel<u64> = channel.clone().erase();

    group.bench_function("concrete", |b| b.iter(|| channel.publish(black_box(7))));
    group.bench_function("any_channel", |b| b.iter(|| erased.publish(black_box(7))));

    group.finish();
}

/// Benchmark subscribe + cancel churn.
fn bench_subscribe_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscribe_cancel");

    let channel = SimpleChannel::<u64>::new();
    let (_hits, _subscriptions) = counting_subscribers(&channel, 100);

    group.bench_function("with_100_present", |b| {
        b.iter(|| {
            let subscription = channel.subscribe(|value: &u64| {
                black_box(value);
            });
            subscription.cancel();
        });
    });

    group.finish();
}

/// Benchmark publish through the broadcast adapter until delivery.
fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    group.bench_function("single_subscriber", |b| {
        b.iter_custom(|iters| {
            let channel =
                BroadcastChannel::<u64>::with_handle(1024, runtime.handle().clone()).unwrap();
            let (tx, rx) = std::sync::mpsc::channel();
            let subscription = channel.subscribe(move |value: &u64| {
                let _ = tx.send(*value);
            });

            let start = Instant::now();
            for i in 0..iters {
                channel.publish(i);
                let _ = rx.recv();
            }
            let elapsed = start.elapsed();
            subscription.cancel();
            elapsed
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_fanout,
    bench_erased,
    bench_subscribe_cancel,
    bench_broadcast,
);
criterion_main!(benches);
