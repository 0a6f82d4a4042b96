//! Benchmarks for task creation, settlement and chaining.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tasklet::prelude::*;

fn creation_benchmark(c: &mut Criterion) {
    c.bench_function("create_resolved", |b| {
        b.iter(|| black_box(Task::resolved(black_box(42_u64))))
    });

    c.bench_function("create_deferred", |b| {
        b.iter(|| black_box(Task::<u64>::deferred(TaskConfig::default())))
    });
}

fn settlement_benchmark(c: &mut Criterion) {
    c.bench_function("deferred_resolve", |b| {
        b.iter(|| {
            let (task, settler) = Task::<u64>::deferred(TaskConfig::default());
            settler.resolve(black_box(7));
            black_box(task.status())
        })
    });

    c.bench_function("abort_rejects", |b| {
        b.iter(|| {
            let task = Task::<u64>::from_config(TaskConfig::default());
            task.abort(black_box("stop"));
            black_box(futures::executor::block_on(task))
        })
    });
}

fn chaining_benchmark(c: &mut Criterion) {
    c.bench_function("then_chain_10", |b| {
        b.iter(|| {
            let mut task = Task::resolved(0_u64);
            for _ in 0..10 {
                task = task.then(|v| v + 1);
            }
            black_box(futures::executor::block_on(task))
        })
    });
}

criterion_group!(
    benches,
    creation_benchmark,
    settlement_benchmark,
    chaining_benchmark
);
criterion_main!(benches);
