use criterion::{Criterion, criterion_group, criterion_main};
use pipeline_common::{CancellationToken, from_values};
use std::hint::black_box;

fn map_single_worker(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    c.bench_function("map_single_worker_10k", |b| {
        b.to_async(&rt).iter(|| async {
            let pipeline =
                from_values((0..10_000i64).collect()).map(1, |_, env| env.map_value(|v| v * v));
            let stream = pipeline.run(CancellationToken::new());
            let mut rx = stream.data;
            let mut total = 0i64;
            while let Some(env) = rx.recv().await {
                total = total.wrapping_add(env.value);
            }
            black_box(total)
        })
    });
}

fn map_fan_out_workers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    c.bench_function("map_eight_workers_10k", |b| {
        b.to_async(&rt).iter(|| async {
            let pipeline =
                from_values((0..10_000i64).collect()).map(8, |_, env| env.map_value(|v| v * v));
            let stream = pipeline.run(CancellationToken::new());
            let mut rx = stream.data;
            let mut total = 0i64;
            while let Some(env) = rx.recv().await {
                total = total.wrapping_add(env.value);
            }
            black_box(total)
        })
    });
}

criterion_group!(benches, map_single_worker, map_fan_out_workers);
criterion_main!(benches);
