//! Admission throughput benchmarks
//!
//! Measures the cost of `is_allowed` on hot and cold keys, and of a cleanup
//! sweep over a large registry.
//!
//! Run with: cargo bench --bench limiter_throughput

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use shopgate_limiter::{ManualClock, RateLimitPolicy, RateLimiter};
use std::time::Duration;

fn bench_hot_key(c: &mut Criterion) {
    let limiter = RateLimiter::new(RateLimitPolicy::new(u32::MAX, 1, 1_000));

    c.bench_function("is_allowed_hot_key", |b| {
        b.iter(|| limiter.is_allowed(black_box("203.0.113.7:curl/8.4.0")))
    });
}

fn bench_distinct_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_allowed_distinct_keys");

    for count in [100usize, 10_000] {
        let keys: Vec<String> = (0..count).map(|i| format!("10.0.{}.{}:agent", i / 256, i % 256)).collect();
        let limiter = RateLimiter::new(RateLimitPolicy::api());

        group.bench_with_input(BenchmarkId::from_parameter(count), &keys, |b, keys| {
            let mut next = 0;
            b.iter(|| {
                next = (next + 1) % keys.len();
                limiter.is_allowed(black_box(&keys[next]))
            })
        });
    }

    group.finish();
}

fn bench_cleanup(c: &mut Criterion) {
    c.bench_function("cleanup_10k_idle", |b| {
        b.iter_batched(
            || {
                let clock = ManualClock::new(0);
                let limiter = RateLimiter::with_clock(RateLimitPolicy::read(), clock.clone())
                    .with_max_idle(Duration::from_secs(60));
                for i in 0..10_000 {
                    limiter.is_allowed(&format!("key-{i}"));
                }
                clock.advance(Duration::from_secs(61));
                limiter
            },
            |limiter| black_box(limiter.cleanup()),
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_hot_key, bench_distinct_keys, bench_cleanup);
criterion_main!(benches);
