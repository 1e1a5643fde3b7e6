//! Resilience benchmarks
//!
//! Hot paths of the circuit breaker, bulkhead and retry primitives: permit
//! acquisition, outcome recording, short-circuiting and backoff math.
//!
//! Run with: `cargo bench --bench resilience_bench -p bulwark-common`

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use bulwark_common::resilience::{
    policies, BackoffStrategy, Bulkhead, BulkheadConfig, CircuitBreaker, CircuitBreakerConfig,
    Jitter, MockClock, ResilienceError, RetryConfig, RetryExecutor,
};
use bulwark_common::CommonError;
use tokio::runtime::Builder as RuntimeBuilder;

// ============================================================================
// Circuit Breaker Benchmarks
// ============================================================================

fn bench_circuit_breaker_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_breaker_paths");

    group.bench_function("acquire_and_record_success", |b| {
        let breaker = CircuitBreaker::new("bench", CircuitBreakerConfig::default())
            .expect("default config is valid");
        b.iter(|| {
            let permit = breaker.try_acquire().expect("closed breaker admits");
            breaker.on_success(permit);
        });
    });

    group.bench_function("open_short_circuit", |b| {
        let config = CircuitBreakerConfig::builder()
            .sliding_window_size(1)
            .minimum_calls(1)
            .wait_duration_in_open_state(Duration::from_secs(3600))
            .build()
            .expect("valid circuit breaker config for benchmarks");
        let breaker =
            CircuitBreaker::with_clock("bench", config, MockClock::new()).expect("breaker");

        // Trip the breaker so it remains open for the benchmark iterations.
        let _ = breaker.call(|| Err::<(), _>(CommonError::transient("bench", "initial failure")));

        b.iter(|| {
            let result: Result<_, ResilienceError<CommonError>> =
                breaker.call(|| Ok::<_, CommonError>(()));
            let _result = black_box(result);
        });
    });

    for window in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("snapshot", window), &window, |b, &window| {
            let config = CircuitBreakerConfig::builder()
                .sliding_window_size(window)
                .minimum_calls(window)
                .failure_rate_threshold(100.0)
                .build()
                .expect("valid config");
            let breaker = CircuitBreaker::new("bench", config).expect("breaker");
            for _ in 0..window {
                let permit = breaker.try_acquire().expect("closed breaker admits");
                breaker.on_success(permit);
            }
            b.iter(|| black_box(breaker.snapshot()));
        });
    }

    group.finish();
}

// ============================================================================
// Bulkhead Benchmarks
// ============================================================================

fn bench_bulkhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulkhead");

    group.bench_function("try_acquire_release", |b| {
        let bulkhead = Bulkhead::new("bench", BulkheadConfig::default()).expect("bulkhead");
        b.iter(|| {
            let permit = bulkhead.try_acquire().expect("free slot");
            bulkhead.release(permit);
        });
    });

    group.bench_function("reject_when_full", |b| {
        let config = BulkheadConfig::builder().max_concurrent_calls(1).build().expect("config");
        let bulkhead = Bulkhead::new("bench", config).expect("bulkhead");
        let _held = bulkhead.try_acquire().expect("first slot");
        b.iter(|| black_box(bulkhead.try_acquire().is_err()));
    });

    group.finish();
}

// ============================================================================
// Retry Benchmarks
// ============================================================================

fn bench_retry_executor(c: &mut Criterion) {
    let runtime = RuntimeBuilder::new_current_thread()
        .enable_time()
        .build()
        .expect("tokio runtime for benchmarks");
    let mut group = c.benchmark_group("retry_executor");

    group.bench_function("first_attempt_success", |b| {
        let executor = RetryExecutor::new("bench", RetryConfig::default(), policies::AlwaysRetry)
            .expect("executor");
        b.to_async(&runtime).iter(|| async {
            let result = executor.execute(|| async { Ok::<_, CommonError>(1u32) }).await;
            black_box(result.is_ok())
        });
    });

    group.bench_function("non_retryable_failure", |b| {
        let executor = RetryExecutor::new("bench", RetryConfig::default(), policies::RetryOnTransient)
            .expect("executor");
        b.to_async(&runtime).iter(|| async {
            let result = executor
                .execute(|| async { Err::<(), _>(CommonError::permanent("bench", "400")) })
                .await;
            black_box(result.is_err())
        });
    });

    group.finish();
}

fn bench_backoff_and_jitter(c: &mut Criterion) {
    let mut group = c.benchmark_group("retry_backoff");

    let strategies = [
        ("fixed", BackoffStrategy::Fixed(Duration::from_millis(500))),
        (
            "exponential",
            BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(100),
                multiplier: 2.0,
                max_delay: Duration::from_secs(30),
            },
        ),
    ];

    for (name, strategy) in strategies {
        group.bench_with_input(BenchmarkId::new("calculate_delay", name), &strategy, |b, s| {
            b.iter(|| {
                for retry in 0..10 {
                    black_box(s.calculate_delay(retry));
                }
            });
        });
    }

    for (name, jitter) in [("none", Jitter::None), ("full", Jitter::Full), ("equal", Jitter::Equal)]
    {
        group.bench_with_input(BenchmarkId::new("jitter", name), &jitter, |b, jitter| {
            b.iter(|| black_box(jitter.apply(Duration::from_millis(250))));
        });
    }

    group.finish();
}

criterion_group!(
    resilience,
    bench_circuit_breaker_paths,
    bench_bulkhead,
    bench_retry_executor,
    bench_backoff_and_jitter
);
criterion_main!(resilience);
