use std::sync::Arc;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use netrand::engine::TimingEngine;
use netrand::fetch::{FetchError, Fetcher};
use netrand::report;
use netrand::stats;
use netrand::types::{RecordedRun, TimingResult};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Answers immediately, so only the engine's own bookkeeping is measured.
struct NoLatency;

#[async_trait]
impl Fetcher for NoLatency {
    async fn get(&self, _url: &str) -> Result<(), FetchError> {
        Ok(())
    }
}

/// Deterministic pseudo-latencies in the 20..120ms range.
fn durations(n: usize) -> Vec<i64> {
    (0..n).map(|i| 20 + ((i * 37) % 100) as i64).collect()
}

fn make_run(run_id: i64, batch_size: usize, trials: usize) -> RecordedRun {
    let sequential = durations(trials);
    let mut concurrent = durations(trials);
    concurrent.reverse();
    RecordedRun {
        run_id: Some(run_id),
        result: TimingResult {
            batch_size,
            concurrent_total_ms: concurrent.iter().sum::<i64>() / batch_size as i64,
            concurrent_durations_ms: concurrent,
            sequential_total_ms: sequential.iter().sum(),
            sequential_durations_ms: sequential,
        },
    }
}

// ---------------------------------------------------------------------------
// Benchmarks: engine
// ---------------------------------------------------------------------------

fn bench_engine_overhead(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = TimingEngine::new(Arc::new(NoLatency));

    let mut group = c.benchmark_group("concurrent_overhead");
    for &batch_size in &[1, 8, 32, 100] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter(|| {
                    rt.block_on(engine.concurrent("http://bench.test/", 100, batch_size))
                        .unwrap()
                });
            },
        );
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmarks: stats
// ---------------------------------------------------------------------------

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");
    for &size in &[10, 100, 1000] {
        let values = durations(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &values, |b, v| {
            b.iter(|| stats::summarize(v));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmarks: report
// ---------------------------------------------------------------------------

fn bench_report(c: &mut Criterion) {
    // A full default sweep: batch sizes 1..=32, ten repeats, 100 trials.
    let runs: Vec<RecordedRun> = (0..320)
        .map(|i| make_run(i as i64 + 1, i / 10 + 1, 100))
        .collect();

    let mut group = c.benchmark_group("report");
    group.bench_function("table", |b| {
        b.iter(|| report::format_results(&runs));
    });
    group.bench_function("json", |b| {
        b.iter(|| report::format_results_json(&runs));
    });
    group.finish();
}

criterion_group!(benches, bench_engine_overhead, bench_summarize, bench_report);
criterion_main!(benches);
