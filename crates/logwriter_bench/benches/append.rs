//! End-to-end append benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use logwriter_bench::utils::random_payload;
use logwriter_core::{Backoff, Config, LogWriter, ManualClock};
use logwriter_store::InMemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn open_writer(temp: &TempDir, configure: impl FnOnce(Config) -> Config) -> LogWriter {
    let config = Config::new(temp.path())
        .mutex_backoff(Backoff::from_millis(1, 5))
        .lock_backoff(Backoff::from_millis(1, 5));
    LogWriter::open(configure(config), Arc::new(InMemoryStore::new())).unwrap()
}

/// Benchmark appends to a long-lived active file.
fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    group.sample_size(50);

    for size in [64, 1024, 16384].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let temp = TempDir::new().unwrap();
            let writer = open_writer(&temp, |c| c);
            let payload = random_payload(size);

            b.iter(|| {
                let appended = writer.append("bench", Some(1), black_box(&payload)).unwrap();
                black_box(appended);
            });
        });
    }

    group.finish();
}

/// Benchmark appends that sync file data every time.
fn bench_append_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_sync");
    group.sample_size(20);

    group.bench_function("256", |b| {
        let temp = TempDir::new().unwrap();
        let writer = open_writer(&temp, |c| c.sync_on_append(true));
        let payload = random_payload(256);

        b.iter(|| {
            writer.append("bench", None, black_box(&payload)).unwrap();
        });
    });

    group.finish();
}

/// Benchmark appends that rotate on every call.
fn bench_append_rotating(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_rotating");
    group.sample_size(20);

    group.bench_function("every_append", |b| {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let writer = open_writer(&temp, |c| c.file_lifetime(Duration::ZERO))
            .with_clock(clock.clone());

        b.iter(|| {
            clock.advance(1);
            writer.append("bench", None, "x").unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_append, bench_append_sync, bench_append_rotating);
criterion_main!(benches);
