use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use proglog_rs::storage::{Config, Log, Record};
use tempfile::TempDir;

fn record(size: usize) -> Record {
    Record {
        value: vec![0u8; size],
        offset: 0,
    }
}

fn append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    for payload_size in [64usize, 512, 4096] {
        group.throughput(Throughput::Bytes(payload_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(payload_size),
            &payload_size,
            |b, &payload_size| {
                let dir = TempDir::new().unwrap();
                let log = Log::open(dir.path(), Config::default()).unwrap();

                b.iter(|| {
                    log.append(record(payload_size)).unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, append);
criterion_main!(benches);
