//! Framed record stream benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rdwbatch_bench::{framed_dataset, pattern_data};
use rdwbatch_core::{Checkpointable, FramedRecordStream, Position, StreamConfig};
use rdwbatch_storage::{FileBackend, InMemoryBackend};
use tempfile::TempDir;

/// Benchmark appending frames to memory.
fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_write");

    for len in [80, 512, 4096].iter() {
        group.throughput(Throughput::Bytes(*len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            let config = StreamConfig::new(len);
            let mut out =
                FramedRecordStream::open_writer(Box::new(InMemoryBackend::new()), &config).unwrap();
            let payload = pattern_data(0, len);

            b.iter(|| {
                let index = out.write(black_box(&payload)).unwrap();
                black_box(index);
            });
        });
    }

    group.finish();
}

/// Benchmark appending frames to a file.
fn bench_file_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_file_write");
    group.sample_size(50);

    for len in [80, 4096].iter() {
        group.throughput(Throughput::Bytes(*len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            let temp_dir = TempDir::new().unwrap();
            let backend = FileBackend::open(&temp_dir.path().join("bench.dat")).unwrap();
            let config = StreamConfig::new(len);
            let mut out = FramedRecordStream::open_writer(Box::new(backend), &config).unwrap();
            let payload = pattern_data(0, len);

            b.iter(|| {
                out.write(black_box(&payload)).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark reading a whole dataset.
fn bench_read_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_read_all");
    let count = 1000;

    for len in [80, 512, 4096].iter() {
        group.throughput(Throughput::Bytes((count * len) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            let data = framed_dataset(count, len).data();
            let config = StreamConfig::new(len);

            b.iter(|| {
                let backend = InMemoryBackend::with_data(data.clone());
                let mut input = FramedRecordStream::open(Box::new(backend), &config).unwrap();
                while let Some(record) = input.read_next().unwrap() {
                    black_box(record);
                }
            });
        });
    }

    group.finish();
}

/// Benchmark restoring a reader by byte offset versus by replay.
fn bench_restore(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_restore");
    let len = 80;

    for target in [10u64, 1000, 10_000].iter() {
        let data = framed_dataset(*target as usize, len).data();

        group.bench_with_input(BenchmarkId::new("byte_offset", target), target, |b, &target| {
            let config = StreamConfig::new(len);
            b.iter(|| {
                let backend = InMemoryBackend::with_data(data.clone());
                let mut input = FramedRecordStream::open(Box::new(backend), &config).unwrap();
                input
                    .restore(Position::ByteOffset(target * (len as u64 + 2)))
                    .unwrap();
                black_box(input.records());
            });
        });

        group.bench_with_input(BenchmarkId::new("replay", target), target, |b, &target| {
            let config = StreamConfig::new(len).large_dataset_support(true);
            b.iter(|| {
                let backend = InMemoryBackend::with_data(data.clone());
                let mut input = FramedRecordStream::open(Box::new(backend), &config).unwrap();
                input.restore(Position::RecordCount(target)).unwrap();
                black_box(input.records());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write, bench_file_write, bench_read_all, bench_restore);
criterion_main!(benches);
