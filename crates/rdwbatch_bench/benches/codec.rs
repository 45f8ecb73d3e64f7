//! Record codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rdwbatch_bench::test_records;
use rdwbatch_codec::{CborCodec, RecordCodec};
use rdwbatch_testkit::{TestRecordCodec, TEST_RECORD_LENGTH};

/// Benchmark the fixed field layout codec.
fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let record = test_records(1).remove(0);
    let bytes = TestRecordCodec.encode(&record).unwrap();

    group.bench_function("encode", |b| {
        b.iter(|| black_box(TestRecordCodec.encode(black_box(&record)).unwrap()));
    });
    group.bench_function("decode", |b| {
        b.iter(|| black_box(TestRecordCodec.decode(black_box(&bytes)).unwrap()));
    });

    group.finish();
}

/// Benchmark the CBOR codec on the same record shape.
fn bench_cbor(c: &mut Criterion) {
    let mut group = c.benchmark_group("cbor");
    let codec = CborCodec::<(i32, String)>::new(TEST_RECORD_LENGTH);
    let record = test_records(1).remove(0);
    let value = (record.id, record.text);
    let bytes = codec.encode(&value).unwrap();

    group.bench_function("encode", |b| {
        b.iter(|| black_box(codec.encode(black_box(&value)).unwrap()));
    });
    group.bench_function("decode", |b| {
        b.iter(|| black_box(codec.decode(black_box(&bytes)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_layout, bench_cbor);
criterion_main!(benches);
