//! Batch lookup benchmarks
//!
//! - Gallop lookup at increasing distances from the head
//! - Append cost on a long log
//!
//! Run with: cargo bench -p batchlog

use std::sync::Arc;

use batchlog::BatchIndex;
use batchlog_storage::MemoryLog;
use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

const BATCHES: u64 = 4096;

fn build_index(rt: &Runtime) -> BatchIndex<MemoryLog> {
    rt.block_on(async {
        let index = BatchIndex::new(Arc::new(MemoryLog::new()));
        for i in 0..BATCHES {
            index
                .append(vec![Bytes::from(i.to_le_bytes().to_vec())])
                .await
                .expect("append");
        }
        index
    })
}

fn bench_lookup(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let index = build_index(&rt);

    let mut group = c.benchmark_group("lookup");
    for distance in [1u64, 16, 256, 4095] {
        group.bench_with_input(
            BenchmarkId::from_parameter(distance),
            &distance,
            |b, &distance| {
                b.to_async(&rt).iter(|| async {
                    let batch = index
                        .get(black_box(BATCHES - 1 - distance))
                        .await
                        .expect("get");
                    black_box(batch.sequence())
                })
            },
        );
    }
    group.finish();
}

fn bench_append(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let index = build_index(&rt);

    c.bench_function("append_single_block", |b| {
        b.to_async(&rt).iter(|| async {
            index
                .append(vec![Bytes::from_static(b"block")])
                .await
                .expect("append")
        })
    });
}

criterion_group!(benches, bench_lookup, bench_append);
criterion_main!(benches);
