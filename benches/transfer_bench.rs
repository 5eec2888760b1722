//! Benchmarks for blobchunk.
//!
//! Run with:
//!     cargo bench

use std::io::Cursor;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use blobchunk::{BlobKind, ChunkSequencer, MemoryEndpoint, TransferCoordinator, TransferSpec};

fn bench_sequencer(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequencer");

    for size in [1024 * 1024, 10 * 1024 * 1024] {
        let data: Vec<u8> = (0..size).map(|i| (i * 7 + 13) as u8).collect();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            format!("plain_{}mb", size / (1024 * 1024)),
            &data,
            |b, data| {
                b.iter(|| {
                    let chunks = ChunkSequencer::new(Cursor::new(black_box(data.as_slice())), 256 * 1024);
                    black_box(chunks.filter_map(Result::ok).count())
                });
            },
        );
    }

    group.finish();
}

fn bench_upload(c: &mut Criterion) {
    let mut group = c.benchmark_group("upload");
    let size = 8 * 1024 * 1024; // 8 MB
    let data: Vec<u8> = (0..size).map(|i| (i * 7 + 13) as u8).collect();
    group.throughput(Throughput::Bytes(size as u64));

    for parallelism in [1u32, 4, 8] {
        group.bench_function(format!("block_parallel_{}", parallelism), |b| {
            b.iter(|| {
                let endpoint = MemoryEndpoint::new();
                let spec = TransferSpec::new(BlobKind::Block)
                    .with_chunk_size(256 * 1024)
                    .with_parallelism(parallelism);
                let outcome = TransferCoordinator::new(&endpoint, spec)
                    .upload(Cursor::new(black_box(data.as_slice())))
                    .unwrap();
                black_box(outcome.chunk_count)
            });
        });
    }

    group.bench_function("block_validate_content", |b| {
        b.iter(|| {
            let endpoint = MemoryEndpoint::new();
            let spec = TransferSpec::new(BlobKind::Block)
                .with_chunk_size(256 * 1024)
                .with_validate_content(true);
            let outcome = TransferCoordinator::new(&endpoint, spec)
                .upload(Cursor::new(black_box(data.as_slice())))
                .unwrap();
            black_box(outcome.bytes_sent)
        });
    });

    group.finish();
}

#[cfg(feature = "encryption")]
fn bench_encrypted(c: &mut Criterion) {
    use blobchunk::EncryptionContext;

    let mut group = c.benchmark_group("encrypted");
    let size = 4 * 1024 * 1024; // 4 MB
    let data: Vec<u8> = (0..size).map(|i| (i * 7 + 13) as u8).collect();
    let context = EncryptionContext::new([7u8; 32], [9u8; 16]);
    group.throughput(Throughput::Bytes(size as u64));

    group.bench_function("block_aes_cbc", |b| {
        b.iter(|| {
            let endpoint = MemoryEndpoint::new();
            let spec = TransferSpec::new(BlobKind::Block)
                .with_chunk_size(256 * 1024)
                .with_encryption(context.clone());
            let outcome = TransferCoordinator::new(&endpoint, spec)
                .upload(Cursor::new(black_box(data.as_slice())))
                .unwrap();
            black_box(outcome.bytes_sent)
        });
    });

    group.finish();
}

#[cfg(not(feature = "encryption"))]
fn bench_encrypted(_c: &mut Criterion) {}

criterion_group!(benches, bench_sequencer, bench_upload, bench_encrypted);
criterion_main!(benches);
