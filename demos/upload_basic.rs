//! Basic chunked upload example.
//!
//! Run with:
//!     RUST_LOG=blobchunk=debug cargo run --example upload_basic

use std::io::Cursor;

use blobchunk::{BlobKind, MemoryEndpoint, TransferCoordinator, TransferError, TransferSpec};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), TransferError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let data = b"The quick brown fox jumps over the lazy dog. ".repeat(100);
    println!("Uploading {} bytes\n", data.len());

    for (kind, chunk_size, parallelism) in [
        (BlobKind::Block, 1024, 4),
        (BlobKind::Append, 1000, 1),
    ] {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(kind)
            .with_chunk_size(chunk_size)
            .with_parallelism(parallelism)
            .with_validate_content(true);

        let outcome = TransferCoordinator::new(&endpoint, spec).upload(Cursor::new(data.clone()))?;

        println!("{} blob:", kind);
        for token in &outcome.tokens {
            println!("  {}", token);
        }
        let calls = endpoint.calls();
        println!(
            "  {} chunks, {} bytes, {} requests, content matches: {}\n",
            outcome.chunk_count,
            outcome.bytes_sent,
            calls.total(),
            endpoint.content() == data
        );
    }

    Ok(())
}
