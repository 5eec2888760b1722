//! File upload example with progress reporting.
//!
//! Run with:
//!     cargo run --example upload_file -- /path/to/file [parallelism]

use std::env;
use std::fs::File;

use blobchunk::{BlobKind, MemoryEndpoint, TransferCoordinator, TransferSpec};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blobchunk=info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "Cargo.toml".to_string());
    let parallelism: u32 = match args.next() {
        Some(value) => value.parse()?,
        None => 4,
    };

    let file = File::open(&path)?;
    let length = file.metadata()?.len();
    println!("Uploading file: {} ({} bytes)\n", path, length);

    let endpoint = MemoryEndpoint::new();
    let spec = TransferSpec::new(BlobKind::Block)
        .with_source_length(length)
        .with_chunk_size(64 * 1024)
        .with_parallelism(parallelism);

    let outcome = TransferCoordinator::new(&endpoint, spec)
        .with_progress(|done: u64, total: Option<u64>| match total {
            Some(total) if total > 0 => {
                println!("progress: {:>10} / {} ({:.1}%)", done, total, done as f64 * 100.0 / total as f64)
            }
            _ => println!("progress: {:>10} bytes", done),
        })
        .upload(file)?;

    println!(
        "\nTotal: {} chunks, {} bytes, etag {}",
        outcome.chunk_count,
        outcome.bytes_sent,
        outcome
            .commit
            .map(|commit| commit.etag)
            .unwrap_or_else(|| "-".to_string())
    );

    Ok(())
}
