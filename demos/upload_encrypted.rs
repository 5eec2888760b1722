//! Client-side encrypted upload example.
//!
//! Run with:
//!     cargo run --example upload_encrypted

use std::io::Cursor;

use blobchunk::{
    BlobKind, EncryptionContext, MemoryEndpoint, TransferCoordinator, TransferError, TransferSpec,
    encrypted_len,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), TransferError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let plaintext: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    let context = EncryptionContext::generate();

    let endpoint = MemoryEndpoint::new();
    let spec = TransferSpec::new(BlobKind::Block)
        .with_chunk_size(16 * 1024)
        .with_source_length(plaintext.len() as u64)
        .with_encryption(context.clone());

    let outcome = TransferCoordinator::new(&endpoint, spec).upload(Cursor::new(plaintext.clone()))?;
    println!(
        "Plaintext {} bytes -> ciphertext {} bytes (expected {}) in {} chunks",
        plaintext.len(),
        outcome.bytes_sent,
        encrypted_len(plaintext.len() as u64),
        outcome.chunk_count
    );

    let decrypted = context.decrypt(&endpoint.content())?;
    println!("Round trip ok: {}", decrypted == plaintext);

    Ok(())
}
