//! Client-side encryption of chunk payloads.
//!
//! Chunks are encrypted with AES-256 in CBC mode and PKCS7 padding. CBC
//! chains every block to the previous one, so one [`ChunkEncryptor`] carries
//! cipher state across all chunks of a transfer and is finalized exactly
//! once, on the last chunk. This is why encrypted transfers are always
//! sequential.
//!
//! - [`EncryptionContext`] - Content key and IV for one blob
//! - [`ChunkEncryptor`] - Streaming encryptor created from a context

mod context;
mod encryptor;

pub use context::EncryptionContext;
pub use encryptor::{ChunkEncryptor, encrypted_len};

/// AES block size in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

/// Content key size in bytes (AES-256).
pub const KEY_SIZE: usize = 32;
