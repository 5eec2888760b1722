//! blobchunk
//!
//! Chunked, retrying, optionally parallel and optionally encrypted uploads
//! to remote blob storage.
//!
//! `blobchunk` splits a byte source into fixed-size chunks and writes them
//! to a blob service through a [`RemoteBlobEndpoint`], following the rules
//! of the target blob kind:
//!
//! - block blobs: stage blocks, then commit the block list in offset order
//! - page blobs: write 512-byte aligned page ranges
//! - append blobs: append in order under an append-position condition
//!
//! The crate intentionally:
//! - does NOT build HTTP requests or sign them
//! - does NOT download
//! - does NOT resume interrupted transfers
//!
//! Those belong to the endpoint implementation and the layers above it.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use blobchunk::{BlobKind, MemoryEndpoint, TransferCoordinator, TransferError, TransferSpec};
//!
//! fn main() -> Result<(), TransferError> {
//!     let endpoint = MemoryEndpoint::new();
//!     let spec = TransferSpec::new(BlobKind::Block)
//!         .with_chunk_size(4 * 1024)
//!         .with_parallelism(4)
//!         .with_validate_content(true);
//!
//!     let data = vec![7u8; 100 * 1024];
//!     let outcome = TransferCoordinator::new(&endpoint, spec).upload(Cursor::new(data))?;
//!
//!     println!("{} chunks, {} bytes", outcome.chunk_count, outcome.bytes_sent);
//!     assert_eq!(endpoint.content().len(), 100 * 1024);
//!     Ok(())
//! }
//! ```
//!
//! # Encryption (feature = "encryption")
//!
//! ```
//! # #[cfg(feature = "encryption")]
//! # fn main() -> Result<(), blobchunk::TransferError> {
//! use std::io::Cursor;
//! use blobchunk::{BlobKind, EncryptionContext, MemoryEndpoint, TransferCoordinator, TransferSpec};
//!
//! let endpoint = MemoryEndpoint::new();
//! let context = EncryptionContext::generate();
//! let spec = TransferSpec::new(BlobKind::Block).with_encryption(context.clone());
//!
//! TransferCoordinator::new(&endpoint, spec).upload(Cursor::new(b"secret".to_vec()))?;
//! assert_eq!(context.decrypt(&endpoint.content())?, b"secret");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "encryption"))]
//! # fn main() {}
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chunk;
mod chunker;
mod config;
mod endpoint;
mod error;
mod hash;
mod strategy;
mod stream;
mod transfer;

mod util; // internal read helpers

#[cfg(feature = "encryption")]
mod crypto;

//
// Public surface
//

pub use chunk::{Chunk, CommitToken};
pub use chunker::{ChunkSequencer, chunk_ranges};
pub use config::{
    BlobKind, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT,
    DEFAULT_SUBSTREAM_BUFFER_SIZE, PAGE_SIZE, TransferSpec,
};
pub use endpoint::{
    AppendConditions, AppendWrite, BlobCommit, CallCounts, MemoryEndpoint, PageWrite,
    RemoteBlobEndpoint,
};
pub use error::{BoxError, EndpointError, STATUS_PRECONDITION_FAILED, TransferError};
pub use hash::ContentMd5;
pub use strategy::{
    AppendBlobUpload, BlockBlobUpload, PageBlobUpload, RequestOptions, UploadStrategy, block_id,
};
pub use stream::{SharedSource, SharedSubStream};
pub use transfer::{AbortHandle, ProgressSink, TransferCoordinator, TransferOutcome, TransferState};

#[cfg(feature = "encryption")]
pub use crypto::{AES_BLOCK_SIZE, ChunkEncryptor, EncryptionContext, KEY_SIZE, encrypted_len};
