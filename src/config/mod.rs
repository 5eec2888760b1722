//! Configuration for a transfer.
//!
//! This module provides the types that describe one upload:
//!
//! - [`TransferSpec`] - Chunking, concurrency, retry and blob-type settings
//! - [`BlobKind`] - Which write semantics the destination blob uses
//!
//! # Example
//!
//! ```
//! use blobchunk::{BlobKind, TransferSpec};
//!
//! let spec = TransferSpec::new(BlobKind::Block)
//!     .with_chunk_size(1024 * 1024)
//!     .with_parallelism(4)
//!     .with_source_length(10 * 1024 * 1024);
//!
//! spec.validate()?;
//! # Ok::<(), blobchunk::TransferError>(())
//! ```

use std::fmt;
use std::time::Duration;

use crate::error::TransferError;

#[cfg(feature = "encryption")]
use crate::crypto::EncryptionContext;

/// Default chunk size (4 MiB), the largest block the service accepts per request.
pub const DEFAULT_CHUNK_SIZE: u32 = 4 * 1024 * 1024;

/// Default read-ahead buffer size of a shared substream (4 MiB).
pub const DEFAULT_SUBSTREAM_BUFFER_SIZE: u32 = 4 * 1024 * 1024;

/// Default number of retries per chunk.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default wait between retries of a chunk.
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(1);

/// Page blob writes must be aligned to this many bytes.
pub const PAGE_SIZE: u64 = 512;

/// The kind of blob being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKind {
    /// Independently staged blocks followed by an explicit block list commit.
    Block,
    /// Overwritable 512-byte aligned pages.
    Page,
    /// Append-only sequential writes.
    Append,
}

impl fmt::Display for BlobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlobKind::Block => "block",
            BlobKind::Page => "page",
            BlobKind::Append => "append",
        };
        f.write_str(name)
    }
}

/// Settings for one chunked transfer.
///
/// A `TransferSpec` is handed to a [`TransferCoordinator`](crate::TransferCoordinator)
/// by value and cannot change once the transfer starts.
#[derive(Debug, Clone)]
pub struct TransferSpec {
    blob_kind: BlobKind,
    source_length: Option<u64>,
    chunk_size: u32,
    parallelism: u32,
    validate_content: bool,
    lease_id: Option<String>,
    max_retries: u32,
    retry_wait: Duration,
    if_match: Option<String>,
    max_size_condition: Option<u64>,
    single_put_threshold: Option<u64>,
    substream_buffer_size: u32,
    #[cfg(feature = "encryption")]
    encryption: Option<EncryptionContext>,
}

impl TransferSpec {
    /// Creates a sequential transfer spec with default settings.
    pub fn new(blob_kind: BlobKind) -> Self {
        Self {
            blob_kind,
            source_length: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallelism: 1,
            validate_content: false,
            lease_id: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_wait: DEFAULT_RETRY_WAIT,
            if_match: None,
            max_size_condition: None,
            single_put_threshold: None,
            substream_buffer_size: DEFAULT_SUBSTREAM_BUFFER_SIZE,
            #[cfg(feature = "encryption")]
            encryption: None,
        }
    }

    /// Sets the number of source bytes to upload.
    ///
    /// Without a length the source is read until it is exhausted.
    pub fn with_source_length(mut self, length: u64) -> Self {
        self.source_length = Some(length);
        self
    }

    /// Sets the chunk size in bytes.
    pub fn with_chunk_size(mut self, size: u32) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the maximum number of concurrent chunk uploads.
    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Sends a Content-MD5 integrity value with every chunk.
    pub fn with_validate_content(mut self, validate: bool) -> Self {
        self.validate_content = validate;
        self
    }

    /// Sets the lease id required by a leased blob.
    pub fn with_lease_id(mut self, lease_id: impl Into<String>) -> Self {
        self.lease_id = Some(lease_id.into());
        self
    }

    /// Sets how many times a failing chunk is retried.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the fixed wait between retries.
    pub fn with_retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = wait;
        self
    }

    /// Sets the fixed wait between retries in seconds.
    ///
    /// Negative or non-finite values are treated as zero.
    pub fn with_retry_wait_secs(self, secs: f64) -> Self {
        let wait = Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO);
        self.with_retry_wait(wait)
    }

    /// Sets the ETag the first page write must match.
    pub fn with_if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }

    /// Sets the maximum length an append blob may grow to.
    pub fn with_max_size_condition(mut self, max_size: u64) -> Self {
        self.max_size_condition = Some(max_size);
        self
    }

    /// Uploads block blobs shorter than `threshold` bytes with one request.
    pub fn with_single_put_threshold(mut self, threshold: u64) -> Self {
        self.single_put_threshold = Some(threshold);
        self
    }

    /// Sets the read-ahead buffer size of each shared substream.
    pub fn with_substream_buffer_size(mut self, size: u32) -> Self {
        self.substream_buffer_size = size;
        self
    }

    /// Encrypts every chunk with the given context (requires `encryption` feature).
    #[cfg(feature = "encryption")]
    pub fn with_encryption(mut self, context: EncryptionContext) -> Self {
        self.encryption = Some(context);
        self
    }

    /// Returns the blob kind.
    pub fn blob_kind(&self) -> BlobKind {
        self.blob_kind
    }

    /// Returns the source length, if known.
    pub fn source_length(&self) -> Option<u64> {
        self.source_length
    }

    /// Returns the chunk size.
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Returns the configured parallelism.
    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    /// Returns whether chunks carry a Content-MD5 value.
    pub fn validate_content(&self) -> bool {
        self.validate_content
    }

    /// Returns the lease id.
    pub fn lease_id(&self) -> Option<&str> {
        self.lease_id.as_deref()
    }

    /// Returns the retry count.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the wait between retries.
    pub fn retry_wait(&self) -> Duration {
        self.retry_wait
    }

    /// Returns the initial page ETag condition.
    pub fn if_match(&self) -> Option<&str> {
        self.if_match.as_deref()
    }

    /// Returns the append max-size condition.
    pub fn max_size_condition(&self) -> Option<u64> {
        self.max_size_condition
    }

    /// Returns the single-put threshold.
    pub fn single_put_threshold(&self) -> Option<u64> {
        self.single_put_threshold
    }

    /// Returns the substream read-ahead buffer size.
    pub fn substream_buffer_size(&self) -> u32 {
        self.substream_buffer_size
    }

    /// Returns the encryption context (requires `encryption` feature).
    #[cfg(feature = "encryption")]
    pub fn encryption(&self) -> Option<&EncryptionContext> {
        self.encryption.as_ref()
    }

    /// Returns true if chunks are encrypted.
    pub fn is_encrypted(&self) -> bool {
        #[cfg(feature = "encryption")]
        {
            self.encryption.is_some()
        }
        #[cfg(not(feature = "encryption"))]
        {
            false
        }
    }

    /// Returns true if chunks are uploaded concurrently.
    pub fn is_parallel(&self) -> bool {
        self.parallelism > 1
    }

    /// Validates the settings against the blob kind's rules.
    ///
    /// Every rule is checked before any request is sent.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.chunk_size == 0 {
            return Err(TransferError::precondition("chunk_size must be non-zero"));
        }

        if self.parallelism == 0 {
            return Err(TransferError::precondition("parallelism must be at least 1"));
        }

        if self.substream_buffer_size == 0 {
            return Err(TransferError::precondition(
                "substream_buffer_size must be non-zero",
            ));
        }

        if self.is_encrypted() && self.is_parallel() {
            return Err(TransferError::precondition(
                "encryption requires sequential upload (parallelism = 1)",
            ));
        }

        match self.blob_kind {
            BlobKind::Block => {}
            BlobKind::Page => {
                if u64::from(self.chunk_size) % PAGE_SIZE != 0 {
                    return Err(TransferError::precondition(format!(
                        "page blob chunk_size {} is not a multiple of {}",
                        self.chunk_size, PAGE_SIZE
                    )));
                }
                if let Some(length) = self.source_length.filter(|len| len % PAGE_SIZE != 0) {
                    return Err(TransferError::precondition(format!(
                        "page blob length {} is not a multiple of {}",
                        length, PAGE_SIZE
                    )));
                }
                if self.is_encrypted() {
                    return Err(TransferError::precondition(
                        "page blobs cannot be encrypted: padding breaks page alignment",
                    ));
                }
            }
            BlobKind::Append => {
                if self.is_parallel() {
                    return Err(TransferError::precondition(
                        "append blobs must be uploaded sequentially (parallelism = 1)",
                    ));
                }
            }
        }

        Ok(())
    }
}
