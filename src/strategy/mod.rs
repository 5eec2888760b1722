//! Per-blob-type upload rules.
//!
//! [`UploadStrategy`] is a tagged union with one variant per blob kind.
//! Every variant turns one [`Chunk`] into one remote write and returns the
//! [`CommitToken`] needed to finalize or chain the transfer:
//!
//! - [`BlockBlobUpload`] - Stages blocks under offset-derived ids
//! - [`PageBlobUpload`] - Writes aligned pages, chaining ETags when sequential
//! - [`AppendBlobUpload`] - Appends with a running append-position condition

mod append;
mod block;
mod page;

pub use append::AppendBlobUpload;
pub use block::{BlockBlobUpload, block_id};
pub use page::PageBlobUpload;

use crate::chunk::{Chunk, CommitToken};
use crate::config::{BlobKind, TransferSpec};
use crate::endpoint::RemoteBlobEndpoint;
use crate::error::{EndpointError, TransferError};
use crate::hash::ContentMd5;

/// Settings shared by every request of a transfer.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Send a Content-MD5 value with every payload.
    pub validate_content: bool,
    /// Lease id for leased blobs.
    pub lease_id: Option<String>,
}

impl RequestOptions {
    fn content_md5(&self, data: &[u8]) -> Option<ContentMd5> {
        self.validate_content.then(|| ContentMd5::compute(data))
    }

    fn lease_id(&self) -> Option<&str> {
        self.lease_id.as_deref()
    }
}

/// How chunks are written for one blob kind.
#[derive(Debug)]
pub enum UploadStrategy {
    /// Block blob uploads.
    Block(BlockBlobUpload),
    /// Page blob uploads.
    Page(PageBlobUpload),
    /// Append blob uploads.
    Append(AppendBlobUpload),
}

impl UploadStrategy {
    /// Builds the strategy for the transfer's blob kind.
    pub fn for_spec(spec: &TransferSpec) -> Self {
        let options = RequestOptions {
            validate_content: spec.validate_content(),
            lease_id: spec.lease_id().map(str::to_owned),
        };
        match spec.blob_kind() {
            BlobKind::Block => UploadStrategy::Block(BlockBlobUpload::new(options)),
            BlobKind::Page => UploadStrategy::Page(PageBlobUpload::new(
                options,
                spec.if_match().map(str::to_owned),
                spec.is_parallel(),
            )),
            BlobKind::Append => UploadStrategy::Append(AppendBlobUpload::new(
                options,
                spec.max_size_condition(),
            )),
        }
    }

    /// Returns the blob kind this strategy writes.
    pub fn kind(&self) -> BlobKind {
        match self {
            UploadStrategy::Block(_) => BlobKind::Block,
            UploadStrategy::Page(_) => BlobKind::Page,
            UploadStrategy::Append(_) => BlobKind::Append,
        }
    }

    /// Checks blob-type rules for `chunk` before anything is sent.
    pub fn check(&self, chunk: &Chunk) -> Result<(), TransferError> {
        match self {
            UploadStrategy::Page(page) => page.check(chunk),
            UploadStrategy::Block(_) | UploadStrategy::Append(_) => Ok(()),
        }
    }

    /// Writes `chunk` and returns its commit token.
    ///
    /// Safe to call again with the same chunk after a transient failure.
    pub fn upload<E: RemoteBlobEndpoint + ?Sized>(
        &self,
        endpoint: &E,
        chunk: &Chunk,
    ) -> Result<CommitToken, EndpointError> {
        match self {
            UploadStrategy::Block(block) => block.upload(endpoint, chunk),
            UploadStrategy::Page(page) => page.upload(endpoint, chunk),
            UploadStrategy::Append(append) => append.upload(endpoint, chunk),
        }
    }
}
