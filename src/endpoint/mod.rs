//! The remote side of a transfer.
//!
//! The transfer engine never builds requests itself. It talks to the
//! service through [`RemoteBlobEndpoint`], one method per REST operation it
//! needs; request building, authentication and response parsing live in the
//! implementation.
//!
//! - [`RemoteBlobEndpoint`] - Blob write operations used by the engine
//! - [`MemoryEndpoint`] - In-process endpoint enforcing the service's write rules

mod memory;

use std::sync::Arc;

use bytes::Bytes;

use crate::error::EndpointError;
use crate::hash::ContentMd5;

pub use memory::{CallCounts, MemoryEndpoint};

/// Result of a request that commits blob content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobCommit {
    /// ETag of the committed blob.
    pub etag: String,
    /// Last-Modified value reported by the service.
    pub last_modified: String,
}

/// Result of a page write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWrite {
    /// ETag of the blob after the write.
    pub etag: String,
}

/// Result of an append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendWrite {
    /// Offset at which the block was appended.
    pub append_offset: u64,
    /// ETag of the blob after the append.
    pub etag: String,
}

/// Conditions attached to an append request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendConditions {
    /// The append succeeds only if the blob is exactly this long.
    pub append_position: Option<u64>,
    /// The append succeeds only if the blob stays within this length.
    pub max_size: Option<u64>,
}

/// Blob write operations consumed by the transfer engine.
///
/// Implementations must be callable from several worker threads at once.
/// Return [`EndpointError::ConditionNotSatisfied`] for failed preconditions
/// (HTTP 412) so the engine does not retry them.
pub trait RemoteBlobEndpoint: Send + Sync {
    /// Stages one block of a block blob.
    fn put_block(
        &self,
        block_id: &str,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<(), EndpointError>;

    /// Commits staged blocks, in the given order, as the blob content.
    fn put_block_list(
        &self,
        block_ids: &[String],
        lease_id: Option<&str>,
    ) -> Result<BlobCommit, EndpointError>;

    /// Writes the inclusive page range `start..=end` of a page blob.
    fn update_page(
        &self,
        start: u64,
        end: u64,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
        if_match: Option<&str>,
    ) -> Result<PageWrite, EndpointError>;

    /// Appends one block to an append blob.
    fn append_block(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
        conditions: AppendConditions,
    ) -> Result<AppendWrite, EndpointError>;

    /// Writes a whole block blob in one request.
    fn put_blob(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<BlobCommit, EndpointError>;
}

impl<E: RemoteBlobEndpoint + ?Sized> RemoteBlobEndpoint for &E {
    fn put_block(
        &self,
        block_id: &str,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<(), EndpointError> {
        (**self).put_block(block_id, data, content_md5, lease_id)
    }

    fn put_block_list(
        &self,
        block_ids: &[String],
        lease_id: Option<&str>,
    ) -> Result<BlobCommit, EndpointError> {
        (**self).put_block_list(block_ids, lease_id)
    }

    fn update_page(
        &self,
        start: u64,
        end: u64,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
        if_match: Option<&str>,
    ) -> Result<PageWrite, EndpointError> {
        (**self).update_page(start, end, data, content_md5, lease_id, if_match)
    }

    fn append_block(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
        conditions: AppendConditions,
    ) -> Result<AppendWrite, EndpointError> {
        (**self).append_block(data, content_md5, lease_id, conditions)
    }

    fn put_blob(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<BlobCommit, EndpointError> {
        (**self).put_blob(data, content_md5, lease_id)
    }
}

impl<E: RemoteBlobEndpoint + ?Sized> RemoteBlobEndpoint for Arc<E> {
    fn put_block(
        &self,
        block_id: &str,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<(), EndpointError> {
        (**self).put_block(block_id, data, content_md5, lease_id)
    }

    fn put_block_list(
        &self,
        block_ids: &[String],
        lease_id: Option<&str>,
    ) -> Result<BlobCommit, EndpointError> {
        (**self).put_block_list(block_ids, lease_id)
    }

    fn update_page(
        &self,
        start: u64,
        end: u64,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
        if_match: Option<&str>,
    ) -> Result<PageWrite, EndpointError> {
        (**self).update_page(start, end, data, content_md5, lease_id, if_match)
    }

    fn append_block(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
        conditions: AppendConditions,
    ) -> Result<AppendWrite, EndpointError> {
        (**self).append_block(data, content_md5, lease_id, conditions)
    }

    fn put_blob(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<BlobCommit, EndpointError> {
        (**self).put_blob(data, content_md5, lease_id)
    }
}
