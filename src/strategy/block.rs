//! Block blob uploads.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::RequestOptions;
use crate::chunk::{Chunk, CommitToken};
use crate::endpoint::RemoteBlobEndpoint;
use crate::error::EndpointError;

/// Returns the block id for the chunk at `offset`.
///
/// The id is the base64 of the offset as a 32-digit zero-padded decimal, so
/// all ids of a blob have the same length and a retried chunk reuses its id
/// instead of staging a duplicate block.
///
/// # Example
///
/// ```
/// use blobchunk::block_id;
///
/// assert_eq!(block_id(0), "MDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDA=");
/// ```
pub fn block_id(offset: u64) -> String {
    STANDARD.encode(format!("{:032}", offset))
}

/// Stages each chunk as an independent block.
///
/// Blocks may be staged in any order and carry no conditions; the
/// coordinator commits them by ascending offset once all are staged.
#[derive(Debug)]
pub struct BlockBlobUpload {
    options: RequestOptions,
}

impl BlockBlobUpload {
    /// Creates a block uploader.
    pub fn new(options: RequestOptions) -> Self {
        Self { options }
    }

    pub(crate) fn upload<E: RemoteBlobEndpoint + ?Sized>(
        &self,
        endpoint: &E,
        chunk: &Chunk,
    ) -> Result<CommitToken, EndpointError> {
        let id = block_id(chunk.offset);
        let md5 = self.options.content_md5(&chunk.payload);
        endpoint.put_block(&id, &chunk.payload, md5.as_ref(), self.options.lease_id())?;
        Ok(CommitToken::BlockId(id))
    }
}
