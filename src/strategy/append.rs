//! Append blob uploads.

use parking_lot::Mutex;

use super::RequestOptions;
use crate::chunk::{Chunk, CommitToken};
use crate::endpoint::{AppendConditions, RemoteBlobEndpoint};
use crate::error::EndpointError;

/// Appends chunks strictly in order.
///
/// The first append is unconditional. Every later append requires the blob
/// to be exactly as long as after the previous append, so the service
/// rejects out-of-order or duplicated appends instead of corrupting the blob.
#[derive(Debug)]
pub struct AppendBlobUpload {
    options: RequestOptions,
    max_size: Option<u64>,
    next_offset: Mutex<Option<u64>>,
}

impl AppendBlobUpload {
    /// Creates an append uploader.
    pub fn new(options: RequestOptions, max_size: Option<u64>) -> Self {
        Self {
            options,
            max_size,
            next_offset: Mutex::new(None),
        }
    }

    /// Returns the blob length the next append is conditioned on.
    pub fn next_offset(&self) -> Option<u64> {
        *self.next_offset.lock()
    }

    pub(crate) fn upload<E: RemoteBlobEndpoint + ?Sized>(
        &self,
        endpoint: &E,
        chunk: &Chunk,
    ) -> Result<CommitToken, EndpointError> {
        let mut next_offset = self.next_offset.lock();
        let conditions = AppendConditions {
            append_position: *next_offset,
            max_size: self.max_size,
        };
        let md5 = self.options.content_md5(&chunk.payload);

        let response = endpoint.append_block(
            &chunk.payload,
            md5.as_ref(),
            self.options.lease_id(),
            conditions,
        )?;

        let next = response.append_offset + chunk.len() as u64;
        *next_offset = Some(next);
        Ok(CommitToken::AppendCommit { next_offset: next })
    }
}
