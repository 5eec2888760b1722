//! Page blob uploads.

use parking_lot::Mutex;
use tracing::debug;

use super::RequestOptions;
use crate::chunk::{Chunk, CommitToken};
use crate::config::PAGE_SIZE;
use crate::endpoint::RemoteBlobEndpoint;
use crate::error::{EndpointError, TransferError};

/// Writes each chunk as a range of 512-byte pages.
///
/// Sequential uploads chain ETags: each write must match the ETag returned
/// by the previous one (the first matches the caller's `if_match`, if any).
/// Parallel uploads drop every ETag condition, because a later page may
/// finish before an earlier one and there is no previous ETag to match.
#[derive(Debug)]
pub struct PageBlobUpload {
    options: RequestOptions,
    chain_etags: bool,
    if_match: Mutex<Option<String>>,
}

impl PageBlobUpload {
    /// Creates a page uploader.
    ///
    /// With `parallel` set, `if_match` is ignored and no condition is sent.
    pub fn new(options: RequestOptions, if_match: Option<String>, parallel: bool) -> Self {
        if parallel && if_match.is_some() {
            debug!("page blob ETag condition dropped for parallel upload");
        }
        Self {
            options,
            chain_etags: !parallel,
            if_match: Mutex::new(if_match.filter(|_| !parallel)),
        }
    }

    /// Returns the ETag the next write will be conditioned on.
    pub fn pending_if_match(&self) -> Option<String> {
        self.if_match.lock().clone()
    }

    pub(crate) fn check(&self, chunk: &Chunk) -> Result<(), TransferError> {
        if chunk.offset % PAGE_SIZE != 0 {
            return Err(TransferError::precondition(format!(
                "page write offset {} is not {}-byte aligned",
                chunk.offset, PAGE_SIZE
            )));
        }
        if chunk.is_empty() || chunk.len() as u64 % PAGE_SIZE != 0 {
            return Err(TransferError::precondition(format!(
                "page write at offset {} has length {}, not a positive multiple of {}",
                chunk.offset,
                chunk.len(),
                PAGE_SIZE
            )));
        }
        Ok(())
    }

    pub(crate) fn upload<E: RemoteBlobEndpoint + ?Sized>(
        &self,
        endpoint: &E,
        chunk: &Chunk,
    ) -> Result<CommitToken, EndpointError> {
        let end = chunk.end().saturating_sub(1);
        let md5 = self.options.content_md5(&chunk.payload);
        let condition = if self.chain_etags {
            self.if_match.lock().clone()
        } else {
            None
        };

        let response = endpoint.update_page(
            chunk.offset,
            end,
            &chunk.payload,
            md5.as_ref(),
            self.options.lease_id(),
            condition.as_deref(),
        )?;

        if self.chain_etags {
            *self.if_match.lock() = Some(response.etag.clone());
        }
        Ok(CommitToken::PageCommit {
            etag: response.etag,
        })
    }
}
