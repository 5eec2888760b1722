//! In-process blob endpoint.
//!
//! `MemoryEndpoint` keeps one blob in memory and applies the same write
//! rules the service does: staged blocks only become content on commit,
//! pages must be 512-byte aligned, and ETag, append-position and max-size
//! conditions are checked. It counts every call, which makes it the
//! reference endpoint for tests, benches and demos.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use super::{AppendConditions, AppendWrite, BlobCommit, PageWrite, RemoteBlobEndpoint};
use crate::config::PAGE_SIZE;
use crate::error::{EndpointError, STATUS_PRECONDITION_FAILED};
use crate::hash::ContentMd5;

const STATUS_BAD_REQUEST: u16 = 400;

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `put_block` calls.
    pub put_block: usize,
    /// `put_block_list` calls.
    pub put_block_list: usize,
    /// `update_page` calls.
    pub update_page: usize,
    /// `append_block` calls.
    pub append_block: usize,
    /// `put_blob` calls.
    pub put_blob: usize,
}

impl CallCounts {
    /// Returns the total number of calls.
    pub fn total(&self) -> usize {
        self.put_block + self.put_block_list + self.update_page + self.append_block + self.put_blob
    }
}

#[derive(Debug, Default)]
struct BlobState {
    content: Vec<u8>,
    staged: HashMap<String, Bytes>,
    staged_order: Vec<String>,
    committed_blocks: Vec<String>,
    etag_counter: u64,
    calls: CallCounts,
}

impl BlobState {
    fn next_etag(&mut self) -> String {
        self.etag_counter += 1;
        format!("\"0x{:016X}\"", self.etag_counter)
    }

    fn current_etag(&self) -> String {
        format!("\"0x{:016X}\"", self.etag_counter)
    }
}

/// A blob held in memory behind the [`RemoteBlobEndpoint`] interface.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use blobchunk::{BlobKind, MemoryEndpoint, TransferCoordinator, TransferSpec};
///
/// let endpoint = MemoryEndpoint::new();
/// let spec = TransferSpec::new(BlobKind::Block).with_chunk_size(4);
///
/// TransferCoordinator::new(&endpoint, spec).upload(Cursor::new(b"hello world".to_vec()))?;
///
/// assert_eq!(&endpoint.content()[..], b"hello world");
/// assert_eq!(endpoint.calls().put_block, 3);
/// # Ok::<(), blobchunk::TransferError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryEndpoint {
    state: Mutex<BlobState>,
    lease_id: Option<String>,
}

impl MemoryEndpoint {
    /// Creates an empty blob.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a blob that already holds `content`.
    pub fn with_content(content: impl Into<Vec<u8>>) -> Self {
        let endpoint = Self::new();
        {
            let mut state = endpoint.state.lock();
            state.content = content.into();
            state.next_etag();
        }
        endpoint
    }

    /// Requires every write to carry `lease_id`.
    pub fn with_lease(mut self, lease_id: impl Into<String>) -> Self {
        self.lease_id = Some(lease_id.into());
        self
    }

    /// Returns the committed blob content.
    pub fn content(&self) -> Bytes {
        Bytes::copy_from_slice(&self.state.lock().content)
    }

    /// Returns the current ETag of the blob.
    pub fn etag(&self) -> String {
        self.state.lock().current_etag()
    }

    /// Returns the call counts so far.
    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    /// Returns the ids of the last committed block list, in commit order.
    pub fn committed_blocks(&self) -> Vec<String> {
        self.state.lock().committed_blocks.clone()
    }

    /// Returns staged block ids in the order their uploads completed.
    pub fn staged_order(&self) -> Vec<String> {
        self.state.lock().staged_order.clone()
    }

    /// Returns the number of blocks staged but not committed.
    pub fn uncommitted_blocks(&self) -> usize {
        self.state.lock().staged.len()
    }

    fn check_request(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<(), EndpointError> {
        if let Some(required) = self.lease_id.as_deref() {
            if lease_id != Some(required) {
                return Err(EndpointError::from_status(
                    STATUS_PRECONDITION_FAILED,
                    "lease id missing or mismatched",
                ));
            }
        }
        if let Some(md5) = content_md5 {
            if *md5 != ContentMd5::compute(data) {
                return Err(EndpointError::from_status(
                    STATUS_BAD_REQUEST,
                    "Md5Mismatch: payload does not match Content-MD5",
                ));
            }
        }
        Ok(())
    }
}

fn commit(state: &mut BlobState) -> BlobCommit {
    let last_modified = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_default();
    BlobCommit {
        etag: state.next_etag(),
        last_modified,
    }
}

impl RemoteBlobEndpoint for MemoryEndpoint {
    fn put_block(
        &self,
        block_id: &str,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<(), EndpointError> {
        let mut state = self.state.lock();
        state.calls.put_block += 1;
        self.check_request(data, content_md5, lease_id)?;

        trace!(block_id, len = data.len(), "memory: put block");
        state.staged.insert(block_id.to_owned(), data.clone());
        state.staged_order.push(block_id.to_owned());
        Ok(())
    }

    fn put_block_list(
        &self,
        block_ids: &[String],
        lease_id: Option<&str>,
    ) -> Result<BlobCommit, EndpointError> {
        let mut state = self.state.lock();
        state.calls.put_block_list += 1;
        self.check_request(&Bytes::new(), None, lease_id)?;

        let mut content = Vec::new();
        for id in block_ids {
            let block = state.staged.get(id).ok_or_else(|| {
                EndpointError::from_status(STATUS_BAD_REQUEST, format!("InvalidBlockList: {}", id))
            })?;
            content.extend_from_slice(block);
        }

        state.content = content;
        state.committed_blocks = block_ids.to_vec();
        state.staged.clear();
        Ok(commit(&mut state))
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
        let mut state = self.state.lock();
        state.calls.update_page += 1;
        self.check_request(data, content_md5, lease_id)?;

        if start % PAGE_SIZE != 0 || (end + 1) % PAGE_SIZE != 0 || end < start {
            return Err(EndpointError::from_status(
                STATUS_BAD_REQUEST,
                format!("InvalidPageRange: {}-{}", start, end),
            ));
        }
        if end - start + 1 != data.len() as u64 {
            return Err(EndpointError::from_status(
                STATUS_BAD_REQUEST,
                "page range does not match payload length",
            ));
        }
        if let Some(expected) = if_match {
            if expected != state.current_etag() {
                return Err(EndpointError::from_status(
                    STATUS_PRECONDITION_FAILED,
                    format!("ConditionNotMet: if-match {}", expected),
                ));
            }
        }

        let (start, end) = (start as usize, end as usize + 1);
        if state.content.len() < end {
            state.content.resize(end, 0);
        }
        state.content[start..end].copy_from_slice(data);
        Ok(PageWrite {
            etag: state.next_etag(),
        })
    }

    fn append_block(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
        conditions: AppendConditions,
    ) -> Result<AppendWrite, EndpointError> {
        let mut state = self.state.lock();
        state.calls.append_block += 1;
        self.check_request(data, content_md5, lease_id)?;

        let length = state.content.len() as u64;
        if let Some(position) = conditions.append_position {
            if position != length {
                return Err(EndpointError::from_status(
                    STATUS_PRECONDITION_FAILED,
                    format!("AppendPositionConditionNotMet: expected {}, blob is {}", position, length),
                ));
            }
        }
        if let Some(max_size) = conditions.max_size {
            if length + data.len() as u64 > max_size {
                return Err(EndpointError::from_status(
                    STATUS_PRECONDITION_FAILED,
                    format!("MaxBlobSizeConditionNotMet: limit {}", max_size),
                ));
            }
        }

        state.content.extend_from_slice(data);
        Ok(AppendWrite {
            append_offset: length,
            etag: state.next_etag(),
        })
    }

    fn put_blob(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<BlobCommit, EndpointError> {
        let mut state = self.state.lock();
        state.calls.put_blob += 1;
        self.check_request(data, content_md5, lease_id)?;

        state.content = data.to_vec();
        state.committed_blocks.clear();
        state.staged.clear();
        Ok(commit(&mut state))
    }
}
