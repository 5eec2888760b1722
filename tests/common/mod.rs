// Shared helpers for integration tests: deterministic data and a
// fault-injecting endpoint wrapper.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use blobchunk::{
    AppendConditions, AppendWrite, BlobCommit, ContentMd5, EndpointError, MemoryEndpoint,
    PageWrite, RemoteBlobEndpoint,
};
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn alphabet() -> Vec<u8> {
    b"abcdefghijklmnopqrstuvwxyz".to_vec()
}

/// Deterministic pseudo-random payload.
pub fn random_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

/// Wraps a [`MemoryEndpoint`], failing or delaying requests on demand.
///
/// Injected failures are answered before the inner endpoint sees the
/// request, so its call counts only include requests that got through.
pub struct FlakyEndpoint {
    pub inner: MemoryEndpoint,
    fail_next: AtomicUsize,
    attempts: AtomicUsize,
    delay: Option<(Mutex<StdRng>, u64)>,
}

impl FlakyEndpoint {
    pub fn new(inner: MemoryEndpoint) -> Self {
        Self {
            inner,
            fail_next: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Answers the next `count` write requests with 503.
    pub fn failing(self, count: usize) -> Self {
        self.arm(count);
        self
    }

    /// Answers the next `count` requests with 503, from now on.
    pub fn arm(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Sleeps a seeded random 0..max_ms before every request.
    pub fn with_random_delay(mut self, seed: u64, max_ms: u64) -> Self {
        self.delay = Some((Mutex::new(StdRng::seed_from_u64(seed)), max_ms));
        self
    }

    /// Requests seen, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn before_request(&self) -> Result<(), EndpointError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some((rng, max_ms)) = &self.delay {
            let ms = rng.lock().unwrap().gen_range(0..=*max_ms);
            thread::sleep(Duration::from_millis(ms));
        }
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(EndpointError::from_status(503, "ServerBusy"));
        }
        Ok(())
    }
}

impl RemoteBlobEndpoint for FlakyEndpoint {
    fn put_block(
        &self,
        block_id: &str,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<(), EndpointError> {
        self.before_request()?;
        self.inner.put_block(block_id, data, content_md5, lease_id)
    }

    fn put_block_list(
        &self,
        block_ids: &[String],
        lease_id: Option<&str>,
    ) -> Result<BlobCommit, EndpointError> {
        self.before_request()?;
        self.inner.put_block_list(block_ids, lease_id)
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
        self.before_request()?;
        self.inner
            .update_page(start, end, data, content_md5, lease_id, if_match)
    }

    fn append_block(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
        conditions: AppendConditions,
    ) -> Result<AppendWrite, EndpointError> {
        self.before_request()?;
        self.inner
            .append_block(data, content_md5, lease_id, conditions)
    }

    fn put_blob(
        &self,
        data: &Bytes,
        content_md5: Option<&ContentMd5>,
        lease_id: Option<&str>,
    ) -> Result<BlobCommit, EndpointError> {
        self.before_request()?;
        self.inner.put_blob(data, content_md5, lease_id)
    }
}
