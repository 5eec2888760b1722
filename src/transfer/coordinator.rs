//! TransferCoordinator - one transfer, from validation to commit.

use std::io::{Read, Seek};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use super::dispatch::Dispatch;
use super::progress::ProgressSink;
use super::state::TransferState;
use crate::chunk::CommitToken;
use crate::config::{BlobKind, PAGE_SIZE, TransferSpec};
use crate::endpoint::{BlobCommit, RemoteBlobEndpoint};
use crate::error::TransferError;
use crate::stream::SharedSource;
use crate::util::remaining_len;

/// Stops a running transfer between chunks.
///
/// Requests already in flight complete; no further chunk is dispatched and
/// the transfer fails with [`TransferError::Aborted`].
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Requests the transfer to stop.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`abort`](Self::abort) was called.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a successful transfer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Commit tokens in ascending offset order.
    pub tokens: Vec<CommitToken>,
    /// Payload bytes sent, ciphertext included.
    pub bytes_sent: u64,
    /// Number of write requests that carried payload.
    pub chunk_count: usize,
    /// Result of the committing request, if one was made.
    pub commit: Option<BlobCommit>,
}

/// Drives one chunked upload against a [`RemoteBlobEndpoint`].
///
/// A coordinator runs exactly one transfer. Its settings are validated before
/// any request is sent; chunks are then dispatched sequentially or on a
/// bounded worker pool, and block blobs are committed in offset order.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use blobchunk::{BlobKind, MemoryEndpoint, TransferCoordinator, TransferSpec};
///
/// let endpoint = MemoryEndpoint::new();
/// let spec = TransferSpec::new(BlobKind::Block)
///     .with_chunk_size(5)
///     .with_parallelism(3);
///
/// let outcome = TransferCoordinator::new(&endpoint, spec)
///     .upload(Cursor::new(b"abcdefghijklmnopqrstuvwxyz".to_vec()))?;
///
/// assert_eq!(outcome.chunk_count, 6);
/// assert_eq!(&endpoint.content()[..], b"abcdefghijklmnopqrstuvwxyz");
/// # Ok::<(), blobchunk::TransferError>(())
/// ```
pub struct TransferCoordinator<'a, E> {
    endpoint: E,
    spec: TransferSpec,
    progress: Option<Box<dyn ProgressSink + 'a>>,
    abort: AbortHandle,
    state: TransferState,
}

impl<'a, E: RemoteBlobEndpoint> TransferCoordinator<'a, E> {
    /// Creates a coordinator for one transfer.
    pub fn new(endpoint: E, spec: TransferSpec) -> Self {
        Self {
            endpoint,
            spec,
            progress: None,
            abort: AbortHandle::default(),
            state: TransferState::Idle,
        }
    }

    /// Reports progress to `sink`.
    pub fn with_progress(mut self, sink: impl ProgressSink + 'a) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    /// Returns a handle that aborts this coordinator's transfer.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Returns the transfer settings.
    pub fn spec(&self) -> &TransferSpec {
        &self.spec
    }

    /// Returns the endpoint.
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Uploads `source` starting at its current position.
    ///
    /// When no length was given, the source is measured by seeking to its
    /// end, so blob-type length rules are checked before the first request
    /// and progress reports carry a total. Seekable sources can be uploaded
    /// in parallel.
    pub fn upload<S: Read + Seek + Send>(
        &mut self,
        source: S,
    ) -> Result<TransferOutcome, TransferError> {
        self.begin()?;
        let result = self.run_seekable(source);
        self.settle(result)
    }

    /// Uploads a forward-only `source`.
    ///
    /// Non-seekable sources can only be read once, in order, so
    /// `parallelism` must be 1.
    pub fn upload_stream<R: Read>(&mut self, source: R) -> Result<TransferOutcome, TransferError> {
        self.begin()?;
        let length = self.spec.source_length();
        let result = match self.single_put_length(length) {
            Some(length) => self.run_single_put(source, length),
            None if self.spec.is_parallel() => Err(TransferError::precondition(
                "parallel upload requires a seekable source",
            )),
            None => self.run_sequential(source, length),
        };
        self.settle(result)
    }

    fn begin(&mut self) -> Result<(), TransferError> {
        if self.state != TransferState::Idle {
            return Err(TransferError::precondition(format!(
                "coordinator already ran a transfer (state: {})",
                self.state
            )));
        }
        self.state.advance(TransferState::Splitting);

        if let Err(err) = self.spec.validate() {
            warn!(error = %err, "transfer rejected");
            self.state.advance(TransferState::Failed);
            return Err(err);
        }

        info!(
            kind = %self.spec.blob_kind(),
            length = ?self.spec.source_length(),
            chunk_size = self.spec.chunk_size(),
            parallelism = self.spec.parallelism(),
            encrypted = self.spec.is_encrypted(),
            "transfer started"
        );
        Ok(())
    }

    fn settle(
        &mut self,
        result: Result<TransferOutcome, TransferError>,
    ) -> Result<TransferOutcome, TransferError> {
        match &result {
            Ok(outcome) => {
                self.state.advance(TransferState::Done);
                info!(
                    bytes = outcome.bytes_sent,
                    chunks = outcome.chunk_count,
                    "transfer complete"
                );
            }
            Err(err) => {
                self.state.advance(TransferState::Failed);
                warn!(error = %err, offset = ?err.offset(), "transfer failed");
            }
        }
        result
    }

    /// Length of a block blob small enough for one put-blob request.
    fn single_put_length(&self, length: Option<u64>) -> Option<u64> {
        if self.spec.blob_kind() != BlobKind::Block {
            return None;
        }
        let threshold = self.spec.single_put_threshold()?;
        length.filter(|&length| length > 0 && length < threshold)
    }

    fn check_page_length(&self, length: u64) -> Result<(), TransferError> {
        if self.spec.blob_kind() == BlobKind::Page && length % PAGE_SIZE != 0 {
            return Err(TransferError::precondition(format!(
                "page blob length {} is not a multiple of {}",
                length, PAGE_SIZE
            )));
        }
        Ok(())
    }

    /// Bytes the progress sink should expect, if known.
    fn progress_total(&self, length: Option<u64>) -> Option<u64> {
        #[cfg(feature = "encryption")]
        if self.spec.is_encrypted() {
            return length.map(crate::crypto::encrypted_len);
        }
        length
    }

    fn run_seekable<S: Read + Seek + Send>(
        &mut self,
        mut source: S,
    ) -> Result<TransferOutcome, TransferError> {
        let length = match self.spec.source_length() {
            Some(length) => length,
            None => {
                let length = remaining_len(&mut source).map_err(|e| TransferError::io(0, e))?;
                debug!(length, "measured source");
                length
            }
        };
        self.check_page_length(length)?;

        match self.single_put_length(Some(length)) {
            Some(length) => self.run_single_put(source, length),
            None if self.spec.is_parallel() => self.run_parallel(source, length),
            None => self.run_sequential(source, Some(length)),
        }
    }

    fn run_sequential<R: Read>(
        &mut self,
        source: R,
        length: Option<u64>,
    ) -> Result<TransferOutcome, TransferError> {
        let total = self.progress_total(length);
        let dispatch = Dispatch::new(
            &self.endpoint,
            &self.spec,
            self.progress.as_deref().map(|sink| sink as &dyn ProgressSink),
            &self.abort,
            total,
        );

        self.state.advance(TransferState::SequentialDispatch);
        dispatch.progress.start();
        let tokens = dispatch.sequential(source, length)?;

        self.state.advance(TransferState::Committing);
        let commit = dispatch.commit(&tokens)?;
        Ok(TransferOutcome {
            chunk_count: tokens.len(),
            bytes_sent: dispatch.progress.completed(),
            tokens,
            commit,
        })
    }

    fn run_parallel<S: Read + Seek + Send>(
        &mut self,
        source: S,
        length: u64,
    ) -> Result<TransferOutcome, TransferError> {
        let source = SharedSource::new(source).map_err(|e| TransferError::io(0, e))?;
        let dispatch = Dispatch::new(
            &self.endpoint,
            &self.spec,
            self.progress.as_deref().map(|sink| sink as &dyn ProgressSink),
            &self.abort,
            Some(length),
        );

        self.state.advance(TransferState::ParallelDispatch);
        dispatch.progress.start();
        let tokens = dispatch.parallel(&source, length)?;

        self.state.advance(TransferState::Committing);
        let commit = dispatch.commit(&tokens)?;
        Ok(TransferOutcome {
            chunk_count: tokens.len(),
            bytes_sent: dispatch.progress.completed(),
            tokens,
            commit,
        })
    }

    fn run_single_put<R: Read>(
        &mut self,
        source: R,
        length: u64,
    ) -> Result<TransferOutcome, TransferError> {
        let total = self.progress_total(Some(length));
        let dispatch = Dispatch::new(
            &self.endpoint,
            &self.spec,
            self.progress.as_deref().map(|sink| sink as &dyn ProgressSink),
            &self.abort,
            total,
        );

        self.state.advance(TransferState::SequentialDispatch);
        dispatch.progress.start();
        let commit = dispatch.single_put(source, length)?;

        self.state.advance(TransferState::Committing);
        Ok(TransferOutcome {
            tokens: Vec::new(),
            bytes_sent: dispatch.progress.completed(),
            chunk_count: 1,
            commit: Some(commit),
        })
    }
}

impl<E> std::fmt::Debug for TransferCoordinator<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferCoordinator")
            .field("spec", &self.spec)
            .field("state", &self.state)
            .field("aborted", &self.abort.is_aborted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::MemoryEndpoint;
    use crate::strategy::block_id;
    use std::io::Cursor;
    use std::sync::Mutex as StdMutex;

    fn alphabet() -> Vec<u8> {
        b"abcdefghijklmnopqrstuvwxyz".to_vec()
    }

    #[test]
    fn test_sequential_block_upload() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Block).with_chunk_size(5);
        let mut coordinator = TransferCoordinator::new(&endpoint, spec);

        let outcome = coordinator.upload(Cursor::new(alphabet())).unwrap();

        assert_eq!(coordinator.state(), TransferState::Done);
        assert_eq!(outcome.chunk_count, 6);
        assert_eq!(outcome.bytes_sent, 26);
        assert!(outcome.commit.is_some());
        assert_eq!(endpoint.content(), alphabet());

        let calls = endpoint.calls();
        assert_eq!(calls.put_block, 6);
        assert_eq!(calls.put_block_list, 1);
    }

    #[test]
    fn test_parallel_tokens_sorted() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Block)
            .with_chunk_size(5)
            .with_parallelism(4);
        let outcome = TransferCoordinator::new(&endpoint, spec)
            .upload(Cursor::new(alphabet()))
            .unwrap();

        let ids: Vec<_> = outcome
            .tokens
            .iter()
            .map(|t| t.block_id().unwrap().to_owned())
            .collect();
        let expected: Vec<_> = (0..6).map(|i| block_id(i * 5)).collect();
        assert_eq!(ids, expected);
        assert_eq!(endpoint.committed_blocks(), expected);
        assert_eq!(endpoint.content(), alphabet());
    }

    #[test]
    fn test_empty_source_makes_no_calls() {
        for kind in [BlobKind::Block, BlobKind::Append] {
            let endpoint = MemoryEndpoint::new();
            let outcome = TransferCoordinator::new(&endpoint, TransferSpec::new(kind))
                .upload(Cursor::new(Vec::new()))
                .unwrap();
            assert_eq!(outcome.chunk_count, 0);
            assert_eq!(outcome.commit, None);
            assert_eq!(endpoint.calls().total(), 0);
        }
    }

    #[test]
    fn test_invalid_spec_sends_nothing() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Append).with_parallelism(2);
        let mut coordinator = TransferCoordinator::new(&endpoint, spec);

        let err = coordinator.upload(Cursor::new(alphabet())).unwrap_err();
        assert!(matches!(err, TransferError::PreconditionViolation { .. }));
        assert_eq!(coordinator.state(), TransferState::Failed);
        assert_eq!(endpoint.calls().total(), 0);
    }

    #[test]
    fn test_runs_only_once() {
        let endpoint = MemoryEndpoint::new();
        let mut coordinator = TransferCoordinator::new(&endpoint, TransferSpec::new(BlobKind::Block));
        coordinator.upload(Cursor::new(alphabet())).unwrap();

        let err = coordinator.upload(Cursor::new(alphabet())).unwrap_err();
        assert!(matches!(err, TransferError::PreconditionViolation { .. }));
        assert_eq!(coordinator.state(), TransferState::Done);
    }

    #[test]
    fn test_stream_rejects_parallel() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Block).with_parallelism(2);
        let mut coordinator = TransferCoordinator::new(&endpoint, spec);

        let err = coordinator
            .upload_stream(&alphabet()[..])
            .unwrap_err();
        assert!(matches!(err, TransferError::PreconditionViolation { .. }));
        assert_eq!(endpoint.calls().total(), 0);
    }

    #[test]
    fn test_upload_stream_sequential() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Append).with_chunk_size(7);
        let outcome = TransferCoordinator::new(&endpoint, spec)
            .upload_stream(&alphabet()[..])
            .unwrap();
        assert_eq!(outcome.chunk_count, 4);
        assert_eq!(outcome.commit, None);
        assert_eq!(endpoint.content(), alphabet());
        assert_eq!(outcome.tokens.last().and_then(CommitToken::next_offset), Some(26));
    }

    #[test]
    fn test_single_put_under_threshold() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Block)
            .with_chunk_size(5)
            .with_source_length(26)
            .with_single_put_threshold(64);
        let outcome = TransferCoordinator::new(&endpoint, spec)
            .upload(Cursor::new(alphabet()))
            .unwrap();

        assert_eq!(outcome.chunk_count, 1);
        assert!(outcome.tokens.is_empty());
        let calls = endpoint.calls();
        assert_eq!(calls.put_blob, 1);
        assert_eq!(calls.total(), 1);
        assert_eq!(endpoint.content(), alphabet());
    }

    #[test]
    fn test_progress_reports() {
        let reports = StdMutex::new(Vec::new());
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Block)
            .with_chunk_size(10)
            .with_source_length(26);
        TransferCoordinator::new(&endpoint, spec)
            .with_progress(|done: u64, total: Option<u64>| {
                reports.lock().unwrap().push((done, total));
            })
            .upload(Cursor::new(alphabet()))
            .unwrap();

        assert_eq!(
            reports.into_inner().unwrap(),
            vec![(0, Some(26)), (10, Some(26)), (20, Some(26)), (26, Some(26))]
        );
    }

    #[test]
    fn test_progress_total_measured_for_unsized_upload() {
        let reports = StdMutex::new(Vec::new());
        let endpoint = MemoryEndpoint::new();
        let mut cursor = Cursor::new(alphabet());
        cursor.set_position(6);

        TransferCoordinator::new(&endpoint, TransferSpec::new(BlobKind::Block).with_chunk_size(5))
            .with_progress(|done: u64, total: Option<u64>| {
                reports.lock().unwrap().push((done, total));
            })
            .upload(cursor)
            .unwrap();

        let reports = reports.into_inner().unwrap();
        assert_eq!(reports.first(), Some(&(0, Some(20))));
        assert_eq!(reports.last(), Some(&(20, Some(20))));
        assert_eq!(&endpoint.content()[..], &alphabet()[6..]);
    }

    #[test]
    fn test_stream_progress_total_unknown() {
        let reports = StdMutex::new(Vec::new());
        let endpoint = MemoryEndpoint::new();
        TransferCoordinator::new(&endpoint, TransferSpec::new(BlobKind::Block).with_chunk_size(5))
            .with_progress(|done: u64, total: Option<u64>| {
                reports.lock().unwrap().push((done, total));
            })
            .upload_stream(&alphabet()[..])
            .unwrap();

        assert_eq!(reports.into_inner().unwrap().last(), Some(&(26, None)));
    }

    #[test]
    fn test_abort_before_start() {
        let endpoint = MemoryEndpoint::new();
        let mut coordinator =
            TransferCoordinator::new(&endpoint, TransferSpec::new(BlobKind::Block).with_chunk_size(5));
        coordinator.abort_handle().abort();

        let err = coordinator.upload(Cursor::new(alphabet())).unwrap_err();
        assert!(matches!(err, TransferError::Aborted { offset: 0 }));
        assert_eq!(endpoint.calls().total(), 0);
        assert_eq!(coordinator.state(), TransferState::Failed);
    }

    #[test]
    fn test_lease_mismatch_is_not_retried() {
        let endpoint = MemoryEndpoint::new().with_lease("lease-a");
        let spec = TransferSpec::new(BlobKind::Block)
            .with_lease_id("lease-b")
            .with_retry_wait(std::time::Duration::ZERO);
        let err = TransferCoordinator::new(&endpoint, spec)
            .upload(Cursor::new(alphabet()))
            .unwrap_err();
        assert!(matches!(
            err,
            TransferError::ConditionNotSatisfied { offset: 0, .. }
        ));
        assert_eq!(endpoint.calls().put_block, 1);
    }

    #[test]
    fn test_page_length_measured_for_parallel() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Page)
            .with_chunk_size(512)
            .with_parallelism(2);
        let err = TransferCoordinator::new(&endpoint, spec)
            .upload(Cursor::new(vec![0u8; 700]))
            .unwrap_err();
        assert!(matches!(err, TransferError::PreconditionViolation { .. }));
        assert_eq!(endpoint.calls().total(), 0);
    }

    #[test]
    fn test_page_length_measured_for_sequential() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Page).with_chunk_size(512);
        let mut coordinator = TransferCoordinator::new(&endpoint, spec);

        let err = coordinator.upload(Cursor::new(vec![0u8; 700])).unwrap_err();
        assert!(matches!(err, TransferError::PreconditionViolation { .. }));
        assert_eq!(endpoint.calls().update_page, 0);
        assert_eq!(coordinator.state(), TransferState::Failed);
    }

    #[test]
    fn test_page_parallel_upload() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Page)
            .with_chunk_size(512)
            .with_parallelism(3);
        let data: Vec<u8> = (0..2048u32).map(|i| (i % 251) as u8).collect();
        let outcome = TransferCoordinator::new(&endpoint, spec)
            .upload(Cursor::new(data.clone()))
            .unwrap();
        assert_eq!(outcome.chunk_count, 4);
        assert_eq!(endpoint.calls().update_page, 4);
        assert_eq!(endpoint.content(), data);
    }
}
