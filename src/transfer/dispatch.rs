//! Chunk dispatch for one transfer: sequential loop, worker pool, commit.

use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use super::coordinator::AbortHandle;
use super::progress::{ProgressSink, ProgressState};
use super::retry::RetryPolicy;
use crate::chunk::{Chunk, CommitToken};
use crate::chunker::{ChunkSequencer, chunk_ranges};
use crate::config::{BlobKind, TransferSpec};
use crate::endpoint::{BlobCommit, RemoteBlobEndpoint};
use crate::error::TransferError;
use crate::hash::ContentMd5;
use crate::strategy::UploadStrategy;
use crate::stream::SharedSource;
use crate::util::concat_bytes;

/// Everything the workers of one transfer share.
///
/// Borrowed from the coordinator for the duration of a run, so the
/// coordinator keeps ownership of the endpoint between transfers.
pub(crate) struct Dispatch<'s, E> {
    endpoint: &'s E,
    spec: &'s TransferSpec,
    strategy: UploadStrategy,
    retry: RetryPolicy,
    abort: &'s AbortHandle,
    pub(crate) progress: ProgressState<'s>,
}

impl<'s, E: RemoteBlobEndpoint> Dispatch<'s, E> {
    pub(crate) fn new(
        endpoint: &'s E,
        spec: &'s TransferSpec,
        sink: Option<&'s dyn ProgressSink>,
        abort: &'s AbortHandle,
        total: Option<u64>,
    ) -> Self {
        Self {
            endpoint,
            spec,
            strategy: UploadStrategy::for_spec(spec),
            retry: RetryPolicy::new(spec.max_retries(), spec.retry_wait()),
            abort,
            progress: ProgressState::new(total, sink),
        }
    }

    fn check_abort(&self, offset: u64) -> Result<(), TransferError> {
        if self.abort.is_aborted() {
            debug!(offset, "transfer aborted");
            return Err(TransferError::Aborted { offset });
        }
        Ok(())
    }

    /// Wraps `reader` in a sequencer configured for this transfer.
    fn sequencer<R: Read>(&self, reader: R, length: Option<u64>) -> ChunkSequencer<R> {
        let sequencer = ChunkSequencer::new(reader, self.spec.chunk_size() as usize);
        let sequencer = match length {
            Some(length) => sequencer.with_length(length),
            None => sequencer,
        };
        #[cfg(feature = "encryption")]
        let sequencer = match self.spec.encryption() {
            Some(context) => sequencer.with_encryptor(context.encryptor()),
            None => sequencer,
        };
        sequencer
    }

    /// Uploads one chunk with retries and records its progress.
    fn upload_chunk(&self, chunk: &Chunk) -> Result<CommitToken, TransferError> {
        self.strategy.check(chunk)?;
        let token = self
            .retry
            .run(chunk.offset, || self.strategy.upload(self.endpoint, chunk))?;
        let completed = self.progress.advance(chunk.len() as u64);
        debug!(
            offset = chunk.offset,
            len = chunk.len(),
            completed,
            token = %token,
            "chunk uploaded"
        );
        Ok(token)
    }

    /// Uploads chunks one after another on the calling thread.
    pub(crate) fn sequential<R: Read>(
        &self,
        reader: R,
        length: Option<u64>,
    ) -> Result<Vec<CommitToken>, TransferError> {
        let mut tokens = Vec::new();
        for chunk in self.sequencer(reader, length) {
            let chunk = chunk?;
            self.check_abort(chunk.offset)?;
            tokens.push(self.upload_chunk(&chunk)?);
        }
        Ok(tokens)
    }

    /// Uploads `length` bytes of `source` on a bounded pool of workers.
    ///
    /// Workers pull chunk ranges from a shared queue, so completion order is
    /// arbitrary; tokens are returned sorted by offset.
    pub(crate) fn parallel<S: Read + Seek + Send>(
        &self,
        source: &SharedSource<S>,
        length: u64,
    ) -> Result<Vec<CommitToken>, TransferError> {
        let ranges: Vec<Range<u64>> = chunk_ranges(length, self.spec.chunk_size()).collect();
        let workers = (self.spec.parallelism() as usize).min(ranges.len());
        debug!(ranges = ranges.len(), workers, "starting workers");

        let queue = Mutex::new(ranges.into_iter());
        let tokens = Mutex::new(BTreeMap::new());
        let failure: Mutex<Option<TransferError>> = Mutex::new(None);
        let stop = AtomicBool::new(false);

        thread::scope(|scope| {
            for worker in 0..workers {
                let (queue, tokens, failure, stop) = (&queue, &tokens, &failure, &stop);
                scope.spawn(move || {
                    if let Err(err) = self.work(source, queue, tokens, stop) {
                        debug!(worker, error = %err, "worker stopped");
                        stop.store(true, Ordering::SeqCst);
                        failure.lock().get_or_insert(err);
                    }
                });
            }
        });

        if let Some(err) = failure.into_inner() {
            return Err(err);
        }
        Ok(tokens.into_inner().into_values().collect())
    }

    fn work<S: Read + Seek>(
        &self,
        source: &SharedSource<S>,
        queue: &Mutex<std::vec::IntoIter<Range<u64>>>,
        tokens: &Mutex<BTreeMap<u64, CommitToken>>,
        stop: &AtomicBool,
    ) -> Result<(), TransferError> {
        loop {
            if stop.load(Ordering::SeqCst) {
                return Ok(());
            }
            let Some(range) = queue.lock().next() else {
                return Ok(());
            };
            self.check_abort(range.start)?;

            let len = range.end - range.start;
            let substream =
                source.substream(range.start, len, self.spec.substream_buffer_size() as usize);
            let chunks = ChunkSequencer::new(substream, self.spec.chunk_size() as usize)
                .with_length(len)
                .starting_at(range.start);
            for chunk in chunks {
                let chunk = chunk?;
                let token = self.upload_chunk(&chunk)?;
                tokens.lock().insert(chunk.offset, token);
            }
        }
    }

    /// Reads the whole source and writes it with one put-blob request.
    pub(crate) fn single_put<R: Read>(
        &self,
        reader: R,
        length: u64,
    ) -> Result<BlobCommit, TransferError> {
        let payloads = self
            .sequencer(reader, Some(length))
            .map(|chunk| chunk.map(Chunk::into_payload))
            .collect::<Result<Vec<Bytes>, _>>()?;
        let data = concat_bytes(payloads);
        self.check_abort(0)?;

        let content_md5 = self
            .spec
            .validate_content()
            .then(|| ContentMd5::compute(&data));
        let commit = self.retry.run(0, || {
            self.endpoint
                .put_blob(&data, content_md5.as_ref(), self.spec.lease_id())
        })?;
        self.progress.advance(data.len() as u64);
        debug!(len = data.len(), etag = %commit.etag, "blob written in one request");
        Ok(commit)
    }

    /// Finalizes the transfer.
    ///
    /// Block blobs commit their staged ids in offset order. Page and append
    /// writes are already durable, so they commit nothing.
    pub(crate) fn commit(&self, tokens: &[CommitToken]) -> Result<Option<BlobCommit>, TransferError> {
        if self.strategy.kind() != BlobKind::Block || tokens.is_empty() {
            return Ok(None);
        }
        let block_ids: Vec<String> = tokens
            .iter()
            .filter_map(|token| token.block_id().map(str::to_owned))
            .collect();
        debug!(blocks = block_ids.len(), "committing block list");
        let commit = self
            .endpoint
            .put_block_list(&block_ids, self.spec.lease_id())
            .map_err(|source| TransferError::Commit { source })?;
        Ok(Some(commit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::MemoryEndpoint;
    use std::io::Cursor;

    #[test]
    fn test_known_length_marks_last_chunk_final() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Block).with_chunk_size(4);
        let abort = AbortHandle::default();
        let dispatch = Dispatch::new(&endpoint, &spec, None, &abort, Some(8));

        let chunks: Vec<_> = dispatch
            .sequencer(Cursor::new(vec![1u8; 8]), Some(8))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_final);
    }

    #[test]
    fn test_sequential_returns_tokens_in_order() {
        let endpoint = MemoryEndpoint::new();
        let spec = TransferSpec::new(BlobKind::Block).with_chunk_size(4);
        let abort = AbortHandle::default();
        let dispatch = Dispatch::new(&endpoint, &spec, None, &abort, Some(10));

        let tokens = dispatch
            .sequential(Cursor::new(b"abcdefghij".to_vec()), Some(10))
            .unwrap();
        let ids: Vec<_> = tokens.iter().filter_map(CommitToken::block_id).collect();
        assert_eq!(
            ids,
            vec![
                crate::strategy::block_id(0),
                crate::strategy::block_id(4),
                crate::strategy::block_id(8)
            ]
        );
        assert_eq!(dispatch.progress.completed(), 10);
    }
}
