//! ChunkSequencer - fixed-size chunk iterator over a reader.
//!
//! The sequencer reads until a full chunk is accumulated or the reader is
//! exhausted, and yields [`Chunk`]s in source order. It works the same over
//! a plain stream and over a [`SharedSubStream`](crate::SharedSubStream).
//!
//! With an encryptor attached, every full chunk is passed through
//! `update` and the chunk that ends the stream (short or empty) is padded
//! and finalized. Finalization happens exactly once.
//!
//! # Example
//!
//! ```
//! use blobchunk::ChunkSequencer;
//! use std::io::Cursor;
//!
//! let chunks: Vec<_> = ChunkSequencer::new(Cursor::new(b"abcdefghij".to_vec()), 4)
//!     .collect::<Result<_, _>>()?;
//!
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(&chunks[2].payload[..], b"ij");
//! assert!(chunks[2].is_final);
//! # Ok::<(), blobchunk::TransferError>(())
//! ```

use std::io::Read;

use bytes::Bytes;

use crate::chunk::Chunk;
use crate::error::TransferError;
use crate::util::read_up_to;

#[cfg(feature = "encryption")]
use crate::crypto::ChunkEncryptor;

/// A lazy, non-restartable sequence of chunks read from `R`.
///
/// Once consumed it cannot be replayed: retries resend chunks that were
/// already materialized instead of re-reading the source.
pub struct ChunkSequencer<R> {
    reader: R,
    chunk_size: usize,
    remaining: Option<u64>,
    offset: u64,
    #[cfg(feature = "encryption")]
    encryptor: Option<ChunkEncryptor>,
    finished: bool,
}

impl<R: Read> ChunkSequencer<R> {
    /// Creates a sequencer yielding chunks of `chunk_size` bytes.
    ///
    /// A `chunk_size` of zero is treated as one.
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            remaining: None,
            offset: 0,
            #[cfg(feature = "encryption")]
            encryptor: None,
            finished: false,
        }
    }

    /// Reads at most `length` bytes from the reader.
    pub fn with_length(mut self, length: u64) -> Self {
        self.remaining = Some(length);
        self
    }

    /// Numbers chunk offsets from `offset` instead of zero.
    pub fn starting_at(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Encrypts chunks with `encryptor` (requires `encryption` feature).
    #[cfg(feature = "encryption")]
    pub fn with_encryptor(mut self, encryptor: ChunkEncryptor) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    /// Returns the offset the next chunk will start at.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns true once the sequence has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn read_next(&mut self) -> Result<Vec<u8>, TransferError> {
        let limit = match self.remaining {
            Some(remaining) => remaining.min(self.chunk_size as u64) as usize,
            None => self.chunk_size,
        };
        let mut data = Vec::with_capacity(limit);
        read_up_to(&mut self.reader, &mut data, limit)
            .map_err(|e| TransferError::io(self.offset, e))?;

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= data.len() as u64;
        }
        Ok(data)
    }

    fn emit(&mut self, payload: Bytes, is_final: bool) -> Chunk {
        let chunk = Chunk {
            offset: self.offset,
            payload,
            is_final,
        };
        self.offset += chunk.len() as u64;
        chunk
    }
}

impl<R: Read> Iterator for ChunkSequencer<R> {
    type Item = Result<Chunk, TransferError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            let data = match self.read_next() {
                Ok(data) => data,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };
            let short = data.len() < self.chunk_size;

            #[cfg(feature = "encryption")]
            if let Some(encryptor) = self.encryptor.as_mut() {
                // Only the short (or empty) chunk that ends the stream is finalized.
                let result = if short {
                    self.finished = true;
                    encryptor.finalize(&data)
                } else {
                    encryptor.update(&data)
                };
                match result {
                    // Cipher blocks straddling a tiny chunk: keep reading.
                    Ok(payload) if payload.is_empty() && !short => continue,
                    Ok(payload) => return Some(Ok(self.emit(payload, short))),
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                }
            }

            if data.is_empty() {
                self.finished = true;
                return None;
            }

            let is_final = short || self.remaining == Some(0);
            if is_final {
                self.finished = true;
            }
            return Some(Ok(self.emit(Bytes::from(data), is_final)));
        }
    }
}

impl<R> std::fmt::Debug for ChunkSequencer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkSequencer")
            .field("chunk_size", &self.chunk_size)
            .field("remaining", &self.remaining)
            .field("offset", &self.offset)
            .field("finished", &self.finished)
            .finish()
    }
}
