//! The Chunk type - one unit of upload.

use bytes::Bytes;
use std::fmt;

/// A fixed-size (except possibly the last) slice of the source.
///
/// The payload is what is sent on the wire, so it is ciphertext when the
/// transfer is encrypted. Cloning a chunk is cheap: retries resend the same
/// [`Bytes`] without copying.
///
/// # Example
///
/// ```
/// use blobchunk::Chunk;
/// use bytes::Bytes;
///
/// let chunk = Chunk::new(512, Bytes::from_static(b"hello world"));
///
/// assert_eq!(chunk.len(), 11);
/// assert_eq!(chunk.range(), 512..523);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The offset of the payload in the destination blob.
    pub offset: u64,

    /// The bytes to upload.
    pub payload: Bytes,

    /// Whether the producer knows this is the last chunk of the source.
    ///
    /// Without a known length, a source that ends exactly on a chunk
    /// boundary is only discovered to be exhausted by the next, empty read.
    /// Its last chunk then carries `false`.
    pub is_final: bool,
}

impl Chunk {
    /// Creates a non-final chunk.
    pub fn new(offset: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            offset,
            payload: payload.into(),
            is_final: false,
        }
    }

    /// Creates the last chunk of a source.
    pub fn last(offset: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            offset,
            payload: payload.into(),
            is_final: true,
        }
    }

    /// Returns the payload length.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Returns the end offset (exclusive).
    pub fn end(&self) -> u64 {
        self.offset + self.payload.len() as u64
    }

    /// Returns the destination byte range.
    pub fn range(&self) -> std::ops::Range<u64> {
        self.offset..self.end()
    }

    /// Consumes the chunk and returns the payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chunk({} bytes @ {}", self.len(), self.offset)?;
        if self.is_final {
            write!(f, ", final")?;
        }
        write!(f, ")")
    }
}
