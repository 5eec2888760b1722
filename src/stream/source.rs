//! The lock-guarded source stream shared by all substreams.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use parking_lot::Mutex;

use super::SharedSubStream;

/// A source stream shared between concurrent readers.
///
/// Regions are relative to the stream position at the time the
/// `SharedSource` was created, so an upload starts wherever the caller left
/// the stream.
///
/// # Example
///
/// ```
/// use std::io::{Cursor, Read};
/// use blobchunk::SharedSource;
///
/// let source = SharedSource::new(Cursor::new(b"hello world".to_vec()))?;
/// let mut second_word = source.substream(6, 5, 4096);
///
/// let mut out = String::new();
/// second_word.read_to_string(&mut out)?;
/// assert_eq!(out, "world");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct SharedSource<S> {
    inner: Arc<Mutex<S>>,
    start: u64,
}

impl<S: Read + Seek> SharedSource<S> {
    /// Wraps `stream`, recording its current position as offset zero.
    pub fn new(mut stream: S) -> io::Result<Self> {
        let start = stream.stream_position()?;
        Ok(Self {
            inner: Arc::new(Mutex::new(stream)),
            start,
        })
    }

    /// Returns the absolute stream position that offset zero maps to.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Measures the bytes between offset zero and the end of the stream.
    pub fn len_from_start(&self) -> io::Result<u64> {
        let mut stream = self.inner.lock();
        let end = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(self.start))?;
        Ok(end.saturating_sub(self.start))
    }

    /// Creates a window over `length` bytes starting at `offset`.
    ///
    /// The window holds a weak reference: it stops reading from the source
    /// once the `SharedSource` is dropped.
    pub fn substream(&self, offset: u64, length: u64, buffer_capacity: usize) -> SharedSubStream<S> {
        SharedSubStream::new(
            Arc::downgrade(&self.inner),
            self.start + offset,
            length,
            buffer_capacity,
        )
    }

    /// Returns the stream if no substream is reading from it.
    pub fn into_inner(self) -> Result<S, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner()),
            Err(inner) => Err(Self {
                inner,
                start: self.start,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_start_is_current_position() {
        let mut cursor = Cursor::new(vec![0u8; 100]);
        cursor.set_position(30);
        let source = SharedSource::new(cursor).unwrap();
        assert_eq!(source.start(), 30);
        assert_eq!(source.len_from_start().unwrap(), 70);
    }

    #[test]
    fn test_substream_offset_is_relative() {
        let mut cursor = Cursor::new(b"xxhello".to_vec());
        cursor.set_position(2);
        let source = SharedSource::new(cursor).unwrap();
        let mut sub = source.substream(0, 5, 16);
        let mut out = Vec::new();
        sub.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_into_inner() {
        let source = SharedSource::new(Cursor::new(vec![1u8, 2, 3])).unwrap();
        let cursor = source.into_inner().unwrap();
        assert_eq!(cursor.into_inner(), vec![1, 2, 3]);
    }
}
