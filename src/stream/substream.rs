//! A bounded, buffered window over a shared source stream.

use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;
use std::sync::Weak;

use parking_lot::Mutex;

use crate::util::read_up_to;

/// A seekable reader over one region of a [`SharedSource`](super::SharedSource).
///
/// Every substream owns a private read-ahead buffer. Reads served from the
/// buffer never touch the source or its lock. When a read runs past the
/// buffered bytes the substream takes the shared lock, seeks the source to
/// the first byte it does not hold yet, and refills in one go. The lock is
/// held only for that seek and read.
///
/// Reads never cross the region end: at the end of the region `read`
/// returns 0, which is how a chunk reader detects a short final chunk.
pub struct SharedSubStream<S> {
    source: Weak<Mutex<S>>,
    region_start: u64,
    region_len: u64,
    buffer_capacity: usize,
    buffer: Vec<u8>,
    // Offsets below are relative to `region_start`.
    buffer_start: u64,
    position: u64,
}

impl<S: Read + Seek> SharedSubStream<S> {
    pub(crate) fn new(
        source: Weak<Mutex<S>>,
        region_start: u64,
        region_len: u64,
        buffer_capacity: usize,
    ) -> Self {
        Self {
            source,
            region_start,
            region_len,
            buffer_capacity: buffer_capacity.max(1),
            buffer: Vec::new(),
            buffer_start: 0,
            position: 0,
        }
    }

    /// Returns the absolute byte range of the region in the source.
    pub fn region(&self) -> Range<u64> {
        self.region_start..self.region_start + self.region_len
    }

    /// Returns the region length.
    pub fn len(&self) -> u64 {
        self.region_len
    }

    /// Returns true if the region is empty.
    pub fn is_empty(&self) -> bool {
        self.region_len == 0
    }

    /// Returns the current position within the region.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the region-relative range currently held in the buffer.
    pub fn buffered(&self) -> Range<u64> {
        self.buffer_start..self.buffer_end()
    }

    fn buffer_end(&self) -> u64 {
        self.buffer_start + self.buffer.len() as u64
    }

    fn covers(&self, pos: u64, len: usize) -> bool {
        pos >= self.buffer_start && pos + len as u64 <= self.buffer_end()
    }

    fn lock_source<T>(&self, f: impl FnOnce(&mut S) -> io::Result<T>) -> io::Result<T> {
        let source = self.source.upgrade().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "shared source stream was dropped")
        })?;
        let mut stream = source.lock();
        f(&mut stream)
    }

    /// Makes at least `want` bytes from the current position available,
    /// unless the source ends first.
    fn refill(&mut self, want: usize) -> io::Result<()> {
        if self.position >= self.buffer_start && self.position <= self.buffer_end() {
            // Keep the unread tail and read on from the end of the buffer.
            let consumed = (self.position - self.buffer_start) as usize;
            self.buffer.drain(..consumed);
        } else {
            self.buffer.clear();
        }
        self.buffer_start = self.position;

        let fill_from = self.buffer_end();
        let missing = want.saturating_sub(self.buffer.len());
        let region_left = self.region_len - fill_from;
        let limit = (self.buffer_capacity.max(missing) as u64).min(region_left) as usize;
        let absolute = self.region_start + fill_from;

        let mut buffer = std::mem::take(&mut self.buffer);
        let result = self.lock_source(|stream| {
            stream.seek(SeekFrom::Start(absolute))?;
            read_up_to(stream, &mut buffer, limit)
        });
        self.buffer = buffer;
        result.map(|_| ())
    }
}

impl<S: Read + Seek> Read for SharedSubStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.region_len.saturating_sub(self.position);
        let want = (buf.len() as u64).min(remaining) as usize;
        if want == 0 {
            return Ok(0);
        }

        if !self.covers(self.position, want) {
            self.refill(want)?;
        }

        let start = (self.position - self.buffer_start) as usize;
        let n = want.min(self.buffer.len() - start);
        buf[..n].copy_from_slice(&self.buffer[start..start + n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl<S: Read + Seek> Seek for SharedSubStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.region_len) + i128::from(delta),
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of substream",
            ));
        }
        let target = target.min(i128::from(self.region_len)) as u64;

        if target >= self.buffer_start && target < self.buffer_end() {
            self.position = target;
            return Ok(target);
        }

        let absolute = self.region_start + target;
        self.lock_source(|stream| stream.seek(SeekFrom::Start(absolute)).map(|_| ()))?;
        self.buffer.clear();
        self.buffer_start = target;
        self.position = target;
        Ok(target)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

impl<S> std::fmt::Debug for SharedSubStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSubStream")
            .field("region_start", &self.region_start)
            .field("region_len", &self.region_len)
            .field("buffer_start", &self.buffer_start)
            .field("buffered", &self.buffer.len())
            .field("position", &self.position)
            .finish()
    }
}
