//! Internal utility functions and helpers.
//!
//! This module contains small helper functions used throughout the crate.
//! It is an implementation detail and not part of the public API.

use std::io::{self, Read, Seek, SeekFrom};

use bytes::{Bytes, BytesMut};

/// Reads from `reader` into `buf` until `limit` bytes were appended or the
/// reader is exhausted. Returns the number of bytes appended.
///
/// A short count means end of stream; interrupted reads are retried.
pub(crate) fn read_up_to<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> io::Result<usize> {
    let start = buf.len();
    buf.resize(start + limit, 0);
    let mut filled = 0;

    while filled < limit {
        match reader.read(&mut buf[start + filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                buf.truncate(start + filled);
                return Err(e);
            }
        }
    }

    buf.truncate(start + filled);
    Ok(filled)
}

/// Returns the bytes between the current position and the end of `stream`,
/// leaving the position unchanged.
pub(crate) fn remaining_len<S: Seek + ?Sized>(stream: &mut S) -> io::Result<u64> {
    let position = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(position))?;
    Ok(end.saturating_sub(position))
}

/// Joins payloads into one contiguous buffer.
///
/// A single part is returned as-is without copying.
pub(crate) fn concat_bytes(parts: Vec<Bytes>) -> Bytes {
    if parts.len() == 1 {
        return parts.into_iter().next().unwrap_or_default();
    }
    let total = parts.iter().map(Bytes::len).sum();
    let mut combined = BytesMut::with_capacity(total);
    for part in parts {
        combined.extend_from_slice(&part);
    }
    combined.freeze()
}
