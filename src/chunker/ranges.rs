//! Chunk range computation for sources of known length.

use std::ops::Range;

/// Splits `length` bytes into consecutive ranges of `chunk_size` bytes.
///
/// The last range holds the remainder. Parallel workers need their
/// boundaries up front, so ranges are computed from the length rather than
/// discovered by reading.
///
/// # Example
///
/// ```
/// use blobchunk::chunk_ranges;
///
/// let ranges: Vec<_> = chunk_ranges(26, 10).collect();
/// assert_eq!(ranges, vec![0..10, 10..20, 20..26]);
/// ```
pub fn chunk_ranges(length: u64, chunk_size: u32) -> impl Iterator<Item = Range<u64>> {
    let step = u64::from(chunk_size.max(1));
    (0..length)
        .step_by(step as usize)
        .map(move |start| start..(start + step).min(length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(chunk_ranges(0, 4).count(), 0);
    }

    #[test]
    fn test_exact_multiple() {
        let ranges: Vec<_> = chunk_ranges(12, 4).collect();
        assert_eq!(ranges, vec![0..4, 4..8, 8..12]);
    }

    #[test]
    fn test_remainder() {
        let ranges: Vec<_> = chunk_ranges(26, 5).collect();
        assert_eq!(ranges.len(), 6);
        assert_eq!(ranges.last(), Some(&(25..26)));
    }

    #[test]
    fn test_ranges_cover_length() {
        for length in [1u64, 7, 64, 1000, 4097] {
            for size in [1u32, 3, 64, 4096] {
                let total: u64 = chunk_ranges(length, size).map(|r| r.end - r.start).sum();
                assert_eq!(total, length);
            }
        }
    }
}
