#![no_main]

use std::io::Cursor;

use blobchunk::{BlobKind, ChunkSequencer, MemoryEndpoint, TransferCoordinator, TransferSpec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, u8, Vec<u8>)| {
    let (chunk_size, parallelism, data) = input;
    let chunk_size = usize::from(chunk_size).max(1);

    // Verify: chunks tile the input with no gaps
    let chunks: Vec<_> = ChunkSequencer::new(Cursor::new(data.as_slice()), chunk_size)
        .collect::<Result<_, _>>()
        .unwrap();
    let mut expected_offset = 0u64;
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.offset, expected_offset);
        assert!(!chunk.is_empty());
        assert!(chunk.len() <= chunk_size);
        if i < chunks.len() - 1 {
            assert_eq!(chunk.len(), chunk_size);
        }
        expected_offset += chunk.len() as u64;
    }
    assert_eq!(expected_offset, data.len() as u64);

    // Verify: a block upload reassembles the input at any parallelism
    let endpoint = MemoryEndpoint::new();
    let spec = TransferSpec::new(BlobKind::Block)
        .with_chunk_size(chunk_size as u32)
        .with_parallelism(u32::from(parallelism % 8).max(1));
    TransferCoordinator::new(&endpoint, spec)
        .upload(Cursor::new(data.as_slice()))
        .unwrap();
    assert_eq!(&endpoint.content()[..], data.as_slice());
});
