#![no_main]

use std::io::{Cursor, Read, Seek, SeekFrom};

use blobchunk::SharedSource;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u16, u16, u8, Vec<u16>, Vec<u8>)| {
    let (offset, length, capacity, ops, data) = input;
    let source = SharedSource::new(Cursor::new(data.as_slice())).unwrap();
    let mut sub = source.substream(u64::from(offset), u64::from(length), usize::from(capacity));

    // The region clamped to what the source holds
    let start = usize::from(offset).min(data.len());
    let end = (usize::from(offset) + usize::from(length)).min(data.len());
    let expected = &data[start..end];

    // Verify: random seeks and reads always agree with the source bytes
    for op in ops {
        if op & 1 == 0 {
            let target = u64::from(op >> 1) % (u64::from(length) + 1);
            assert_eq!(sub.seek(SeekFrom::Start(target)).unwrap(), target);
        } else {
            let pos = sub.stream_position().unwrap() as usize;
            let mut buf = vec![0u8; usize::from(op >> 1) % 64];
            let n = sub.read(&mut buf).unwrap();
            let from = pos.min(expected.len());
            let to = (pos + n).min(expected.len());
            assert_eq!(&buf[..n], &expected[from..to]);
        }
    }
});
