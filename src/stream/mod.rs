//! Shared access to one source stream from many readers.
//!
//! Parallel uploads read disjoint regions of a single source that is not
//! itself thread-safe. The source is placed behind one lock and each worker
//! gets its own bounded, buffered window over it:
//!
//! - [`SharedSource`] - Owns the lock-guarded source and hands out windows
//! - [`SharedSubStream`] - A seekable `Read` over one region of the source

mod source;
mod substream;

pub use source::SharedSource;
pub use substream::SharedSubStream;
