//! Splitting a source into upload chunks.
//!
//! - [`ChunkSequencer`] - Lazy iterator of fixed-size chunks from a reader
//! - [`chunk_ranges`] - Precomputed chunk ranges for parallel workers

mod ranges;
mod sequencer;

pub use ranges::chunk_ranges;
pub use sequencer::ChunkSequencer;
