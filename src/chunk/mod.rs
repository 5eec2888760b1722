//! Chunk types.
//!
//! - [`Chunk`] - One slice of the source with its destination offset
//! - [`CommitToken`] - Per-chunk upload result used to commit or chain the transfer

mod data;
mod token;

pub use data::Chunk;
pub use token::CommitToken;
