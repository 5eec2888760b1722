//! Commit tokens returned by chunk uploads.

use std::fmt;

/// The result of uploading one chunk.
///
/// Tokens are kept in source-offset order regardless of the order in which
/// uploads complete.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommitToken {
    /// A staged block, committed later by id.
    BlockId(String),

    /// A committed page write.
    PageCommit {
        /// ETag returned by the service for the write.
        etag: String,
    },

    /// A committed append.
    AppendCommit {
        /// Blob length after the append; the position condition for the next one.
        next_offset: u64,
    },
}

impl CommitToken {
    /// Returns the block id, if this is a block token.
    pub fn block_id(&self) -> Option<&str> {
        match self {
            CommitToken::BlockId(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the ETag, if this is a page token.
    pub fn etag(&self) -> Option<&str> {
        match self {
            CommitToken::PageCommit { etag } => Some(etag),
            _ => None,
        }
    }

    /// Returns the next append offset, if this is an append token.
    pub fn next_offset(&self) -> Option<u64> {
        match self {
            CommitToken::AppendCommit { next_offset } => Some(*next_offset),
            _ => None,
        }
    }
}

impl fmt::Display for CommitToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitToken::BlockId(id) => write!(f, "block {}", id),
            CommitToken::PageCommit { etag } => write!(f, "page etag {}", etag),
            CommitToken::AppendCommit { next_offset } => write!(f, "append next {}", next_offset),
        }
    }
}
