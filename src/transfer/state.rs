//! Transfer lifecycle states.

use std::fmt;

use tracing::trace;

/// The lifecycle of a [`TransferCoordinator`](super::TransferCoordinator).
///
/// ```text
/// Idle -> Splitting -> SequentialDispatch -> Committing -> Done
///                   \-> ParallelDispatch  -/
/// ```
///
/// `Failed` is reachable from every state except `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    /// Nothing has happened yet.
    Idle,
    /// Validating settings and preparing the source.
    Splitting,
    /// Uploading chunks one at a time on the calling thread.
    SequentialDispatch,
    /// Uploading chunks on a bounded worker pool.
    ParallelDispatch,
    /// Committing the uploaded chunks.
    Committing,
    /// The transfer succeeded.
    Done,
    /// The transfer was aborted by an error.
    Failed,
}

impl TransferState {
    /// Returns true for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Done | TransferState::Failed)
    }

    /// Returns true if `next` may follow `self`.
    pub fn can_advance_to(self, next: TransferState) -> bool {
        use TransferState::*;
        match (self, next) {
            (Idle, Splitting) => true,
            (Splitting, SequentialDispatch | ParallelDispatch) => true,
            (SequentialDispatch | ParallelDispatch, Committing) => true,
            (Committing, Done) => true,
            (Idle, Failed) => false,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    pub(crate) fn advance(&mut self, next: TransferState) {
        debug_assert!(
            self.can_advance_to(next),
            "illegal transfer transition {} -> {}",
            self,
            next
        );
        trace!(from = %self, to = %next, "transfer state");
        *self = next;
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferState::Idle => "idle",
            TransferState::Splitting => "splitting",
            TransferState::SequentialDispatch => "sequential-dispatch",
            TransferState::ParallelDispatch => "parallel-dispatch",
            TransferState::Committing => "committing",
            TransferState::Done => "done",
            TransferState::Failed => "failed",
        };
        f.write_str(name)
    }
}
