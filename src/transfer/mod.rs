//! Driving a chunked transfer end to end.
//!
//! - [`TransferCoordinator`] - Validates, dispatches, and commits one transfer
//! - [`TransferState`] - Where a coordinator is in its lifecycle
//! - [`ProgressSink`] - Receives byte-count updates
//! - [`AbortHandle`] - Stops dispatching further chunks

mod coordinator;
mod dispatch;
mod progress;
mod retry;
mod state;

pub use coordinator::{AbortHandle, TransferCoordinator, TransferOutcome};
pub use progress::ProgressSink;
pub use state::TransferState;
