//! Error types for blobchunk.
//!
//! - [`EndpointError`] - What a single remote call can fail with
//! - [`TransferError`] - Fatal failure of a whole transfer

use std::io;

/// Boxed error type carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// HTTP status used by the service for failed conditional requests.
pub const STATUS_PRECONDITION_FAILED: u16 = 412;

/// Errors returned by a [`RemoteBlobEndpoint`](crate::RemoteBlobEndpoint) call.
///
/// Transport and service errors are transient and retried by the transfer
/// engine. A failed condition is never retried: resending the same stale
/// condition cannot succeed.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The request never produced a service response.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The service answered with a failure status.
    #[error("service error {status}: {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Service-supplied error description.
        message: String,
    },

    /// An ETag, append-position or max-size condition did not hold.
    #[error("condition not satisfied: {0}")]
    ConditionNotSatisfied(String),
}

impl EndpointError {
    /// Wraps any error as a transport failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        EndpointError::Transport(err.into())
    }

    /// Maps a failure status to an error, treating 412 as a failed condition.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == STATUS_PRECONDITION_FAILED {
            EndpointError::ConditionNotSatisfied(message)
        } else {
            EndpointError::Service { status, message }
        }
    }

    /// Returns true if resending the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, EndpointError::ConditionNotSatisfied(_))
    }
}

/// Errors that abort a transfer.
///
/// There is no partial-success result: any of these ends the transfer, and
/// blocks already staged for a block blob stay uncommitted.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The transfer was misconfigured or a chunk broke a blob-type rule.
    /// Raised before any request for the offending chunk is sent.
    #[error("precondition violated: {message}")]
    PreconditionViolation {
        /// Description of the violated rule.
        message: String,
    },

    /// A chunk kept failing with transient errors.
    #[error("chunk at offset {offset} failed after {attempts} attempts")]
    RetriesExhausted {
        /// Destination offset of the failing chunk.
        offset: u64,
        /// Number of requests issued for the chunk.
        attempts: u32,
        /// The last error returned by the endpoint.
        #[source]
        source: EndpointError,
    },

    /// The service rejected a conditional write for a chunk.
    #[error("condition not satisfied for chunk at offset {offset}: {message}")]
    ConditionNotSatisfied {
        /// Destination offset of the failing chunk.
        offset: u64,
        /// Service-supplied description.
        message: String,
    },

    /// The streaming cipher was used after finalization.
    #[error("encoding error: {message}")]
    Encoding {
        /// Description of the misuse.
        message: &'static str,
    },

    /// Reading the source stream failed.
    #[error("source read failed at offset {offset}: {source}")]
    Io {
        /// Offset of the chunk being read.
        offset: u64,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The final block list commit was rejected.
    #[error("block list commit failed: {source}")]
    Commit {
        /// Error returned by the endpoint.
        #[source]
        source: EndpointError,
    },

    /// The caller aborted the transfer before the chunk was dispatched.
    #[error("transfer aborted before chunk at offset {offset}")]
    Aborted {
        /// Offset of the first chunk that was not dispatched.
        offset: u64,
    },
}

impl TransferError {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        TransferError::PreconditionViolation {
            message: message.into(),
        }
    }

    pub(crate) fn io(offset: u64, source: io::Error) -> Self {
        TransferError::Io { offset, source }
    }

    /// Returns the offset of the chunk the error belongs to, if any.
    pub fn offset(&self) -> Option<u64> {
        match self {
            TransferError::RetriesExhausted { offset, .. }
            | TransferError::ConditionNotSatisfied { offset, .. }
            | TransferError::Io { offset, .. }
            | TransferError::Aborted { offset } => Some(*offset),
            _ => None,
        }
    }
}
