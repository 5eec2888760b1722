//! Fixed-wait retry of a single chunk.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::{EndpointError, TransferError};

/// Retries transient failures of one request with a fixed wait.
///
/// Only the calling thread sleeps; other workers keep uploading.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    max_retries: u32,
    wait: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(max_retries: u32, wait: Duration) -> Self {
        Self { max_retries, wait }
    }

    /// Runs `op` until it succeeds, fails with an error that is not
    /// [retryable](EndpointError::is_retryable), or has been retried
    /// `max_retries` times.
    pub(crate) fn run<T>(
        &self,
        offset: u64,
        mut op: impl FnMut() -> Result<T, EndpointError>,
    ) -> Result<T, TransferError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => {
                    return Err(match err {
                        EndpointError::ConditionNotSatisfied(message) => {
                            TransferError::ConditionNotSatisfied { offset, message }
                        }
                        source => TransferError::RetriesExhausted {
                            offset,
                            attempts,
                            source,
                        },
                    });
                }
                Err(source) if attempts > self.max_retries => {
                    return Err(TransferError::RetriesExhausted {
                        offset,
                        attempts,
                        source,
                    });
                }
                Err(err) => {
                    warn!(
                        offset,
                        attempt = attempts,
                        max_retries = self.max_retries,
                        error = %err,
                        "chunk upload failed, retrying"
                    );
                    if !self.wait.is_zero() {
                        thread::sleep(self.wait);
                    }
                }
            }
        }
    }
}
