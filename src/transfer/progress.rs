//! Progress reporting.

use parking_lot::Mutex;

/// Receives progress updates during a transfer.
///
/// `completed` counts payload bytes sent so far; `total` is the expected
/// number of bytes, if known. Reports may come from worker threads.
pub trait ProgressSink: Send + Sync {
    /// Called once before the first chunk and after every uploaded chunk.
    fn report(&self, completed: u64, total: Option<u64>);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, Option<u64>) + Send + Sync,
{
    fn report(&self, completed: u64, total: Option<u64>) {
        self(completed, total)
    }
}

/// Running byte count shared by all workers of a transfer.
///
/// The sink is called while the count lock is held, so reports arrive in
/// non-decreasing order even when workers finish concurrently.
pub(crate) struct ProgressState<'a> {
    completed: Mutex<u64>,
    total: Option<u64>,
    sink: Option<&'a dyn ProgressSink>,
}

impl<'a> ProgressState<'a> {
    pub(crate) fn new(total: Option<u64>, sink: Option<&'a dyn ProgressSink>) -> Self {
        Self {
            completed: Mutex::new(0),
            total,
            sink,
        }
    }

    /// Reports the starting point.
    pub(crate) fn start(&self) {
        if let Some(sink) = self.sink {
            let completed = self.completed.lock();
            sink.report(*completed, self.total);
        }
    }

    /// Adds `bytes` and reports the new total.
    pub(crate) fn advance(&self, bytes: u64) -> u64 {
        let mut completed = self.completed.lock();
        *completed += bytes;
        if let Some(sink) = self.sink {
            sink.report(*completed, self.total);
        }
        *completed
    }

    pub(crate) fn completed(&self) -> u64 {
        *self.completed.lock()
    }
}
