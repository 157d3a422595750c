use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{Result, VariorumError};

/// Shared cancellation flag for one render job.
///
/// The task manager trips the flag; the change-list builder and the
/// streaming renderer poll it at batch boundaries so a canceled job stops
/// without emitting or caching a partial result.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    canceled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Error out of the current pass if cancellation was requested
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_canceled() {
            Err(VariorumError::Canceled)
        } else {
            Ok(())
        }
    }
}
