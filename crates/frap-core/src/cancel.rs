use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{FrapError, Result};

/// Cooperative cancellation flag shared between a caller and a running analysis.
///
/// Cloning yields a handle to the same flag. Long-running loops poll it at
/// each per-pixel, per-frame or per-region boundary.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Returns `Err(FrapError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FrapError::Cancelled)
        } else {
            Ok(())
        }
    }
}
