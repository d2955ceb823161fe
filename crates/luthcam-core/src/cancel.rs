//! Cooperative cancellation.

use crate::error::PlanError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag polled by long-running stages.
///
/// Clones observe the same flag, so a supervisor can keep one handle and
/// pass another into the worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns `PlanError::Cancelled` once the flag is set.
    pub fn check(&self) -> Result<(), PlanError> {
        if self.is_cancelled() {
            Err(PlanError::Cancelled)
        } else {
            Ok(())
        }
    }
}
