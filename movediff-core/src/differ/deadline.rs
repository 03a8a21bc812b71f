//! Cooperative cancellation between diff phases.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{DiffError, Result};

/// Optional time limit plus a shared cancel flag.
///
/// Checked only between phases; a phase that has started always runs to
/// completion.
#[derive(Clone, Debug, Default)]
pub struct Deadline {
    expires: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// Never expires unless cancelled.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn after(timeout: Duration) -> Self {
        Self {
            expires: Some(Instant::now() + timeout),
            cancelled: Arc::default(),
        }
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map(Self::after).unwrap_or_default()
    }

    /// Share an existing cancel flag, e.g. one owned by a caller's UI thread.
    pub fn with_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_expired(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.expires.is_some_and(|at| Instant::now() >= at)
    }

    /// Fail with [`DiffError::Cancelled`] naming the phase that just ended.
    pub fn check(&self, phase: &'static str) -> Result<()> {
        if self.is_expired() {
            tracing::warn!("Diff cancelled after {}", phase);
            return Err(DiffError::Cancelled { phase });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_deadline_never_expires() {
        let deadline = Deadline::none();
        assert!(deadline.check("pairing").is_ok());
    }

    #[test]
    fn test_cancel_flag_trips_check() {
        let deadline = Deadline::none();
        let flag = deadline.cancel_flag();
        flag.store(true, Ordering::Relaxed);

        let err = deadline.check("top-down").unwrap_err();
        assert!(matches!(err, DiffError::Cancelled { phase: "top-down" }));
    }

    #[test]
    fn test_zero_timeout_expires() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.is_expired());
        assert!(Deadline::from_timeout(None).check("pairing").is_ok());
    }
}
