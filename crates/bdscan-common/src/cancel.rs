//! Cooperative cancellation for disc scans.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag checked between scanned items.
///
/// Clones share the same flag, so a UI thread can hold one clone and call
/// [`CancelToken::cancel`] while the scanning thread polls another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// The underlying flag, for callers that already speak `AtomicBool`.
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}
