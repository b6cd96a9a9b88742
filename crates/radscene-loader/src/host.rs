//! The interface a loader needs from its environment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::diagnostics::Diagnostic;

/// Environment hooks for a load.
///
/// Both pipeline workers call into the host, so it must be shareable across
/// threads. All methods have no-op defaults.
pub trait LoadHost: Sync {
    /// Polled periodically by both workers.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Called once a worker has observed cancellation and stopped.
    fn abort(&self) {}

    /// Receives each unique diagnostic once, after the load completes.
    fn report(&self, _diagnostic: &Diagnostic) {}
}

/// Host that never cancels and drops diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

impl LoadHost for NoopHost {}

/// Shared cancellation flag.
///
/// Clones share the same flag, so a UI thread can keep one and hand another
/// to the loader.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl LoadHost for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }

    fn abort(&self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_clones_share_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
        assert!(LoadHost::is_cancelled(&other));
    }

    #[test]
    fn test_noop_host() {
        let host = NoopHost;
        assert!(!host.is_cancelled());
        host.abort();
    }
}
