//! Process-wide shutdown coordination
//!
//! A single coordinator owns the root cancellation token. Supervisors
//! register for a child token; cancelling the root reaches every supervisor,
//! every cycle and every session exactly once, while a per-cycle token can
//! still be cancelled on its own without touching other accounts.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    root: CancellationToken,
    triggered: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for one supervisor. Cancelled when shutdown is triggered.
    pub fn register(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Trigger shutdown. Returns `true` only for the call that fired it.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return false;
        }
        info!("shutdown triggered, closing all sessions");
        self.root.cancel();
        true
    }
}
