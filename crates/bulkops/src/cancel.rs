//! Cooperative cancellation shared by every bulk operation.
//!
//! A [`CancellationToken`] is polled, never awaited by force: long-running
//! loops call [`CancellationToken::should_stop`] once per processed entity and
//! return early with their partial count. Each `reset` starts a new epoch
//! with a fresh [`EpochSignal`]; signals handed out for earlier epochs stay
//! fired, so readers still holding one simply observe "stopped".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Notify;
use tracing::debug;

/// One-shot broadcast signal for a single cancellation epoch.
///
/// Firing is idempotent: only the first call flips the flag and wakes
/// waiters, later calls are no-ops.
#[derive(Debug)]
pub struct EpochSignal {
    epoch: u64,
    fired: AtomicBool,
    notify: Notify,
}

impl EpochSignal {
    fn new(epoch: u64) -> Self {
        Self {
            epoch,
            fired: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Epoch number this signal belongs to
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether cancellation was requested during this epoch
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Returns `true` only for the call that actually fired the signal.
    fn fire(&self) -> bool {
        let first = !self.fired.swap(true, Ordering::AcqRel);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    /// Resolves once this epoch has been cancelled.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent fire cannot be missed.
        notified.as_mut().enable();
        if self.is_fired() {
            return;
        }
        notified.await;
    }
}

/// Process-wide cooperative cancellation token.
///
/// Constructed once at startup and shared through `Arc`; tests build their
/// own instances.
#[derive(Debug)]
pub struct CancellationToken {
    running: AtomicBool,
    signal: RwLock<Arc<EpochSignal>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Create a running token at epoch 0
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            signal: RwLock::new(Arc::new(EpochSignal::new(0))),
        }
    }

    /// Thread-safe read of the running flag
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop every operation polling this token.
    ///
    /// Calling this again within the same epoch is a no-op.
    pub fn request_cancel_all(&self) {
        // Read lock keeps a concurrent reset from swapping the signal mid-cancel.
        let signal = self.signal.read().unwrap_or_else(PoisonError::into_inner);
        self.running.store(false, Ordering::Release);
        if signal.fire() {
            debug!(epoch = signal.epoch(), "cancellation requested");
        } else {
            debug!(epoch = signal.epoch(), "cancellation already requested");
        }
    }

    /// Start a new epoch with a fresh, unfired signal.
    pub fn reset(&self) {
        let mut signal = self.signal.write().unwrap_or_else(PoisonError::into_inner);
        let next = signal.epoch() + 1;
        *signal = Arc::new(EpochSignal::new(next));
        self.running.store(true, Ordering::Release);
        debug!(epoch = next, "cancellation token reset");
    }

    /// True once the current epoch is cancelled or the token is not running.
    pub fn should_stop(&self) -> bool {
        self.signal().is_fired() || !self.is_running()
    }

    /// Signal of the current epoch
    pub fn signal(&self) -> Arc<EpochSignal> {
        Arc::clone(&self.signal.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Current epoch number, incremented by every `reset`
    pub fn epoch(&self) -> u64 {
        self.signal().epoch()
    }
}
