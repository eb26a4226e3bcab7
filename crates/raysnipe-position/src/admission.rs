//! Single-position admission lock.
//!
//! A process-wide gate ensuring at most one position is open at a time.
//! Contention is resolved by rejection, not queueing: a caller that finds
//! the lock open drops its pool-creation signal.
//!
//! Closing the lock is also the monitor's sole cancellation signal.
//! Waiters use [`AdmissionLock::wait_closed`] — an explicit notification
//! fired by whichever path closes the lock — rather than polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug)]
struct LockInner {
    open: AtomicBool,
    closed: Notify,
}

/// Shared single-position gate with get/set semantics.
///
/// Invariants:
/// - opened only by the lifecycle controller after a confirmed entry swap;
/// - closed by the monitor's terminal paths, and never left open when the
///   monitor exits (see [`ReleaseGuard`]).
#[derive(Debug, Clone)]
pub struct AdmissionLock {
    inner: Arc<LockInner>,
}

impl AdmissionLock {
    /// New lock, initially closed.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LockInner {
                open: AtomicBool::new(false),
                closed: Notify::new(),
            }),
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// Set the gate. Closing wakes every [`wait_closed`](Self::wait_closed)
    /// waiter; closing an already-closed lock is a no-op apart from the
    /// wakeup.
    pub fn set_open(&self, open: bool) {
        let was = self.inner.open.swap(open, Ordering::AcqRel);
        if was != open {
            debug!(open, "Admission lock changed");
        }
        if !open {
            self.inner.closed.notify_waiters();
        }
    }

    /// Resolve once the lock is closed. Returns immediately when it already
    /// is. `notify_waiters` wakes only registered waiters and stores no
    /// permit, so the waiter is enabled before the flag check: a close
    /// landing between the check and the await still wakes it.
    pub async fn wait_closed(&self) {
        loop {
            let notified = self.inner.closed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_open() {
                return;
            }
            notified.as_mut().await;
        }
    }
}

impl Default for AdmissionLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope guard closing the admission lock on drop.
///
/// Held by the vault monitor for its whole run so that every exit path —
/// normal termination, abort, or panic — leaves the lock closed.
#[derive(Debug)]
pub struct ReleaseGuard {
    lock: AdmissionLock,
}

impl ReleaseGuard {
    pub fn new(lock: AdmissionLock) -> Self {
        Self { lock }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.lock.set_open(false);
    }
}
