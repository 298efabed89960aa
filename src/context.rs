//! Cancellable operation context handed to `resolve` calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

/// Cancellation and deadline handle for one resolution operation.
///
/// The caller is the sole cancellation authority: resolvers only ever
/// observe the context, they never cancel it. Cloning the handle shares
/// the underlying state, so any clone can cancel all of them.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    inner: Arc<ContextState>,
}

#[derive(Debug)]
struct ContextState {
    cancelled: AtomicBool,
    notify: Notify,
    deadline: Option<Instant>,
}

impl ResolveContext {
    /// Create a context with no deadline.
    pub fn new() -> Self {
        Self::with_state(None)
    }

    /// Create a context that counts as cancelled once `timeout` has passed.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self::with_state(Some(Instant::now() + timeout))
    }

    fn with_state(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(ContextState {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
                deadline,
            }),
        }
    }

    /// Request cancellation and wake every waiter.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::Release) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Whether cancellation was requested or the deadline has passed.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        match self.inner.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Suspend until the context is cancelled.
    ///
    /// Returns immediately if already cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register interest before the flag check so a cancel landing
            // in between still wakes this waiter.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            match self.inner.deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(deadline.into()) => return,
                    }
                }
                None => notified.await,
            }
            if self.is_cancelled() {
                return;
            }
        }
    }
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new()
    }
}
