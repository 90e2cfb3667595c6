//! Pending delayed work owned by a session.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;

type Handles = Arc<Mutex<HashMap<u64, AbortHandle>>>;

fn lock(handles: &Handles) -> MutexGuard<'_, HashMap<u64, AbortHandle>> {
    handles.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Delayed tasks that can all be cancelled at once.
///
/// Used for the progress grace clear and the launch transition. A reset or
/// teardown calls [`cancel_all`](PendingTimers::cancel_all) so no timer
/// fires into a session that no longer exists.
#[derive(Debug, Default)]
pub struct PendingTimers {
    next_id: AtomicU64,
    handles: Handles,
}

impl PendingTimers {
    /// Create an empty timer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` after `delay`.
    ///
    /// Returns the timer id, or `None` when called outside a Tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, work: F) -> Option<u64>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime available, dropping timer");
            return None;
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handles = self.handles.clone();

        // Hold the lock across spawn so the task cannot deregister before it is registered
        let mut pending = lock(&self.handles);
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
            lock(&handles).remove(&id);
        });
        pending.insert(id, task.abort_handle());
        tracing::trace!(id, delay_ms = delay.as_millis() as u64, "Scheduled timer");
        Some(id)
    }

    /// Cancel one timer. Returns whether it was still pending.
    pub fn cancel(&self, id: u64) -> bool {
        match lock(&self.handles).remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = lock(&self.handles).drain().collect();
        for (_, handle) in &drained {
            handle.abort();
        }
        if !drained.is_empty() {
            tracing::debug!(cancelled = drained.len(), "Cancelled pending timers");
        }
        drained.len()
    }

    /// Number of timers that have not fired yet.
    pub fn pending(&self) -> usize {
        lock(&self.handles).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn test_timer_fires_and_deregisters() {
        let timers = PendingTimers::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        timers.schedule(Duration::from_millis(5), async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(timers.pending(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(timers.pending(), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_prevents_firing() {
        let timers = PendingTimers::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        timers.schedule(Duration::from_millis(20), async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(timers.cancel_all(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_schedule_without_runtime() {
        let timers = PendingTimers::new();
        assert!(timers.schedule(Duration::from_millis(1), async {}).is_none());
    }
}
