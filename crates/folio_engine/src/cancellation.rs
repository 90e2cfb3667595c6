//! Cancellation Registry and commit gate.

use folio_core::Stage;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct CancelState {
    session: CancellationToken,
    generation: CancellationToken,
    stages: HashMap<(u32, Stage), CancellationToken>,
}

impl CancelState {
    fn new() -> Self {
        let session = CancellationToken::new();
        let generation = session.child_token();
        Self {
            session,
            generation,
            stages: HashMap::new(),
        }
    }
}

/// Hierarchy of cancellation tokens plus a table of in-flight stages.
///
/// ```text
/// session
/// └── generation root (replaced by every abort_all)
///     └── batch
///         └── stage (page, beat | persona | image)
/// ```
///
/// Cancelling a token cancels everything below it. Every store mutation
/// made on behalf of a batch goes through [`commit_if_live`], which checks
/// the token under the same lock that [`abort_all`] holds, so nothing lands
/// after `abort_all` returns.
///
/// [`commit_if_live`]: CancellationRegistry::commit_if_live
/// [`abort_all`]: CancellationRegistry::abort_all
#[derive(Debug)]
pub struct CancellationRegistry {
    state: Mutex<CancelState>,
}

impl Default for CancellationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationRegistry {
    /// Create a registry with a fresh session.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CancelState::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CancelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Token cancelled by `reset_session` or teardown.
    pub fn session_token(&self) -> CancellationToken {
        self.lock().session.clone()
    }

    /// Token cancelled by the next `abort_all`.
    pub fn generation_token(&self) -> CancellationToken {
        self.lock().generation.clone()
    }

    /// Create the token for a new batch under the current generation root.
    pub fn begin_batch(&self) -> CancellationToken {
        self.lock().generation.child_token()
    }

    /// Register a stage token under `batch`.
    pub fn begin(&self, page: u32, stage: Stage, batch: &CancellationToken) -> CancellationToken {
        let token = batch.child_token();
        self.lock().stages.insert((page, stage), token.clone());
        tracing::trace!(page, %stage, "Registered stage token");
        token
    }

    /// Remove a finished stage.
    ///
    /// Only live tokens are removed: a cancelled token has already been
    /// dropped from the table, and the key may belong to a newer batch.
    pub fn end(&self, page: u32, stage: Stage, token: &CancellationToken) {
        if token.is_cancelled() {
            return;
        }
        self.lock().stages.remove(&(page, stage));
    }

    /// Cancel a single in-flight stage. Returns whether it was found.
    pub fn cancel(&self, page: u32, stage: Stage) -> bool {
        match self.lock().stages.remove(&(page, stage)) {
            Some(token) => {
                token.cancel();
                tracing::debug!(page, %stage, "Cancelled stage");
                true
            }
            None => false,
        }
    }

    /// Cancel every outstanding operation and clear the table.
    ///
    /// Returns the number of stages that were in flight.
    pub fn abort_all(&self, reason: &str) -> usize {
        self.abort_all_with(reason, || ()).0
    }

    /// Like [`abort_all`](Self::abort_all), running `f` before the lock is released.
    pub fn abort_all_with<R>(&self, reason: &str, f: impl FnOnce() -> R) -> (usize, R) {
        let mut state = self.lock();
        state.generation.cancel();
        let in_flight = state.stages.len();
        for (_, token) in state.stages.drain() {
            token.cancel();
        }
        state.generation = state.session.child_token();
        tracing::info!(reason, in_flight, "Aborted all generation");
        (in_flight, f())
    }

    /// Cancel the whole session and start a new one, running `f` under the lock.
    pub fn reset_session_with<R>(&self, f: impl FnOnce() -> R) -> R {
        let mut state = self.lock();
        state.session.cancel();
        state.stages.clear();
        *state = CancelState::new();
        tracing::info!("Reset cancellation session");
        f()
    }

    /// Cancel the whole session and start a new one.
    pub fn reset_session(&self) {
        self.reset_session_with(|| ());
    }

    /// Run `f` only while `token` is live, atomically with respect to aborts.
    pub fn commit_if_live<R>(&self, token: &CancellationToken, f: impl FnOnce() -> R) -> Option<R> {
        let _state = self.lock();
        if token.is_cancelled() {
            tracing::debug!("Discarding result from cancelled operation");
            return None;
        }
        Some(f())
    }

    /// Number of stages currently registered.
    pub fn in_flight(&self) -> usize {
        self.lock().stages.len()
    }
}
