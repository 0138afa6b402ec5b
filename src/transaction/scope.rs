use super::TransactionHandle;
use crate::core::Result;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{Level, event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Finished, or never started.
    Idle,
    /// This scope began the transaction and owns its outcome.
    Active,
    /// A transaction was already active; boundaries are left to its owner.
    Joined,
}

/// One begin → commit/rollback span.
///
/// Holds the context's transaction lock for its whole lifetime, so boundary
/// transitions from different threads never interleave. The lock is
/// re-entrant: a thread already inside a scope may open another, which then
/// joins.
pub struct TransactionScope<'a> {
    handle: &'a dyn TransactionHandle,
    state: ScopeState,
    _guard: ReentrantMutexGuard<'a, ()>,
}

impl<'a> TransactionScope<'a> {
    pub fn begin(handle: &'a dyn TransactionHandle, lock: &'a ReentrantMutex<()>) -> Result<Self> {
        let guard = lock.lock();

        let state = if handle.is_active() {
            ScopeState::Joined
        } else {
            handle.begin()?;
            ScopeState::Active
        };
        event!(Level::TRACE, state = ?state, "transaction scope opened");

        Ok(Self {
            handle,
            state,
            _guard: guard,
        })
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn owns_transaction(&self) -> bool {
        self.state == ScopeState::Active
    }

    pub fn commit(mut self) -> Result<()> {
        if self.state != ScopeState::Active {
            self.state = ScopeState::Idle;
            return Ok(());
        }

        self.state = ScopeState::Idle;
        if let Err(err) = self.handle.commit() {
            event!(Level::ERROR, error = %err, "commit failed, rolling back");
            if self.handle.is_active()
                && let Err(rollback_err) = self.handle.rollback()
            {
                event!(Level::ERROR, error = %rollback_err, original = %err, "rollback after failed commit failed");
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        let owned = self.state == ScopeState::Active;
        self.state = ScopeState::Idle;
        if owned { self.handle.rollback() } else { Ok(()) }
    }

    /// Runs `work` inside a scope: commits on success, rolls back on error and
    /// hands the original error back. A failing rollback is logged only.
    pub fn run<T, F>(handle: &'a dyn TransactionHandle, lock: &'a ReentrantMutex<()>, work: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let scope = Self::begin(handle, lock)?;
        match work() {
            Ok(value) => {
                scope.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = scope.rollback() {
                    event!(Level::ERROR, error = %rollback_err, original = %err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.state == ScopeState::Active {
            event!(Level::WARN, "transaction scope dropped while active, rolling back");
            if let Err(err) = self.handle.rollback() {
                event!(Level::ERROR, error = %err, "rollback of dropped scope failed");
            }
        }
    }
}
