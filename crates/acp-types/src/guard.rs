//! Call-scoped re-entrancy guard.
//!
//! Calls against one component are totally ordered: a call from another
//! thread waits until the current call returns. The hazard is a value
//! transfer (or any outbound call) re-entering a mutating entry point on
//! the *same* call stack before the outer call returns. Every mutating
//! entry point holds a [`GuardToken`] for its whole duration; a nested
//! [`ReentrancyGuard::enter`] on the same thread fails with
//! [`AcpError::ReentrantCall`].
//!
//! The token releases the guard on drop, so early returns through `?`
//! release it too.

use std::cell::Cell;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::{AcpError, Result};

/// Serializes the mutating entry points of one component and rejects
/// nested entry.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: ReentrantMutex<Cell<bool>>,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entered: ReentrantMutex::new(Cell::new(false)),
        }
    }

    /// Enter the guarded section, waiting for any call on another thread.
    ///
    /// # Errors
    /// Returns `ReentrantCall` if this call stack is already inside.
    pub fn enter(&self) -> Result<GuardToken<'_>> {
        let held = self.entered.lock();
        if held.get() {
            tracing::warn!("Re-entrant call rejected");
            return Err(AcpError::ReentrantCall);
        }
        held.set(true);
        Ok(GuardToken { held })
    }

    /// Whether a call is inside the guarded section right now.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.entered.try_lock().is_none_or(|held| held.get())
    }
}

/// Proof of being inside the guarded section. Releases on drop.
#[must_use = "the guard is released as soon as the token is dropped"]
pub struct GuardToken<'a> {
    held: ReentrantMutexGuard<'a, Cell<bool>>,
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.held.set(false);
    }
}

impl std::fmt::Debug for GuardToken<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardToken").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn enter_and_release() {
        let guard = ReentrancyGuard::new();
        {
            let _token = guard.enter().unwrap();
            assert!(guard.is_entered());
        }
        assert!(!guard.is_entered());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn nested_enter_rejected() {
        let guard = ReentrancyGuard::new();
        let _outer = guard.enter().unwrap();
        let err = guard.enter().unwrap_err();
        assert!(matches!(err, AcpError::ReentrantCall));
        assert!(guard.is_entered(), "rejected entry must not release the outer call");
    }

    #[test]
    fn released_on_error_path() {
        fn failing(guard: &ReentrancyGuard) -> Result<()> {
            let _token = guard.enter()?;
            Err(AcpError::EmptyBatch)
        }

        let guard = ReentrancyGuard::new();
        assert!(failing(&guard).is_err());
        assert!(!guard.is_entered(), "guard must release after failure");
    }

    #[test]
    fn other_threads_wait_instead_of_failing() {
        let guard = Arc::new(ReentrancyGuard::new());
        let completed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let completed = Arc::clone(&completed);
                std::thread::spawn(move || {
                    let _token = guard.enter().expect("cross-thread entry is serialized");
                    completed.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(completed.load(Ordering::SeqCst), 8);
    }
}
