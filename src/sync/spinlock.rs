/*!
 * Spinlock
 *
 * Atomic exchange loop that parks through the wait/wake primitive
 * instead of burning CPU once the short spin phase is over.
 */

use crate::core::errors::SyncError;
use crate::core::limits::LOCK_PARK_SLICE;
use crate::core::types::SyncResult;
use crate::sync::wait::{self, Backoff};
use std::sync::atomic::{AtomicU32, Ordering};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// Spinlock over a single atomic word
pub struct SpinLock {
    word: AtomicU32,
}

impl SpinLock {
    /// Create a new unlocked spinlock
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(UNLOCKED),
        }
    }

    /// Acquire the lock
    pub fn lock(&self) -> SyncResult<()> {
        let mut backoff = Backoff::new();
        loop {
            if self.word.swap(LOCKED, Ordering::Acquire) == UNLOCKED {
                return Ok(());
            }
            if backoff.is_sleep_phase() {
                // Block on the word rather than spinning further
                let _ = wait::global().wait(&self.word, LOCKED, Some(LOCK_PARK_SLICE));
            } else {
                backoff.snooze();
            }
        }
    }

    /// Attempt the exchange once
    pub fn try_lock(&self) -> SyncResult<()> {
        if self
            .word
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Ok(())
        } else {
            Err(SyncError::WouldBlock)
        }
    }

    /// Release the lock and wake one blocked waiter
    pub fn unlock(&self) -> SyncResult<()> {
        self.word.store(UNLOCKED, Ordering::Release);
        wait::global().wake_one(&self.word);
        Ok(())
    }

    /// Release resources (no-op; nothing is heap-allocated)
    pub fn destroy(&self) {}

    /// Whether the lock is currently held (diagnostics only)
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.word.load(Ordering::Relaxed) == LOCKED
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}
