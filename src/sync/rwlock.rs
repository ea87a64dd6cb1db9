/*!
 * Reader-Writer Lock
 *
 * Atomic reader count plus writer flag. Read acquisition is optimistic:
 * increment, re-check the writer flag, and back out on the race. No
 * fairness queue — a steady stream of new readers can delay a waiting
 * writer indefinitely, which is an accepted policy here, not a defect.
 */

use crate::core::errors::SyncError;
use crate::core::types::SyncResult;
use crate::sync::wait::Backoff;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Reader-writer lock
///
/// Invariant: `readers > 0` and `writer == true` are never
/// intentionally simultaneous; the brief optimistic-read window is
/// resolved by decrement-and-retry.
pub struct RwLock {
    readers: AtomicU32,
    writer: AtomicBool,
}

impl RwLock {
    /// Create a new unlocked reader-writer lock
    pub const fn new() -> Self {
        Self {
            readers: AtomicU32::new(0),
            writer: AtomicBool::new(false),
        }
    }

    /// Acquire a shared read lock
    pub fn read_lock(&self) -> SyncResult<()> {
        let mut backoff = Backoff::new();
        loop {
            while self.writer.load(Ordering::SeqCst) {
                backoff.snooze();
            }

            self.readers.fetch_add(1, Ordering::Acquire);
            if !self.writer.load(Ordering::SeqCst) {
                return Ok(());
            }

            // A writer claimed the flag between the check and the
            // increment; back out and retry.
            self.readers.fetch_sub(1, Ordering::Release);
            backoff.snooze();
        }
    }

    /// Attempt a read lock without blocking
    pub fn try_read_lock(&self) -> SyncResult<()> {
        if self.writer.load(Ordering::SeqCst) {
            return Err(SyncError::WouldBlock);
        }
        self.readers.fetch_add(1, Ordering::Acquire);
        if self.writer.load(Ordering::SeqCst) {
            self.readers.fetch_sub(1, Ordering::Release);
            return Err(SyncError::WouldBlock);
        }
        Ok(())
    }

    /// Acquire the exclusive write lock
    ///
    /// Claims the writer flag first, then drains readers that got in
    /// ahead of it. The drain is a bounded-backoff wait, so up to one
    /// backoff quantum of extra latency under contention.
    pub fn write_lock(&self) -> SyncResult<()> {
        let mut backoff = Backoff::new();
        while self
            .writer
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            backoff.snooze();
        }

        backoff.reset();
        while self.readers.load(Ordering::SeqCst) != 0 {
            backoff.snooze();
        }
        Ok(())
    }

    /// Attempt the write lock without blocking
    pub fn try_write_lock(&self) -> SyncResult<()> {
        if self
            .writer
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(SyncError::WouldBlock);
        }
        if self.readers.load(Ordering::SeqCst) != 0 {
            self.writer.store(false, Ordering::Release);
            return Err(SyncError::WouldBlock);
        }
        Ok(())
    }

    /// Release the lock: clears the writer flag if set, else drops one
    /// reader. Unlocking a lock nobody holds is `SyncError::NotOwner`.
    pub fn unlock(&self) -> SyncResult<()> {
        if self.writer.load(Ordering::SeqCst) {
            self.writer.store(false, Ordering::Release);
            return Ok(());
        }
        loop {
            let readers = self.readers.load(Ordering::SeqCst);
            if readers == 0 {
                return Err(SyncError::NotOwner(
                    "reader-writer lock is not held".to_string(),
                ));
            }
            if self
                .readers
                .compare_exchange(readers, readers - 1, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    /// Release resources (no-op; nothing is heap-allocated)
    pub fn destroy(&self) {}

    /// Current reader count (diagnostics only)
    #[inline]
    pub fn reader_count(&self) -> u32 {
        self.readers.load(Ordering::Relaxed)
    }
}

impl Default for RwLock {
    fn default() -> Self {
        Self::new()
    }
}
