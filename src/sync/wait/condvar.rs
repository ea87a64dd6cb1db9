/*!
 * Condvar-Based Wait Strategy with Sharded Architecture
 *
 * Cross-platform fallback using parking_lot::Condvar for reliability.
 *
 * # Design: Fixed Sharded Array
 *
 * A fixed array of cache-line-aligned slots, the word address hashed to
 * a slot. The expected value is revalidated under the slot lock before
 * sleeping, and wakers notify under the same lock, so a wake that races
 * the check is never lost. Multiple words may share a slot; the only
 * cost of sharing is a spurious wakeup.
 */

use super::traits::{WaitStrategy, WakeResult};
use crate::core::limits::WAIT_PARKING_SLOTS;
use parking_lot::{Condvar, Mutex};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

const SLOT_MASK: usize = WAIT_PARKING_SLOTS - 1;

/// A single condvar slot with waiter count
#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
struct CondvarSlot {
    condvar: Condvar,
    mutex: Mutex<()>,
    waiters: AtomicUsize,
}

impl CondvarSlot {
    const fn new() -> Self {
        Self {
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
            waiters: AtomicUsize::new(0),
        }
    }
}

/// Condvar-based wait strategy with fixed sharded architecture
///
/// # Performance
///
/// - Works on all platforms
/// - Zero allocations after initialization
/// - Predictable memory footprint
#[repr(C, align(64))]
pub struct CondvarWait {
    /// Fixed array of condvar slots (never resizes, stable addresses)
    slots: Box<[CondvarSlot; WAIT_PARKING_SLOTS]>,
}

impl CondvarWait {
    /// Create a new condvar-based wait strategy
    pub fn new() -> Self {
        Self {
            slots: Box::new([const { CondvarSlot::new() }; WAIT_PARKING_SLOTS]),
        }
    }

    /// Hash a word address to a slot index
    #[inline]
    fn slot_index(addr: usize) -> usize {
        let mut hasher = ahash::AHasher::default();
        addr.hash(&mut hasher);
        (hasher.finish() as usize) & SLOT_MASK
    }

    #[inline]
    fn slot_for(&self, word: &AtomicU32) -> &CondvarSlot {
        let addr = word as *const AtomicU32 as usize;
        &self.slots[Self::slot_index(addr)]
    }
}

impl Default for CondvarWait {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for CondvarWait {
    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> bool {
        let slot = self.slot_for(word);

        slot.waiters.fetch_add(1, Ordering::Relaxed);
        let mut guard = slot.mutex.lock();

        // Revalidate under the slot lock: a waker changes the word and
        // notifies while holding this lock, so the check cannot race.
        if word.load(Ordering::SeqCst) != expected {
            drop(guard);
            slot.waiters.fetch_sub(1, Ordering::Relaxed);
            return true;
        }

        let timed_out = if let Some(timeout) = timeout {
            slot.condvar.wait_for(&mut guard, timeout).timed_out()
        } else {
            slot.condvar.wait(&mut guard);
            false
        };

        drop(guard);
        slot.waiters.fetch_sub(1, Ordering::Relaxed);

        !timed_out
    }

    fn wake_one(&self, word: &AtomicU32) -> WakeResult {
        let slot = self.slot_for(word);

        let count = slot.waiters.load(Ordering::Relaxed);
        if count == 0 {
            return WakeResult::NoWaiters;
        }

        // Serialize with the waiter's check-then-sleep. A shared slot
        // may route this notification to a different word's waiter;
        // that waiter re-checks and re-sleeps.
        let _guard = slot.mutex.lock();
        slot.condvar.notify_one();
        WakeResult::Woken(1)
    }

    fn wake_all(&self, word: &AtomicU32) -> WakeResult {
        let slot = self.slot_for(word);

        let count = slot.waiters.load(Ordering::Relaxed);
        if count == 0 {
            return WakeResult::NoWaiters;
        }

        let _guard = slot.mutex.lock();
        slot.condvar.notify_all();
        WakeResult::Woken(count)
    }

    fn waiter_count(&self, word: &AtomicU32) -> usize {
        self.slot_for(word).waiters.load(Ordering::Relaxed)
    }

    fn name(&self) -> &'static str {
        "condvar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_condvar_wake_one() {
        let cv = Arc::new(CondvarWait::new());
        let word = Arc::new(AtomicU32::new(0));

        let cv_clone = cv.clone();
        let word_clone = word.clone();
        let handle =
            thread::spawn(move || cv_clone.wait(&word_clone, 0, Some(Duration::from_secs(1))));

        // Give thread time to wait
        thread::sleep(Duration::from_millis(50));

        word.store(1, Ordering::SeqCst);
        let result = cv.wake_one(&word);
        assert!(matches!(result, WakeResult::Woken(1)));

        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_condvar_timeout() {
        let cv = CondvarWait::new();
        let word = AtomicU32::new(0);
        let start = Instant::now();
        let result = cv.wait(&word, 0, Some(Duration::from_millis(50)));
        let elapsed = start.elapsed();

        assert!(!result); // Should timeout
        assert!(elapsed >= Duration::from_millis(50));
    }

    #[test]
    fn test_condvar_wake_all() {
        let cv = Arc::new(CondvarWait::new());
        let word = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let cv_clone = cv.clone();
                let word_clone = word.clone();
                thread::spawn(move || cv_clone.wait(&word_clone, 0, Some(Duration::from_secs(1))))
            })
            .collect();

        // Give threads time to wait
        thread::sleep(Duration::from_millis(100));

        word.store(1, Ordering::SeqCst);
        let result = cv.wake_all(&word);
        assert!(result.is_woken());

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
