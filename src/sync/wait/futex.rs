/*!
 * Futex-Based Wait Strategy
 *
 * Uses parking_lot_core for futex-like operations on all platforms.
 * On Linux, this maps directly to futex syscalls for minimal overhead.
 *
 * # Design
 *
 * Follows Linux futex design: the calling thread parks on the address
 * of the atomic word, and the expected-value check runs inside the park
 * validation callback. A wake that races with the check is therefore
 * never lost. A fixed sharded slot table tracks approximate waiter
 * counts per address hash.
 */

use super::traits::{WaitStrategy, WakeResult};
use crate::core::limits::WAIT_PARKING_SLOTS;
use parking_lot_core::{park, unpark_all, unpark_one, ParkResult, ParkToken, UnparkToken};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Instant;

const SLOT_MASK: usize = WAIT_PARKING_SLOTS - 1;

/// A single parking slot with a waiter counter
#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
struct ParkingSlot {
    waiters: AtomicUsize,
}

impl ParkingSlot {
    const fn new() -> Self {
        Self {
            waiters: AtomicUsize::new(0),
        }
    }
}

/// Futex-based wait strategy
///
/// # Performance
///
/// - Zero allocations after initialization
/// - Direct futex syscalls on Linux
/// - Lock-free fast path
/// - O(1) waiter-count lookup via hash
#[repr(C, align(64))]
pub struct FutexWait {
    /// Fixed array of parking slots (never resizes, stable addresses)
    slots: Box<[ParkingSlot; WAIT_PARKING_SLOTS]>,
}

impl FutexWait {
    /// Create a new futex-based wait strategy
    pub fn new() -> Self {
        Self {
            slots: Box::new([const { ParkingSlot::new() }; WAIT_PARKING_SLOTS]),
        }
    }

    /// Hash a word address to a slot index
    #[inline]
    fn slot_index(addr: usize) -> usize {
        let mut hasher = ahash::AHasher::default();
        addr.hash(&mut hasher);
        (hasher.finish() as usize) & SLOT_MASK
    }
}

impl Default for FutexWait {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for FutexWait {
    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<std::time::Duration>) -> bool {
        let addr = word as *const AtomicU32 as usize;
        let slot = &self.slots[Self::slot_index(addr)];

        slot.waiters.fetch_add(1, Ordering::Relaxed);

        let deadline = timeout.map(|d| Instant::now() + d);

        // Park keyed on the word's own address. The validate callback
        // re-reads the word under the parking lock, so a wake issued
        // after the caller's last check cannot be lost.
        let result = unsafe {
            park(
                addr,
                || word.load(Ordering::SeqCst) == expected,
                || {},
                |_timed_out, _result| {},
                ParkToken(0),
                deadline,
            )
        };

        slot.waiters.fetch_sub(1, Ordering::Relaxed);

        match result {
            ParkResult::Unparked(_) => true,
            ParkResult::TimedOut => false,
            // Validation failed: the word already changed, which counts
            // as the wait condition being satisfied.
            ParkResult::Invalid => true,
        }
    }

    fn wake_one(&self, word: &AtomicU32) -> WakeResult {
        let addr = word as *const AtomicU32 as usize;
        let slot = &self.slots[Self::slot_index(addr)];

        if slot.waiters.load(Ordering::Relaxed) == 0 {
            return WakeResult::NoWaiters;
        }

        let result = unsafe { unpark_one(addr, |_| UnparkToken(0)) };
        if result.unparked_threads == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(result.unparked_threads)
        }
    }

    fn wake_all(&self, word: &AtomicU32) -> WakeResult {
        let addr = word as *const AtomicU32 as usize;
        let slot = &self.slots[Self::slot_index(addr)];

        if slot.waiters.load(Ordering::Relaxed) == 0 {
            return WakeResult::NoWaiters;
        }

        let unparked = unsafe { unpark_all(addr, UnparkToken(0)) };
        if unparked == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(unparked)
        }
    }

    fn waiter_count(&self, word: &AtomicU32) -> usize {
        let addr = word as *const AtomicU32 as usize;
        self.slots[Self::slot_index(addr)]
            .waiters
            .load(Ordering::Relaxed)
    }

    fn name(&self) -> &'static str {
        "futex"
    }
}
