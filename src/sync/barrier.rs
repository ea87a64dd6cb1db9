/*!
 * Barrier
 *
 * N-party rendezvous built from this crate's mutex and condition
 * variable. The last participant to arrive resets the waiting count
 * *before* broadcasting, which is what makes the barrier safely
 * reusable across successive generations. An internal generation
 * counter keeps a round-N+1 arrival from being confused with round N's
 * release.
 */

use crate::core::types::SyncResult;
use crate::sync::condvar::Condvar;
use crate::sync::mutex::{Mutex, MutexKind};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Outcome of a barrier wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierWaitResult {
    /// This participant completed the rendezvous and released the rest
    Leader,
    /// This participant was released by the leader
    Follower,
}

impl BarrierWaitResult {
    /// Whether this participant was the one that tripped the barrier
    #[inline]
    pub fn is_leader(&self) -> bool {
        matches!(self, BarrierWaitResult::Leader)
    }
}

/// Reusable N-party barrier
pub struct Barrier {
    target: u32,
    waiting: AtomicU32,
    generation: AtomicU64,
    lock: Mutex,
    cond: Condvar,
}

impl Barrier {
    /// Create a barrier for `count` participants
    ///
    /// A count of zero is treated as one, so a lone `wait` always
    /// completes.
    pub fn new(count: u32) -> Self {
        Self {
            target: count.max(1),
            waiting: AtomicU32::new(0),
            generation: AtomicU64::new(0),
            lock: Mutex::new(MutexKind::Normal),
            cond: Condvar::new(),
        }
    }

    /// Block until all participants have arrived
    ///
    /// Exactly one participant per generation observes `Leader`. The
    /// barrier resets itself and is immediately reusable for the next
    /// round without re-initialization.
    pub fn wait(&self) -> SyncResult<BarrierWaitResult> {
        self.lock.lock()?;
        let generation = self.generation.load(Ordering::Relaxed);
        let arrived = self.waiting.load(Ordering::Relaxed) + 1;

        if arrived == self.target {
            // Reset before release: the next generation starts from a
            // clean count before anyone is woken.
            self.waiting.store(0, Ordering::Relaxed);
            self.generation.store(generation + 1, Ordering::Relaxed);
            self.cond.broadcast();
            self.lock.unlock()?;
            Ok(BarrierWaitResult::Leader)
        } else {
            self.waiting.store(arrived, Ordering::Relaxed);
            while self.generation.load(Ordering::Relaxed) == generation {
                self.cond.wait(&self.lock)?;
            }
            self.lock.unlock()?;
            Ok(BarrierWaitResult::Follower)
        }
    }

    /// Release resources (no-op; nothing is heap-allocated)
    pub fn destroy(&self) {}
}
