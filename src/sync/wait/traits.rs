/*!
 * Wait Strategy Traits
 *
 * Core abstraction for the wait/wake primitive: block a thread on the
 * value of a shared atomic word, wake it when another thread changes
 * that word. Strategies differ only in how the blocking is realized.
 */

use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Result of a wake operation
///
/// Compact representation (single usize) for efficient returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were waiting
    NoWaiters,
}

impl WakeResult {
    /// Check if any waiters were woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }
}

/// Strategy for blocking on the value of an atomic word
///
/// Implementations must be:
/// - **Thread-safe**: Safe to call from multiple threads
/// - **Value-checked**: A waiter suspends only if the word still holds
///   the expected value at the instant of suspension, so a change made
///   before the check is never missed
///
/// # Implementation Notes
///
/// The word's address is the wait key. Distinct words may hash to a
/// shared internal slot; the only cost of sharing is a spurious wakeup,
/// after which the caller re-checks its condition.
pub trait WaitStrategy: Send + Sync {
    /// Block until the word no longer holds `expected`, a wake arrives,
    /// or `timeout` elapses.
    ///
    /// Returns `true` if woken (or the word already changed), `false`
    /// on timeout.
    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> bool;

    /// Wake one waiter blocked on the word
    fn wake_one(&self, word: &AtomicU32) -> WakeResult;

    /// Wake all waiters blocked on the word
    fn wake_all(&self, word: &AtomicU32) -> WakeResult;

    /// Get approximate count of waiters for the word (for diagnostics)
    fn waiter_count(&self, word: &AtomicU32) -> usize {
        let _ = word;
        0 // Default: unknown
    }

    /// Get strategy name for debugging
    fn name(&self) -> &'static str;
}
