/*!
 * Sleep-Based Spin-Wait Strategy with Exponential Backoff
 *
 * The fallback for platforms with no kernel blocking facility: the
 * waiter polls the word, backing off in three phases. There is no
 * wakeup path at all, so a waiter may sleep up to one backoff quantum
 * past the moment the word changes. That bounded imprecision is part of
 * this strategy's contract, not a defect.
 *
 * # Design: Exponential Backoff Over Linear Spinning
 *
 * 1. **Tight spin phase**: just `spin_loop()` hint
 * 2. **Yield phase**: `yield_now()` every iteration
 * 3. **Sleep phase**: exponentially increasing sleep, capped at 1ms
 */

use super::traits::{WaitStrategy, WakeResult};
use crate::core::limits::{
    BACKOFF_SPIN_ITERS, BACKOFF_YIELD_ITERS, DEFAULT_MAX_SPINS, DEFAULT_SPIN_DURATION,
    MAX_BACKOFF_NANOS,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Three-phase backoff helper shared by the polling acquisition loops
///
/// Tight spin for the first iterations, then scheduler yields, then
/// exponentially growing sleeps capped at `MAX_BACKOFF_NANOS`.
pub(crate) struct Backoff {
    step: u32,
    sleep_ns: u64,
}

impl Backoff {
    pub(crate) fn new() -> Self {
        Self {
            step: 0,
            sleep_ns: 1,
        }
    }

    /// Wait a little longer than last time
    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.step < BACKOFF_SPIN_ITERS {
            std::hint::spin_loop();
        } else if self.step < BACKOFF_YIELD_ITERS {
            thread::yield_now();
        } else {
            thread::sleep(Duration::from_nanos(self.sleep_ns));
            self.sleep_ns = (self.sleep_ns * 2).min(MAX_BACKOFF_NANOS);
        }
        self.step = self.step.saturating_add(1);
    }

    /// Restart from the tight-spin phase
    #[inline]
    pub(crate) fn reset(&mut self) {
        self.step = 0;
        self.sleep_ns = 1;
    }

    /// Whether the backoff has reached the sleep phase.
    ///
    /// Acquisition loops switch from snoozing to parking at this point.
    #[inline]
    pub(crate) fn is_sleep_phase(&self) -> bool {
        self.step >= BACKOFF_YIELD_ITERS
    }
}

/// Sleep-based polling wait strategy
///
/// # Use Cases
///
/// - Platforms with no parking facility
/// - Very short expected waits where polling beats parking
pub struct SpinWait {
    /// Spin budget before the sleep phase dominates
    spin_duration: Duration,
    /// Maximum iterations counted as "spinning" for diagnostics
    max_spins: u32,
    /// Approximate number of threads currently polling
    waiters: AtomicUsize,
}

impl SpinWait {
    /// Create a new sleep-based wait strategy
    pub fn new(spin_duration: Duration, max_spins: u32) -> Self {
        Self {
            spin_duration,
            max_spins,
            waiters: AtomicUsize::new(0),
        }
    }

    /// Create with default parameters
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_SPIN_DURATION, DEFAULT_MAX_SPINS)
    }
}

impl Default for SpinWait {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl WaitStrategy for SpinWait {
    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> bool {
        let start = Instant::now();
        let mut backoff = Backoff::new();
        let mut spins = 0u32;

        self.waiters.fetch_add(1, Ordering::Relaxed);

        let woken = loop {
            if word.load(Ordering::SeqCst) != expected {
                break true;
            }

            if let Some(timeout) = timeout {
                if start.elapsed() >= timeout {
                    break false;
                }
            }

            // Past the spin budget, skip straight to the sleep phase so
            // a long wait does not burn a core.
            if spins == self.max_spins || start.elapsed() >= self.spin_duration {
                backoff.step = BACKOFF_YIELD_ITERS;
            }
            spins = spins.saturating_add(1);

            backoff.snooze();
        };

        self.waiters.fetch_sub(1, Ordering::Relaxed);
        woken
    }

    // There is no wake channel: sleepers observe the changed word on
    // their next poll. The return value reports how many are polling.

    fn wake_one(&self, _word: &AtomicU32) -> WakeResult {
        match self.waiters.load(Ordering::Relaxed) {
            0 => WakeResult::NoWaiters,
            _ => WakeResult::Woken(1),
        }
    }

    fn wake_all(&self, _word: &AtomicU32) -> WakeResult {
        match self.waiters.load(Ordering::Relaxed) {
            0 => WakeResult::NoWaiters,
            n => WakeResult::Woken(n),
        }
    }

    fn waiter_count(&self, _word: &AtomicU32) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }

    fn name(&self) -> &'static str {
        "spinwait"
    }
}
