/*!
 * Wait/Wake Primitive
 *
 * Blocks a thread on the value of a shared atomic word and wakes
 * blocked waiters when another thread changes it. Three strategies:
 * - Futex-based (Linux) for minimal overhead
 * - Condvar-based (cross-platform) for reliability
 * - Sleep-based polling where no blocking facility exists
 *
 * # Design: Enum Dispatch for Zero-Cost Abstraction
 *
 * Instead of `Arc<dyn Trait>` (dynamic dispatch with vtable overhead),
 * the queue wraps the chosen strategy in an enum, so the hot wait/wake
 * paths inline fully.
 */

mod condvar;
mod config;
mod futex;
mod spinwait;
mod traits;

pub use condvar::CondvarWait;
pub use config::{StrategyType, SyncConfig};
pub use futex::FutexWait;
pub use spinwait::SpinWait;
pub use traits::{WaitStrategy, WakeResult};

pub(crate) use spinwait::Backoff;

use crate::core::errors::SyncError;
use crate::core::types::SyncResult;
use std::sync::atomic::AtomicU32;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Wait strategy implementation (enum dispatch for zero overhead)
enum WaitStrategyImpl {
    Futex(FutexWait),
    Condvar(CondvarWait),
    SpinWait(SpinWait),
}

impl WaitStrategyImpl {
    #[inline(always)]
    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> bool {
        match self {
            Self::Futex(s) => s.wait(word, expected, timeout),
            Self::Condvar(s) => s.wait(word, expected, timeout),
            Self::SpinWait(s) => s.wait(word, expected, timeout),
        }
    }

    #[inline(always)]
    fn wake_one(&self, word: &AtomicU32) -> WakeResult {
        match self {
            Self::Futex(s) => s.wake_one(word),
            Self::Condvar(s) => s.wake_one(word),
            Self::SpinWait(s) => s.wake_one(word),
        }
    }

    #[inline(always)]
    fn wake_all(&self, word: &AtomicU32) -> WakeResult {
        match self {
            Self::Futex(s) => s.wake_all(word),
            Self::Condvar(s) => s.wake_all(word),
            Self::SpinWait(s) => s.wake_all(word),
        }
    }

    #[inline(always)]
    fn waiter_count(&self, word: &AtomicU32) -> usize {
        match self {
            Self::Futex(s) => s.waiter_count(word),
            Self::Condvar(s) => s.waiter_count(word),
            Self::SpinWait(s) => s.waiter_count(word),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Futex(s) => s.name(),
            Self::Condvar(s) => s.name(),
            Self::SpinWait(s) => s.name(),
        }
    }
}

/// Wait queue over atomic words
///
/// # Examples
///
/// ```
/// use threadcore::sync::wait::WaitQueue;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// let queue = WaitQueue::with_defaults();
/// let word = AtomicU32::new(0);
///
/// // Waits only while the word still holds 0
/// let result = queue.wait(&word, 0, Some(Duration::from_millis(10)));
/// assert!(result.is_err()); // nobody woke us: timeout
///
/// word.store(1, Ordering::SeqCst);
/// assert!(queue.wait(&word, 0, None).is_ok()); // value changed: no wait
/// ```
pub struct WaitQueue {
    strategy: WaitStrategyImpl,
}

impl WaitQueue {
    /// Create a new wait queue with the specified configuration
    pub fn new(config: SyncConfig) -> Self {
        let strategy = match config.select_strategy() {
            StrategyType::Futex => WaitStrategyImpl::Futex(FutexWait::new()),
            StrategyType::Condvar => WaitStrategyImpl::Condvar(CondvarWait::new()),
            StrategyType::SpinWait => {
                WaitStrategyImpl::SpinWait(SpinWait::new(config.spin_duration, config.max_spins))
            }
            StrategyType::Auto => {
                // Should have been resolved by select_strategy
                #[cfg(target_os = "linux")]
                {
                    WaitStrategyImpl::Futex(FutexWait::new())
                }
                #[cfg(not(target_os = "linux"))]
                {
                    WaitStrategyImpl::Condvar(CondvarWait::new())
                }
            }
        };

        Self { strategy }
    }

    /// Create with default configuration (auto-selects best strategy)
    pub fn with_defaults() -> Self {
        Self::new(SyncConfig::default())
    }

    /// Block while the word holds `expected`, until woken or timeout
    ///
    /// Returns `Ok(())` if woken or the word already changed,
    /// `Err(SyncError::Timeout)` if the timeout elapsed first.
    #[inline]
    pub fn wait(
        &self,
        word: &AtomicU32,
        expected: u32,
        timeout: Option<Duration>,
    ) -> SyncResult<()> {
        if self.strategy.wait(word, expected, timeout) {
            Ok(())
        } else {
            Err(SyncError::Timeout)
        }
    }

    /// Block until the predicate turns false
    ///
    /// The predicate is checked before waiting and after each wake, so a
    /// wake arriving between the check and the wait is never lost. The
    /// word snapshot taken before each predicate check serves as the
    /// expected value for the underlying wait.
    pub fn wait_while<F>(
        &self,
        word: &AtomicU32,
        timeout: Option<Duration>,
        mut predicate: F,
    ) -> SyncResult<()>
    where
        F: FnMut() -> bool,
    {
        let start = Instant::now();

        loop {
            let snapshot = word.load(std::sync::atomic::Ordering::SeqCst);

            if !predicate() {
                return Ok(());
            }

            if let Some(timeout) = timeout {
                if start.elapsed() >= timeout {
                    return Err(SyncError::Timeout);
                }
            }

            let remaining = timeout.map(|t| t.saturating_sub(start.elapsed()));
            // Timeout result is folded into the next predicate check
            let _ = self.strategy.wait(word, snapshot, remaining);
        }
    }

    /// Wake one waiter blocked on the word
    #[inline]
    pub fn wake_one(&self, word: &AtomicU32) -> WakeResult {
        self.strategy.wake_one(word)
    }

    /// Wake all waiters blocked on the word
    #[inline]
    pub fn wake_all(&self, word: &AtomicU32) -> WakeResult {
        self.strategy.wake_all(word)
    }

    /// Get approximate count of waiters for the word (for diagnostics)
    #[inline]
    pub fn waiter_count(&self, word: &AtomicU32) -> usize {
        self.strategy.waiter_count(word)
    }

    /// Get the name of the active strategy
    #[inline]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}

/// Process-wide queue the lock primitives park on.
///
/// One shared instance keeps the primitives allocation-free: the slot
/// arrays live here, not in caller-provided lock storage.
pub(crate) fn global() -> &'static WaitQueue {
    static GLOBAL: OnceLock<WaitQueue> = OnceLock::new();
    GLOBAL.get_or_init(WaitQueue::with_defaults)
}
