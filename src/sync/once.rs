/*!
 * Once Guard
 *
 * Atomic "done" flag checked without locking on the fast path; the slow
 * path takes a mutex, re-checks, and runs the initializer exactly once
 * even under a multi-thread race on first use.
 */

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-time-initialization guard
pub struct Once {
    done: AtomicBool,
    lock: Mutex<()>,
}

impl Once {
    /// Create a guard whose initializer has not yet run
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    /// Run `f` if no initializer has completed through this guard
    ///
    /// Callers racing on first use serialize on the internal lock; all
    /// of them return only after the one chosen initializer finished,
    /// and the acquire/release pair on `done` publishes its effects.
    pub fn call_once<F: FnOnce()>(&self, f: F) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let _guard = self.lock.lock();
        if !self.done.load(Ordering::Relaxed) {
            f();
            self.done.store(true, Ordering::Release);
        }
    }

    /// Whether an initializer has completed
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl Default for Once {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_runs_exactly_once() {
        let once = Once::new();
        let mut runs = 0;
        once.call_once(|| runs += 1);
        once.call_once(|| runs += 1);
        assert_eq!(runs, 1);
        assert!(once.is_completed());
    }

    #[test]
    fn test_concurrent_first_use() {
        const THREADS: usize = 8;
        let once = Arc::new(Once::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let once = once.clone();
                let runs = runs.clone();
                thread::spawn(move || {
                    once.call_once(|| {
                        // Widen the race window
                        thread::sleep(std::time::Duration::from_millis(10));
                        runs.fetch_add(1, Ordering::SeqCst);
                    });
                    // Every caller observes the initializer's effects
                    assert_eq!(runs.load(Ordering::SeqCst), 1);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
