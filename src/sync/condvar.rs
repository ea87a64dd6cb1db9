/*!
 * Condition Variable
 *
 * Ticket/sequence counter pair layered over a caller-supplied mutex.
 *
 * # Design: Tickets Over Events
 *
 * Two monotonically increasing counters drive the state machine:
 * `issued` hands each waiter a ticket, `released` marks how many
 * tickets have been let go. A waiter holding ticket `t` unblocks once
 * `released > t`; tickets are never reused. This kills the classic
 * lost-wakeup bug — a signal landing between ticket issuance and the
 * wait loop is not an event that can be missed, it is a counter the
 * waiter will observe.
 *
 * `signal` releases the oldest outstanding ticket; `broadcast` releases
 * everyone currently waiting. Release order is by ticket, which says
 * nothing about which physical thread the scheduler runs next.
 */

use crate::core::errors::SyncError;
use crate::core::types::SyncResult;
use crate::sync::mutex::Mutex;
use crate::sync::wait;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Condition variable driven by a ticket pair
///
/// Invariant: `released <= issued` at all times.
pub struct Condvar {
    issued: AtomicU64,
    released: AtomicU64,
    /// Notify word the wait queue parks on; bumped on every release so
    /// sleepers (including the polling fallback) observe a change
    notify: AtomicU32,
}

impl Condvar {
    /// Create a new condition variable with no outstanding tickets
    pub const fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            released: AtomicU64::new(0),
            notify: AtomicU32::new(0),
        }
    }

    /// Release the mutex and block until signalled
    ///
    /// The mutex is re-acquired before returning. Must be called with
    /// the mutex held; on a recursive mutex held more than once deep
    /// this deadlocks, exactly like the interface it models.
    pub fn wait(&self, mutex: &Mutex) -> SyncResult<()> {
        self.wait_inner(mutex, None)
    }

    /// Like `wait`, but gives up after `timeout`
    ///
    /// Returns `SyncError::Timeout` if the deadline passed first, still
    /// re-acquiring the mutex before returning. The abandoned ticket
    /// stays issued, so a later `signal` may be absorbed by it.
    pub fn timed_wait(&self, mutex: &Mutex, timeout: Duration) -> SyncResult<()> {
        self.wait_inner(mutex, Some(timeout))
    }

    fn wait_inner(&self, mutex: &Mutex, timeout: Option<Duration>) -> SyncResult<()> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst);
        mutex.unlock()?;

        let deadline = timeout.map(|t| Instant::now() + t);
        let outcome = loop {
            // Snapshot the notify word before checking the counters: a
            // release that lands after the check changes the word and
            // invalidates the park below.
            let seq = self.notify.load(Ordering::SeqCst);

            if self.released.load(Ordering::SeqCst) > ticket {
                break Ok(());
            }

            let remaining = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        break Err(SyncError::Timeout);
                    }
                    Some(d - now)
                }
                None => None,
            };

            let _ = wait::global().wait(&self.notify, seq, remaining);
        };

        mutex.lock()?;
        outcome
    }

    /// Release the oldest outstanding ticket, if any
    pub fn signal(&self) {
        loop {
            let released = self.released.load(Ordering::SeqCst);
            let issued = self.issued.load(Ordering::SeqCst);
            if released >= issued {
                return; // nobody is waiting
            }
            if self
                .released
                .compare_exchange(released, released + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                self.wake();
                return;
            }
        }
    }

    /// Release every ticket outstanding at this instant
    pub fn broadcast(&self) {
        loop {
            let issued = self.issued.load(Ordering::SeqCst);
            let released = self.released.load(Ordering::SeqCst);
            if released >= issued {
                return;
            }
            if self
                .released
                .compare_exchange(released, issued, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                self.wake();
                return;
            }
        }
    }

    /// Release resources (no-op; nothing is heap-allocated)
    pub fn destroy(&self) {}

    #[inline]
    fn wake(&self) {
        self.notify.fetch_add(1, Ordering::SeqCst);
        // Wake everyone parked on the word: only holders of released
        // tickets pass their check, the rest re-park. The oldest ticket
        // is thereby the one a lone signal lets through.
        wait::global().wake_all(&self.notify);
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::mutex::MutexKind;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_signal_wakes_one_waiter() {
        let mutex = Arc::new(Mutex::new(MutexKind::Normal));
        let cond = Arc::new(Condvar::new());
        let woken = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let mutex = mutex.clone();
                let cond = cond.clone();
                let woken = woken.clone();
                thread::spawn(move || {
                    mutex.lock().unwrap();
                    cond.wait(&mutex).unwrap();
                    woken.fetch_add(1, Ordering::SeqCst);
                    mutex.unlock().unwrap();
                })
            })
            .collect();

        // Let all three reach the wait
        thread::sleep(Duration::from_millis(100));

        cond.signal();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(woken.load(Ordering::SeqCst), 1);

        cond.broadcast();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(woken.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_broadcast_wakes_all() {
        let mutex = Arc::new(Mutex::new(MutexKind::Normal));
        let cond = Arc::new(Condvar::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mutex = mutex.clone();
                let cond = cond.clone();
                thread::spawn(move || {
                    mutex.lock().unwrap();
                    let result = cond.wait(&mutex);
                    mutex.unlock().unwrap();
                    result
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(100));
        cond.broadcast();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
    }

    #[test]
    fn test_signal_before_wait_is_not_lost_after_ticket() {
        // A signal between ticket issuance and the wait loop must not
        // be lost; with no tickets outstanding it is a no-op.
        let cond = Condvar::new();
        cond.signal();
        cond.broadcast();

        let mutex = Mutex::new(MutexKind::Normal);
        mutex.lock().unwrap();
        let result = cond.timed_wait(&mutex, Duration::from_millis(50));
        assert_eq!(result, Err(SyncError::Timeout));
        mutex.unlock().unwrap();
    }

    #[test]
    fn test_timed_wait_reacquires_mutex() {
        let mutex = Arc::new(Mutex::new(MutexKind::Normal));
        let cond = Arc::new(Condvar::new());

        mutex.lock().unwrap();
        let result = cond.timed_wait(&mutex, Duration::from_millis(50));
        assert_eq!(result, Err(SyncError::Timeout));

        // The mutex must be held again: a foreign try_lock fails
        let mutex_clone = mutex.clone();
        let probe = thread::spawn(move || mutex_clone.try_lock());
        assert_eq!(probe.join().unwrap(), Err(SyncError::WouldBlock));

        mutex.unlock().unwrap();
    }

    #[test]
    fn test_wait_observes_prior_signal_via_ticket() {
        let mutex = Arc::new(Mutex::new(MutexKind::Normal));
        let cond = Arc::new(Condvar::new());
        let ready = Arc::new(AtomicUsize::new(0));

        let mutex_clone = mutex.clone();
        let cond_clone = cond.clone();
        let ready_clone = ready.clone();
        let handle = thread::spawn(move || {
            mutex_clone.lock().unwrap();
            ready_clone.store(1, Ordering::SeqCst);
            let result = cond_clone.wait(&mutex_clone);
            mutex_clone.unlock().unwrap();
            result
        });

        while ready.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        // Keep signalling until the waiter's ticket is released; a
        // single signal could race the ticket being issued.
        while !handle.is_finished() {
            cond.signal();
            thread::sleep(Duration::from_millis(1));
        }
        assert!(handle.join().unwrap().is_ok());
    }
}
