/*!
 * Counting Semaphore
 *
 * Atomic counter with compare-and-swap decrement/increment. The
 * blocking wait loops the decrement with brief backoff sleeps between
 * failed attempts, so under contention it may add up to one scheduling
 * quantum of extra latency — a bounded imprecision this design accepts.
 *
 * The named variant is an in-memory emulation: a process-wide registry
 * keyed by name, no host named-semaphore facility assumed. Unlinking
 * removes the name while existing handles stay usable.
 */

use crate::core::errors::SyncError;
use crate::core::limits::SEM_VALUE_MAX;
use crate::core::types::{SemValue, SyncResult};
use crate::sync::wait::Backoff;
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Counting semaphore
///
/// Invariant: `count >= 0` (unsigned); `post` past `SEM_VALUE_MAX` is
/// rejected rather than wrapping.
pub struct Semaphore {
    count: AtomicU32,
}

impl Semaphore {
    /// Create a semaphore holding `value` units
    pub const fn new(value: SemValue) -> Self {
        Self {
            count: AtomicU32::new(value),
        }
    }

    /// Acquire one unit, blocking until one is available
    pub fn wait(&self) -> SyncResult<()> {
        let mut backoff = Backoff::new();
        loop {
            if self.try_decrement() {
                return Ok(());
            }
            backoff.snooze();
        }
    }

    /// Attempt the decrement exactly once
    ///
    /// Fails with `SyncError::WouldBlock` whether the count was zero or
    /// the single compare-and-swap lost a race.
    pub fn try_wait(&self) -> SyncResult<()> {
        if self.try_decrement() {
            Ok(())
        } else {
            Err(SyncError::WouldBlock)
        }
    }

    /// Acquire one unit, giving up at the deadline
    ///
    /// Polls the non-blocking decrement until success or `timeout`
    /// elapses. A timed-out wait consumes nothing.
    pub fn timed_wait(&self, timeout: Duration) -> SyncResult<()> {
        let deadline = Instant::now() + timeout;
        let mut backoff = Backoff::new();
        loop {
            if self.try_decrement() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SyncError::Timeout);
            }
            backoff.snooze();
        }
    }

    /// Release one unit
    pub fn post(&self) -> SyncResult<()> {
        loop {
            let count = self.count.load(Ordering::SeqCst);
            if count >= SEM_VALUE_MAX {
                return Err(SyncError::InvalidArgument(
                    "semaphore value overflow".to_string(),
                ));
            }
            if self
                .count
                .compare_exchange(count, count + 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    /// Current unit count (snapshot, may be stale immediately)
    #[inline]
    pub fn value(&self) -> SemValue {
        self.count.load(Ordering::Relaxed)
    }

    /// Release resources (no-op; nothing is heap-allocated)
    pub fn destroy(&self) {}

    #[inline]
    fn try_decrement(&self) -> bool {
        let count = self.count.load(Ordering::SeqCst);
        count > 0
            && self
                .count
                .compare_exchange(count, count - 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
    }
}

/// Flags for opening a named semaphore
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Create the semaphore if the name is unbound
    pub create: bool,
    /// Fail if the name is already bound (meaningful with `create`)
    pub exclusive: bool,
}

impl OpenFlags {
    /// Attach to an existing semaphore only
    pub const NONE: Self = Self {
        create: false,
        exclusive: false,
    };
    /// Create if absent, attach if present
    pub const CREATE: Self = Self {
        create: true,
        exclusive: false,
    };
    /// Create, failing if the name is already bound
    pub const CREATE_EXCLUSIVE: Self = Self {
        create: true,
        exclusive: true,
    };
}

/// Handle to a semaphore shared under a process-wide name
///
/// Cloning the handle (or re-opening the name) attaches to the same
/// counter. The handle stays valid after `unlink`; only the name
/// binding is removed.
#[derive(Clone)]
pub struct NamedSemaphore {
    name: String,
    inner: Arc<Semaphore>,
}

fn registry() -> &'static DashMap<String, Arc<Semaphore>, RandomState> {
    static REGISTRY: OnceLock<DashMap<String, Arc<Semaphore>, RandomState>> = OnceLock::new();
    REGISTRY.get_or_init(|| DashMap::with_hasher(RandomState::new()))
}

impl NamedSemaphore {
    /// Create or attach to the semaphore bound to `name`
    ///
    /// `mode` is accepted for interface parity with descriptor-based
    /// opens; the in-memory registry has no access control and ignores
    /// it. `value` only applies when a new semaphore is created.
    pub fn open(name: &str, flags: OpenFlags, mode: u32, value: SemValue) -> SyncResult<Self> {
        let _ = mode;
        match registry().entry(name.to_string()) {
            Entry::Occupied(entry) => {
                if flags.create && flags.exclusive {
                    return Err(SyncError::AlreadyExists(name.to_string()));
                }
                debug!(name = name, "attached to named semaphore");
                Ok(Self {
                    name: name.to_string(),
                    inner: entry.get().clone(),
                })
            }
            Entry::Vacant(entry) => {
                if !flags.create {
                    return Err(SyncError::NotFound(name.to_string()));
                }
                let sem = Arc::new(Semaphore::new(value));
                entry.insert(sem.clone());
                info!(name = name, value = value, "named semaphore created");
                Ok(Self {
                    name: name.to_string(),
                    inner: sem,
                })
            }
        }
    }

    /// Remove the name binding
    ///
    /// Existing handles keep working; a later `open` under this name
    /// sees a fresh namespace.
    pub fn unlink(name: &str) -> SyncResult<()> {
        if registry().remove(name).is_some() {
            info!(name = name, "named semaphore unlinked");
            Ok(())
        } else {
            Err(SyncError::NotFound(name.to_string()))
        }
    }

    /// Number of names currently bound (diagnostics only)
    pub fn registered_count() -> usize {
        registry().len()
    }

    /// The name this handle was opened under
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Detach from the semaphore
    ///
    /// Dropping the handle is equivalent; this exists for lifecycle
    /// symmetry with `open`.
    pub fn close(self) {}
}

impl std::ops::Deref for NamedSemaphore {
    type Target = Semaphore;

    fn deref(&self) -> &Semaphore {
        &self.inner
    }
}
