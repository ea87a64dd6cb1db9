/*!
 * Synchronization Primitives
 *
 * Race-free, memory-visible coordination built from atomic operations
 * and a single blocking wait/wake primitive:
 * - Mutex (normal/recursive) and ticket-based condition variable
 * - Reader-writer lock, spinlock, N-party barrier
 * - Counting semaphore, unnamed and named
 * - TLS key registry and once guard
 *
 * Every primitive lives in caller-provided storage and allocates
 * nothing of its own; the shared parking structures live in a single
 * process-wide wait queue. The caller owns each primitive's lifetime
 * and must not destroy one while a thread is blocked inside it.
 */

pub mod wait;

mod barrier;
mod condvar;
mod mutex;
mod once;
mod rwlock;
mod semaphore;
mod spinlock;
pub mod tls;

pub use barrier::{Barrier, BarrierWaitResult};
pub use condvar::Condvar;
pub use mutex::Mutex;
pub use mutex::MutexKind;
pub use once::Once;
pub use rwlock::RwLock;
pub use semaphore::{NamedSemaphore, OpenFlags, Semaphore};
pub use spinlock::SpinLock;
pub use tls::{TlsDestructor, TlsKey};
