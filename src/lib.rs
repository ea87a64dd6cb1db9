/*!
 * threadcore
 *
 * Concurrency and asynchronous I/O core: race-free, memory-visible
 * coordination built from atomic operations and a single blocking
 * wait/wake primitive, plus a thread-per-request asynchronous I/O task
 * manager layered on top.
 *
 * The primitives live in caller-provided storage, return errors instead
 * of aborting, and are consumed both by user code and by the higher
 * layers of the library this crate anchors (buffered-I/O locking,
 * registry protection, allocator bookkeeping).
 */

pub mod aio;
pub mod core;
pub mod sync;

// Re-exports
pub use crate::aio::{
    AioCompletion, AioHandle, AioManager, AioOp, AioRequest, AioState, CancelOutcome, ListMode,
};
pub use crate::core::errors::{AioError, SyncError};
pub use crate::core::types::{AioResult, Fd, SyncResult, TaskId};
pub use crate::sync::{
    Barrier, BarrierWaitResult, Condvar, Mutex, MutexKind, NamedSemaphore, Once, OpenFlags, RwLock,
    Semaphore, SpinLock,
};
