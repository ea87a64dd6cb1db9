/*!
 * Core Types
 * Common types used across the synchronization and aio subsystems
 */

/// File descriptor type (matches the platform's raw descriptor width)
pub type Fd = i32;

/// Process-unique thread id, assigned from a global counter on first use.
/// Zero is reserved for "no owner".
pub type ThreadId = u64;

/// Asynchronous I/O task id (monotonic sequence, never reused)
pub type TaskId = u64;

/// Value carried by a counting semaphore
pub type SemValue = u32;

/// Common result type for synchronization operations
pub type SyncResult<T> = Result<T, super::errors::SyncError>;

/// Common result type for asynchronous I/O operations
pub type AioResult<T> = Result<T, super::errors::AioError>;
