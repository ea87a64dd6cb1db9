/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Synchronization-primitive errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SyncError {
    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(sync::invalid_argument),
        help("The handle or argument is not valid for this operation.")
    )]
    InvalidArgument(String),

    #[error("Operation not permitted: {0}")]
    #[diagnostic(
        code(sync::not_owner),
        help("Only the thread that holds the lock may release it.")
    )]
    NotOwner(String),

    #[error("Resource busy")]
    #[diagnostic(
        code(sync::would_block),
        help("The resource is held elsewhere. Retry, or use the blocking variant.")
    )]
    WouldBlock,

    #[error("Operation timed out")]
    #[diagnostic(
        code(sync::timeout),
        help("The deadline passed before the operation completed.")
    )]
    Timeout,

    #[error("TLS key table full")]
    #[diagnostic(
        code(sync::key_table_full),
        help("All key slots are in use. Delete unused keys to free slots.")
    )]
    KeyTableFull,

    #[error("Named semaphore already exists: {0}")]
    #[diagnostic(
        code(sync::already_exists),
        help("An exclusive open found an existing entry under this name.")
    )]
    AlreadyExists(String),

    #[error("Named semaphore not found: {0}")]
    #[diagnostic(
        code(sync::not_found),
        help("No entry exists under this name. Open with the create flag to make one.")
    )]
    NotFound(String),
}

/// Asynchronous I/O errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum AioError {
    #[error("Operation in progress")]
    #[diagnostic(
        code(aio::in_progress),
        help("The worker has not finished. Poll again or block in wait_any.")
    )]
    InProgress,

    #[error("Invalid task handle")]
    #[diagnostic(
        code(aio::invalid_handle),
        help("The handle is unknown or its result was already retrieved.")
    )]
    InvalidHandle,

    #[error("Operation cancelled")]
    #[diagnostic(
        code(aio::cancelled),
        help("The task was cancelled before producing a result.")
    )]
    Cancelled,

    #[error("Operation timed out")]
    #[diagnostic(
        code(aio::timeout),
        help("No listed task completed before the deadline.")
    )]
    Timeout,

    #[error("Failed to spawn worker thread: {0}")]
    #[diagnostic(
        code(aio::worker_spawn),
        help("The system is out of threads or memory. Retire tasks and retry.")
    )]
    WorkerSpawn(String),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(aio::io),
        help("The positioned read or write failed. Inspect the message for the cause.")
    )]
    Io(String),
}

impl From<std::io::Error> for AioError {
    fn from(err: std::io::Error) -> Self {
        AioError::Io(err.to_string())
    }
}

// The aio manager coordinates through the sync primitives; their
// failures surface in aio terms
impl From<SyncError> for AioError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Timeout => AioError::Timeout,
            other => AioError::Io(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::NotOwner("recursive mutex held by thread 7".to_string());
        assert!(err.to_string().contains("not permitted"));
        assert_eq!(SyncError::WouldBlock.to_string(), "Resource busy");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AioError = io.into();
        assert!(matches!(err, AioError::Io(_)));
    }

    #[test]
    fn test_error_equality() {
        let a = SyncError::AlreadyExists("/sem.queue".to_string());
        let b = SyncError::AlreadyExists("/sem.queue".to_string());
        assert_eq!(a, b);
        assert_ne!(a, SyncError::WouldBlock);
    }
}
