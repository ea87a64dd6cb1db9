/*!
 * Asynchronous I/O Request Control Block
 *
 * Caller-supplied description of one request: target file, operation
 * code, buffer/length, file offset, and completion-notification mode.
 */

use crate::core::types::Fd;
use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

/// Operation code for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AioOp {
    /// Positioned read
    Read,
    /// Positioned write
    Write,
}

impl AioOp {
    /// Get operation name for logging
    pub fn name(&self) -> &'static str {
        match self {
            AioOp::Read => "read",
            AioOp::Write => "write",
        }
    }
}

/// How completion is announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyMode {
    /// Broadcast the manager's completion condition variable (default);
    /// required for `wait_any` to unblock promptly
    #[default]
    Broadcast,
    /// Complete silently; observers poll the status query
    Polled,
}

/// Control block for one asynchronous I/O request
///
/// The manager owns the block from submission until the caller
/// retrieves the result or cancels the task. The returned handle is the
/// manager-private slot that stashes the task identity.
pub struct AioRequest {
    pub(crate) file: Arc<File>,
    pub(crate) op: AioOp,
    /// Write payload (empty for reads)
    pub(crate) buf: Vec<u8>,
    /// Read length (equals `buf.len()` for writes)
    pub(crate) len: usize,
    pub(crate) offset: u64,
    pub(crate) notify: NotifyMode,
}

impl AioRequest {
    /// Describe a positioned read of `len` bytes at `offset`
    pub fn read(file: Arc<File>, len: usize, offset: u64) -> Self {
        Self {
            file,
            op: AioOp::Read,
            buf: Vec::new(),
            len,
            offset,
            notify: NotifyMode::default(),
        }
    }

    /// Describe a positioned write of `data` at `offset`
    pub fn write(file: Arc<File>, data: Vec<u8>, offset: u64) -> Self {
        let len = data.len();
        Self {
            file,
            op: AioOp::Write,
            buf: data,
            len,
            offset,
            notify: NotifyMode::default(),
        }
    }

    /// Override the completion-notification mode
    pub fn with_notify(mut self, notify: NotifyMode) -> Self {
        self.notify = notify;
        self
    }

    /// Descriptor of the target file
    #[inline]
    pub fn fd(&self) -> Fd {
        self.file.as_raw_fd()
    }

    /// Operation code
    #[inline]
    pub fn op(&self) -> AioOp {
        self.op
    }

    /// Transfer length
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the transfer length is zero
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// File offset the transfer starts at
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}
