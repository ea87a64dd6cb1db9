/*!
 * Asynchronous I/O Task State
 *
 * Per-task state machine: SUBMITTED -> RUNNING -> DONE or CANCELLED.
 * The shared portion is read by the submitting thread, the worker, and
 * any thread blocked in wait_any; the worker handle stays private to
 * the manager's task table.
 */

use crate::core::types::{AioResult, Fd, TaskId};
use crate::aio::request::{AioOp, NotifyMode};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

const STATE_SUBMITTED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_DONE: u8 = 2;
const STATE_CANCELLED: u8 = 3;

/// Lifecycle state of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AioState {
    /// Recorded, worker not yet past its first cancellation check
    Submitted,
    /// Worker is inside or approaching the blocking operation
    Running,
    /// Result or error stored; ready for retrieval
    Done,
    /// Cancelled before completion; retrieval reports failure
    Cancelled,
}

impl AioState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            STATE_RUNNING => AioState::Running,
            STATE_DONE => AioState::Done,
            STATE_CANCELLED => AioState::Cancelled,
            _ => AioState::Submitted,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            AioState::Submitted => STATE_SUBMITTED,
            AioState::Running => STATE_RUNNING,
            AioState::Done => STATE_DONE,
            AioState::Cancelled => STATE_CANCELLED,
        }
    }
}

/// Handle identifying one submitted task
///
/// This is the manager-private slot stashed in the control block's
/// place: the sequence id under which the task is tracked. Handles are
/// single-use — retrieval releases the task and invalidates the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AioHandle(pub(crate) TaskId);

impl AioHandle {
    /// Sequence id backing this handle (diagnostics only)
    #[inline]
    pub fn id(&self) -> TaskId {
        self.0
    }
}

/// Outcome of a completed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AioCompletion {
    /// Bytes transferred; for writes this is always the full request
    /// length, for reads it may be short at end-of-file
    pub bytes: usize,
    /// Data read from the file (`None` for writes)
    pub data: Option<Vec<u8>>,
}

/// Task state shared between the manager, the worker, and waiters
pub(crate) struct TaskShared {
    pub(crate) seq: TaskId,
    pub(crate) fd: Fd,
    pub(crate) op: AioOp,
    pub(crate) notify: NotifyMode,
    state: AtomicU8,
    /// Completion flag, set under the manager's completion mutex
    pub(crate) done: AtomicBool,
    /// Cooperative cancellation: checked by the worker before its
    /// blocking call and again (under the completion mutex) after it
    pub(crate) cancel_requested: AtomicBool,
    pub(crate) outcome: Mutex<Option<AioResult<AioCompletion>>>,
}

impl TaskShared {
    pub(crate) fn new(seq: TaskId, fd: Fd, op: AioOp, notify: NotifyMode) -> Self {
        Self {
            seq,
            fd,
            op,
            notify,
            state: AtomicU8::new(STATE_SUBMITTED),
            done: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            outcome: Mutex::new(None),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> AioState {
        AioState::from_u8(self.state.load(Ordering::SeqCst))
    }

    #[inline]
    pub(crate) fn set_state(&self, state: AioState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Transition SUBMITTED -> RUNNING; fails if a cancel got in first
    #[inline]
    pub(crate) fn begin_running(&self) -> bool {
        self.state
            .compare_exchange(
                STATE_SUBMITTED,
                STATE_RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

/// Table entry: the shared state plus the worker's join handle
pub(crate) struct AioTask {
    pub(crate) shared: Arc<TaskShared>,
    pub(crate) worker: Option<JoinHandle<()>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip() {
        for state in [
            AioState::Submitted,
            AioState::Running,
            AioState::Done,
            AioState::Cancelled,
        ] {
            assert_eq!(AioState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn test_shared_state_transitions() {
        let shared = TaskShared::new(1, 3, AioOp::Read, NotifyMode::Broadcast);
        assert_eq!(shared.state(), AioState::Submitted);
        shared.set_state(AioState::Running);
        assert_eq!(shared.state(), AioState::Running);
        shared.set_state(AioState::Done);
        assert_eq!(shared.state(), AioState::Done);
    }
}
