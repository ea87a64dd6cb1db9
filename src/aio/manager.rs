/*!
 * Asynchronous I/O Task Manager
 *
 * Thread-per-request emulation of asynchronous I/O: each submitted read
 * or write gets one worker thread that performs the positioned
 * operation and announces completion through a shared mutex/condvar
 * pair, so a caller can block efficiently on many outstanding requests
 * instead of polling.
 *
 * # Cancellation
 *
 * Cancellation is cooperative. The worker checks a cancel-requested
 * flag before its blocking call and the completion path re-checks it
 * under the completion mutex, so a cancel that wins the race discards
 * the worker's result. A worker already inside the blocking call
 * finishes it; the result is then thrown away.
 */

use crate::aio::request::{AioOp, AioRequest, NotifyMode};
use crate::aio::task::{AioCompletion, AioHandle, AioState, AioTask, TaskShared};
use crate::core::errors::AioError;
use crate::core::limits::{AIO_WAIT_SLICE, AIO_WORKER_THREAD_NAME};
use crate::core::types::{AioResult, Fd, TaskId};
use crate::sync::{Condvar, Mutex, MutexKind};
use ahash::RandomState;
use dashmap::DashMap;
use serde::Serialize;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Outcome of a cancellation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The task was still in flight and is now cancelled
    Cancelled,
    /// Nothing to cancel: descriptor mismatch, unknown handle, or the
    /// task already finished ("fully completed")
    AllDone,
}

/// Batch submission mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Block until every member of the batch completes
    Wait,
    /// Return as soon as the batch is submitted
    NoWait,
}

/// Statistics snapshot for the manager
#[derive(Debug, Clone, Serialize)]
pub struct AioStats {
    pub submitted: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub retrieved: u64,
    /// Tasks recorded and not yet retrieved
    pub in_flight: usize,
}

/// Internal counters
///
/// Cache-line aligned to prevent false sharing
#[repr(C, align(64))]
#[derive(Default)]
struct ManagerCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
    retrieved: AtomicU64,
}

struct ManagerInner {
    tasks: DashMap<TaskId, AioTask, RandomState>,
    seq: AtomicU64,
    /// Completion is recorded and observed under this pair
    completion_lock: Mutex,
    completion_cond: Condvar,
    counters: ManagerCounters,
}

/// Asynchronous I/O task manager
///
/// Owns each task from submission until the caller retrieves the result
/// or cancels it. Cloning shares the same task table.
#[derive(Clone)]
pub struct AioManager {
    inner: Arc<ManagerInner>,
}

impl AioManager {
    /// Create a new manager with an empty task table
    pub fn new() -> Self {
        info!("Initializing asynchronous I/O task manager");
        Self {
            inner: Arc::new(ManagerInner {
                tasks: DashMap::with_hasher(RandomState::new()),
                seq: AtomicU64::new(1),
                completion_lock: Mutex::new(MutexKind::Normal),
                completion_cond: Condvar::new(),
                counters: ManagerCounters::default(),
            }),
        }
    }

    /// Submit a request, spawning one worker thread for it
    pub fn submit(&self, request: AioRequest) -> AioResult<AioHandle> {
        let AioRequest {
            file,
            op,
            buf,
            len,
            offset,
            notify,
        } = request;

        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst);
        let fd = {
            use std::os::unix::io::AsRawFd;
            file.as_raw_fd()
        };
        let shared = Arc::new(TaskShared::new(seq, fd, op, notify));

        let worker = {
            let inner = self.inner.clone();
            let shared = shared.clone();
            thread::Builder::new()
                .name(format!("{AIO_WORKER_THREAD_NAME}-{seq}"))
                .spawn(move || Self::worker_main(inner, shared, file, buf, len, offset))
                .map_err(|e| {
                    error!(seq = seq, error = %e, "failed to spawn aio worker");
                    AioError::WorkerSpawn(e.to_string())
                })?
        };

        self.inner.tasks.insert(
            seq,
            AioTask {
                shared,
                worker: Some(worker),
            },
        );
        self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(
            seq = seq,
            fd = fd,
            op = op.name(),
            len = len,
            offset = offset,
            "aio task submitted"
        );
        Ok(AioHandle(seq))
    }

    /// Submit a positioned read of `len` bytes at `offset`
    pub fn submit_read(&self, file: Arc<File>, len: usize, offset: u64) -> AioResult<AioHandle> {
        self.submit(AioRequest::read(file, len, offset))
    }

    /// Submit a positioned write of `data` at `offset`
    pub fn submit_write(&self, file: Arc<File>, data: Vec<u8>, offset: u64) -> AioResult<AioHandle> {
        self.submit(AioRequest::write(file, data, offset))
    }

    /// Submit a batch; with `ListMode::Wait`, block until every member
    /// completes (results are still retrieved individually)
    pub fn submit_list(
        &self,
        requests: Vec<AioRequest>,
        mode: ListMode,
    ) -> AioResult<Vec<AioHandle>> {
        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            handles.push(self.submit(request)?);
        }
        if mode == ListMode::Wait {
            for &handle in &handles {
                self.wait_any(std::slice::from_ref(&handle), None)?;
            }
        }
        Ok(handles)
    }

    /// Current lifecycle state of a task
    pub fn status(&self, handle: AioHandle) -> AioResult<AioState> {
        let task = self
            .inner
            .tasks
            .get(&handle.0)
            .ok_or(AioError::InvalidHandle)?;
        Ok(task.shared.state())
    }

    /// Error-query semantics: `Err(InProgress)` while the task runs,
    /// `Ok(())` once it completed successfully, else the stored error
    pub fn error(&self, handle: AioHandle) -> AioResult<()> {
        let shared = {
            let task = self
                .inner
                .tasks
                .get(&handle.0)
                .ok_or(AioError::InvalidHandle)?;
            task.shared.clone()
        };

        if !shared.done.load(Ordering::SeqCst) {
            if shared.state() == AioState::Cancelled {
                return Err(AioError::Cancelled);
            }
            return Err(AioError::InProgress);
        }
        let result = match &*shared.outcome.lock() {
            Some(Ok(_)) => Ok(()),
            Some(Err(e)) => Err(e.clone()),
            None => Err(AioError::InProgress),
        };
        result
    }

    /// Retrieve the outcome, blocking until the worker finishes
    ///
    /// Returns the outcome exactly once and releases the task; the
    /// handle is invalid afterwards.
    pub fn retrieve(&self, handle: AioHandle) -> AioResult<AioCompletion> {
        let (_, mut task) = self
            .inner
            .tasks
            .remove(&handle.0)
            .ok_or(AioError::InvalidHandle)?;

        if let Some(worker) = task.worker.take() {
            if worker.join().is_err() {
                error!(seq = handle.0, "aio worker panicked");
                return Err(AioError::Io("worker thread panicked".to_string()));
            }
        }

        self.inner.counters.retrieved.fetch_add(1, Ordering::Relaxed);
        debug!(seq = handle.0, "aio result retrieved");

        let outcome = task.shared.outcome.lock().take();
        outcome.unwrap_or(Err(AioError::Cancelled))
    }

    /// Block until any listed task completes or the timeout elapses
    ///
    /// A handle whose result was already retrieved counts as complete.
    /// Waits on the shared condition variable — no poll loop.
    pub fn wait_any(
        &self,
        handles: &[AioHandle],
        timeout: Option<Duration>,
    ) -> AioResult<AioHandle> {
        if handles.is_empty() {
            return Err(AioError::InvalidHandle);
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        self.inner.completion_lock.lock()?;

        let result = loop {
            if let Some(handle) = handles.iter().find(|h| self.is_complete(**h)) {
                break Ok(*handle);
            }

            // Bounded wait slice: Polled tasks never broadcast, and the
            // re-check caps the cost of a missed wake either way
            let slice = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        break Err(AioError::Timeout);
                    }
                    (d - now).min(AIO_WAIT_SLICE)
                }
                None => AIO_WAIT_SLICE,
            };
            let _ = self
                .inner
                .completion_cond
                .timed_wait(&self.inner.completion_lock, slice);
        };

        self.inner.completion_lock.unlock()?;
        result
    }

    /// Cancel a task, if the descriptor matches and it has not finished
    ///
    /// A mismatch, an unknown handle, or a finished task reports
    /// `AllDone` with no side effects — the operation keeps running.
    pub fn cancel(&self, fd: Fd, handle: AioHandle) -> AioResult<CancelOutcome> {
        let shared = match self.inner.tasks.get(&handle.0) {
            Some(task) => task.shared.clone(),
            None => return Ok(CancelOutcome::AllDone),
        };
        if shared.fd != fd {
            return Ok(CancelOutcome::AllDone);
        }

        // Serialize against the worker's completion path so exactly one
        // side wins: either the result is discarded or we report AllDone
        self.inner.completion_lock.lock()?;
        let outcome = if shared.done.load(Ordering::SeqCst) {
            CancelOutcome::AllDone
        } else {
            shared.cancel_requested.store(true, Ordering::SeqCst);
            shared.set_state(AioState::Cancelled);
            self.inner.counters.cancelled.fetch_add(1, Ordering::Relaxed);
            CancelOutcome::Cancelled
        };
        self.inner.completion_lock.unlock()?;

        if outcome == CancelOutcome::Cancelled {
            info!(seq = handle.0, fd = fd, "aio task cancelled");
        }
        Ok(outcome)
    }

    /// Number of tasks submitted and not yet complete
    pub fn pending(&self) -> usize {
        self.inner
            .tasks
            .iter()
            .filter(|task| !task.shared.done.load(Ordering::SeqCst))
            .count()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> AioStats {
        AioStats {
            submitted: self.inner.counters.submitted.load(Ordering::Relaxed),
            completed: self.inner.counters.completed.load(Ordering::Relaxed),
            cancelled: self.inner.counters.cancelled.load(Ordering::Relaxed),
            retrieved: self.inner.counters.retrieved.load(Ordering::Relaxed),
            in_flight: self.inner.tasks.len(),
        }
    }

    #[inline]
    fn is_complete(&self, handle: AioHandle) -> bool {
        match self.inner.tasks.get(&handle.0) {
            Some(task) => task.shared.done.load(Ordering::SeqCst),
            // Already retrieved counts as complete
            None => true,
        }
    }

    fn worker_main(
        inner: Arc<ManagerInner>,
        shared: Arc<TaskShared>,
        file: Arc<File>,
        buf: Vec<u8>,
        len: usize,
        offset: u64,
    ) {
        // First cancellation check: a cancel that landed before the
        // worker got scheduled skips the I/O entirely
        if !shared.begin_running() {
            Self::complete(&inner, &shared, Err(AioError::Cancelled));
            return;
        }

        let outcome = Self::perform_io(&file, shared.op, &buf, len, offset);
        Self::complete(&inner, &shared, outcome);
    }

    fn perform_io(
        file: &File,
        op: AioOp,
        buf: &[u8],
        len: usize,
        offset: u64,
    ) -> AioResult<AioCompletion> {
        match op {
            AioOp::Read => {
                let mut data = vec![0u8; len];
                let bytes = file.read_at(&mut data, offset)?;
                data.truncate(bytes);
                Ok(AioCompletion {
                    bytes,
                    data: Some(data),
                })
            }
            AioOp::Write => {
                file.write_all_at(buf, offset)?;
                Ok(AioCompletion {
                    bytes: buf.len(),
                    data: None,
                })
            }
        }
    }

    fn complete(inner: &ManagerInner, shared: &TaskShared, outcome: AioResult<AioCompletion>) {
        // A normal mutex's lock cannot fail; bail out rather than
        // publish the completion unsynchronized
        if inner.completion_lock.lock().is_err() {
            return;
        }

        // Second cancellation check, under the completion mutex: a
        // cancel that won the race discards the worker's result
        let outcome = if shared.cancel_requested.load(Ordering::SeqCst) {
            Err(AioError::Cancelled)
        } else {
            outcome
        };
        let cancelled = matches!(outcome, Err(AioError::Cancelled));

        *shared.outcome.lock() = Some(outcome);
        shared.set_state(if cancelled {
            AioState::Cancelled
        } else {
            AioState::Done
        });
        shared.done.store(true, Ordering::SeqCst);
        inner.counters.completed.fetch_add(1, Ordering::Relaxed);

        if shared.notify == NotifyMode::Broadcast {
            inner.completion_cond.broadcast();
        }
        let _ = inner.completion_lock.unlock();

        debug!(
            seq = shared.seq,
            op = shared.op.name(),
            cancelled = cancelled,
            "aio task completed"
        );
    }
}

impl Default for AioManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file_with(content: &[u8]) -> Arc<File> {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(content).unwrap();
        Arc::new(file)
    }

    #[test]
    fn test_write_then_retrieve_reports_byte_count() {
        let manager = AioManager::new();
        let file = temp_file_with(b"");
        let payload = b"hello, positioned world".to_vec();

        let handle = manager.submit_write(file, payload.clone(), 0).unwrap();
        manager.wait_any(&[handle], Some(Duration::from_secs(5))).unwrap();

        let completion = manager.retrieve(handle).unwrap();
        assert_eq!(completion.bytes, payload.len());
        assert!(completion.data.is_none());
    }

    #[test]
    fn test_read_at_offset() {
        let manager = AioManager::new();
        let file = temp_file_with(b"0123456789");

        let handle = manager.submit_read(file, 4, 3).unwrap();
        let completion = manager.retrieve(handle).unwrap();
        assert_eq!(completion.bytes, 4);
        assert_eq!(completion.data.as_deref(), Some(&b"3456"[..]));
    }

    #[test]
    fn test_short_read_at_eof() {
        let manager = AioManager::new();
        let file = temp_file_with(b"abc");

        let handle = manager.submit_read(file, 16, 0).unwrap();
        let completion = manager.retrieve(handle).unwrap();
        assert_eq!(completion.bytes, 3);
        assert_eq!(completion.data.as_deref(), Some(&b"abc"[..]));
    }

    #[test]
    fn test_retrieve_is_single_use() {
        let manager = AioManager::new();
        let file = temp_file_with(b"x");

        let handle = manager.submit_read(file, 1, 0).unwrap();
        manager.retrieve(handle).unwrap();
        assert_eq!(manager.retrieve(handle), Err(AioError::InvalidHandle));
        assert_eq!(manager.status(handle), Err(AioError::InvalidHandle));
    }

    #[test]
    fn test_cancel_with_mismatched_descriptor_is_all_done() {
        let manager = AioManager::new();
        let file = temp_file_with(b"data");

        let handle = manager.submit_read(file, 4, 0).unwrap();
        let outcome = manager.cancel(-1, handle).unwrap();
        assert_eq!(outcome, CancelOutcome::AllDone);

        // The operation was left running and completes normally
        let completion = manager.retrieve(handle).unwrap();
        assert_eq!(completion.bytes, 4);
    }

    #[test]
    fn test_stats_track_lifecycle() {
        let manager = AioManager::new();
        let file = temp_file_with(b"stats");

        let handle = manager.submit_read(file, 5, 0).unwrap();
        manager.retrieve(handle).unwrap();

        let stats = manager.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.retrieved, 1);
        assert_eq!(stats.in_flight, 0);
    }
}
