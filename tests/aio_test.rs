/*!
 * Asynchronous I/O Integration Tests
 *
 * File-backed properties of the thread-per-request task manager:
 * submission, completion waiting, single-shot retrieval, and the two
 * distinguished cancel outcomes
 */

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::time::Duration;
use threadcore::{
    AioError, AioManager, AioRequest, AioState, CancelOutcome, ListMode,
};

fn temp_file_with(content: &[u8]) -> Arc<File> {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(content).unwrap();
    Arc::new(file)
}

#[test]
fn test_write_then_wait_reports_exact_byte_count() {
    let manager = AioManager::new();
    let file = temp_file_with(b"");
    let payload = b"exactly these bytes".to_vec();

    let handle = manager.submit_write(file.clone(), payload.clone(), 0).unwrap();
    let completed = manager
        .wait_any(&[handle], Some(Duration::from_secs(5)))
        .unwrap();
    assert_eq!(completed, handle);

    assert!(manager.error(handle).is_ok());
    let completion = manager.retrieve(handle).unwrap();
    assert_eq!(completion.bytes, payload.len());

    // The bytes really landed at offset 0
    let mut readback = Vec::new();
    let mut f = file.as_ref();
    f.seek(SeekFrom::Start(0)).unwrap();
    f.read_to_end(&mut readback).unwrap();
    assert_eq!(readback, payload);
}

#[test]
fn test_read_round_trip_at_offset() {
    let manager = AioManager::new();
    let file = temp_file_with(b"....the middle part....");

    let handle = manager.submit_read(file, 15, 4).unwrap();
    manager
        .wait_any(&[handle], Some(Duration::from_secs(5)))
        .unwrap();

    let completion = manager.retrieve(handle).unwrap();
    assert_eq!(completion.bytes, 15);
    assert_eq!(completion.data.as_deref(), Some(&b"the middle part"[..]));
}

#[test]
fn test_status_progresses_to_done() {
    let manager = AioManager::new();
    let file = temp_file_with(b"status");

    let handle = manager.submit_read(file, 6, 0).unwrap();
    manager
        .wait_any(&[handle], Some(Duration::from_secs(5)))
        .unwrap();

    assert_eq!(manager.status(handle).unwrap(), AioState::Done);
    assert!(manager.error(handle).is_ok());
    manager.retrieve(handle).unwrap();
}

#[test]
fn test_retrieval_is_single_shot() {
    let manager = AioManager::new();
    let file = temp_file_with(b"once");

    let handle = manager.submit_read(file, 4, 0).unwrap();
    manager.retrieve(handle).unwrap();

    assert_eq!(manager.retrieve(handle), Err(AioError::InvalidHandle));
    assert_eq!(manager.error(handle), Err(AioError::InvalidHandle));
}

#[test]
fn test_cancel_with_mismatched_descriptor_reports_all_done() {
    let manager = AioManager::new();
    let file = temp_file_with(b"keep running");

    let handle = manager.submit_read(file, 12, 0).unwrap();

    // Wrong descriptor: nothing to cancel, no side effects
    let outcome = manager.cancel(-1, handle).unwrap();
    assert_eq!(outcome, CancelOutcome::AllDone);

    // The operation was left running and completes normally
    let completion = manager.retrieve(handle).unwrap();
    assert_eq!(completion.bytes, 12);
}

#[test]
fn test_cancel_in_flight_then_retrieval_fails() {
    use std::os::unix::io::AsRawFd;

    let manager = AioManager::new();
    let file = temp_file_with(b"cancel me");
    let fd = file.as_raw_fd();

    // The cancel races the worker; submitting and cancelling
    // immediately wins often enough that a bounded number of attempts
    // always observes a successful cancel.
    let mut saw_cancel = false;
    for _ in 0..200 {
        let handle = manager.submit_read(file.clone(), 9, 0).unwrap();
        match manager.cancel(fd, handle).unwrap() {
            CancelOutcome::Cancelled => {
                // A cancelled task's retrieval reports failure
                assert_eq!(manager.retrieve(handle), Err(AioError::Cancelled));
                saw_cancel = true;
                break;
            }
            CancelOutcome::AllDone => {
                // Worker won the race; the result is intact
                let completion = manager.retrieve(handle).unwrap();
                assert_eq!(completion.bytes, 9);
            }
        }
    }
    assert!(saw_cancel, "no cancel won the race in 200 attempts");
}

#[test]
fn test_cancel_after_completion_reports_all_done() {
    use std::os::unix::io::AsRawFd;

    let manager = AioManager::new();
    let file = temp_file_with(b"done already");
    let fd = file.as_raw_fd();

    let handle = manager.submit_read(file, 4, 0).unwrap();
    manager
        .wait_any(&[handle], Some(Duration::from_secs(5)))
        .unwrap();

    assert_eq!(manager.cancel(fd, handle).unwrap(), CancelOutcome::AllDone);
    manager.retrieve(handle).unwrap();
}

#[test]
fn test_wait_any_returns_some_member() {
    let manager = AioManager::new();
    let file = temp_file_with(b"abcdefgh");

    let handles: Vec<_> = (0..4)
        .map(|i| manager.submit_read(file.clone(), 2, i * 2).unwrap())
        .collect();

    let winner = manager
        .wait_any(&handles, Some(Duration::from_secs(5)))
        .unwrap();
    assert!(handles.contains(&winner));

    for handle in handles {
        manager.retrieve(handle).unwrap();
    }
}

#[test]
fn test_wait_any_empty_set_is_invalid() {
    let manager = AioManager::new();
    assert_eq!(
        manager.wait_any(&[], Some(Duration::from_millis(10))),
        Err(AioError::InvalidHandle)
    );
}

#[test]
fn test_submit_list_wait_completes_every_member() {
    let manager = AioManager::new();
    let file = temp_file_with(b"0123456789abcdef");

    let requests = (0..4)
        .map(|i| AioRequest::read(file.clone(), 4, i * 4))
        .collect();

    let handles = manager.submit_list(requests, ListMode::Wait).unwrap();
    assert_eq!(handles.len(), 4);

    // Every member is done by the time the batch call returns
    for &handle in &handles {
        assert_eq!(manager.status(handle).unwrap(), AioState::Done);
    }

    let mut seen = Vec::new();
    for handle in handles {
        let completion = manager.retrieve(handle).unwrap();
        seen.push(completion.data.unwrap());
    }
    assert_eq!(seen[0], b"0123");
    assert_eq!(seen[3], b"cdef");
}

#[test]
fn test_submit_list_nowait_returns_immediately() {
    let manager = AioManager::new();
    let file = temp_file_with(b"batch");

    let requests = (0..3).map(|_| AioRequest::read(file.clone(), 5, 0)).collect();
    let handles = manager.submit_list(requests, ListMode::NoWait).unwrap();
    assert_eq!(handles.len(), 3);

    for handle in handles {
        manager
            .wait_any(&[handle], Some(Duration::from_secs(5)))
            .unwrap();
        manager.retrieve(handle).unwrap();
    }
}

#[test]
fn test_stats_reflect_activity() {
    let manager = AioManager::new();
    let file = temp_file_with(b"counters");

    for _ in 0..3 {
        let handle = manager.submit_read(file.clone(), 8, 0).unwrap();
        manager.retrieve(handle).unwrap();
    }

    let stats = manager.stats();
    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.retrieved, 3);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(manager.pending(), 0);
}
