/*!
 * Asynchronous I/O
 *
 * Thread-per-request asynchronous I/O emulation: submission creates a
 * task and spawns one worker thread per outstanding request; completion
 * is tracked through a shared mutex/condvar pair. This deliberately
 * emulates asynchronous I/O rather than wrapping a completion-queue
 * kernel mechanism.
 */

mod manager;
mod request;
mod task;

pub use manager::{AioManager, AioStats, CancelOutcome, ListMode};
pub use request::{AioOp, AioRequest, NotifyMode};
pub use task::{AioCompletion, AioHandle, AioState};
