/*!
 * System Limits and Constants
 *
 * Centralized location for all system-wide limits, thresholds, and magic numbers.
 * Organized by domain for maintainability and discoverability.
 *
 * ## Design Philosophy
 * - All values include rationale comments explaining WHY they exist
 * - Performance-critical constants are marked with [PERF]
 * - POSIX-compatible values are marked with [POSIX-COMPAT]
 */

use std::time::Duration;

// =============================================================================
// WAIT/WAKE PRIMITIVE
// =============================================================================

/// Parking slot count for the wait strategies (512 slots)
/// [PERF] Higher count reduces contention, must be power of 2
pub const WAIT_PARKING_SLOTS: usize = 512;

/// Bounded park slice for indefinite acquisition loops (1ms)
/// A wake missed under the fallback strategies costs at most one slice
/// before the waiter re-checks the word.
pub const LOCK_PARK_SLICE: Duration = Duration::from_millis(1);

/// Spin iterations in the tight-spin phase of the backoff
/// [PERF] ~20ns overhead per iteration
pub const BACKOFF_SPIN_ITERS: u32 = 10;

/// Iterations in the yield phase before sleeping begins
pub const BACKOFF_YIELD_ITERS: u32 = 50;

/// Maximum exponential-backoff sleep (1ms)
/// [PERF] Prevents excessive latency on contended locks
pub const MAX_BACKOFF_NANOS: u64 = 1_000_000;

/// Default spin duration before the spinwait strategy falls back to sleeping
pub const DEFAULT_SPIN_DURATION: Duration = Duration::from_micros(50);

/// Default maximum spin iterations for the spinwait strategy
pub const DEFAULT_MAX_SPINS: u32 = 500;

// =============================================================================
// TLS KEY REGISTRY
// =============================================================================

/// Thread-local-storage key table capacity (64 slots)
/// [POSIX-COMPAT] Mirrors common PTHREAD_KEYS_MAX lower bound territory;
/// fixed so lookup stays constant-time and the table never reallocates
pub const TLS_KEYS_MAX: usize = 64;

// =============================================================================
// SEMAPHORES
// =============================================================================

/// Maximum counting-semaphore value
/// [POSIX-COMPAT] SEM_VALUE_MAX analogue; post() past this is an error
pub const SEM_VALUE_MAX: u32 = u32::MAX - 1;

// =============================================================================
// ASYNCHRONOUS I/O
// =============================================================================

/// Re-check slice while blocked in wait_any (10ms)
/// Bounds the window in which a completion broadcast could be missed
pub const AIO_WAIT_SLICE: Duration = Duration::from_millis(10);

/// Name prefix for aio worker threads (diagnostics only)
pub const AIO_WORKER_THREAD_NAME: &str = "aio-worker";
