/*!
 * Wait Strategy Configuration
 *
 * Runtime configuration for wait strategy selection
 */

use crate::core::limits::{DEFAULT_MAX_SPINS, DEFAULT_SPIN_DURATION};
use std::time::Duration;

/// Strategy type selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyType {
    /// Futex-based parking (fastest; direct futex syscalls on Linux)
    Futex,
    /// Condvar-based parking (cross-platform, reliable)
    Condvar,
    /// Sleep-based polling (no wakeup guarantee, bounded extra latency)
    SpinWait,
    /// Auto-select based on platform
    Auto,
}

/// Wait primitive configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Preferred strategy
    pub strategy: StrategyType,
    /// Spin budget before the polling strategy sleeps (for SpinWait)
    pub spin_duration: Duration,
    /// Maximum spin iterations before sleeping (for SpinWait)
    pub max_spins: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyType::Auto,
            spin_duration: DEFAULT_SPIN_DURATION,
            max_spins: DEFAULT_MAX_SPINS,
        }
    }
}

impl SyncConfig {
    /// Configuration optimized for very short expected waits
    pub const fn low_latency() -> Self {
        Self {
            strategy: StrategyType::SpinWait,
            spin_duration: Duration::from_micros(50),
            max_spins: 500,
        }
    }

    /// Select best strategy for current platform
    pub fn select_strategy(&self) -> StrategyType {
        match self.strategy {
            StrategyType::Auto => {
                // Prefer futex on Linux, condvar elsewhere
                #[cfg(target_os = "linux")]
                {
                    StrategyType::Futex
                }
                #[cfg(not(target_os = "linux"))]
                {
                    StrategyType::Condvar
                }
            }
            other => other,
        }
    }
}
