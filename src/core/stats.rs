use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide recovery counters.
///
/// Counters only ever increase; they are reset by constructing a new
/// instance, which happens once per process.
#[derive(Debug, Default)]
pub struct RecoveryStats {
    total_errors: AtomicU64,
    successful_recoveries: AtomicU64,
    failed_recoveries: AtomicU64,
    retry_attempts: AtomicU64,
    container_restarts: AtomicU64,
}

/// Point-in-time copy of [`RecoveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStatsSnapshot {
    pub total_errors: u64,
    pub successful_recoveries: u64,
    pub failed_recoveries: u64,
    pub retry_attempts: u64,
    pub container_restarts: u64,
}

impl RecoveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_success(&self) {
        self.successful_recoveries.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        self.failed_recoveries.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_retry_attempt(&self) {
        self.retry_attempts.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_restart(&self) {
        self.container_restarts.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> RecoveryStatsSnapshot {
        RecoveryStatsSnapshot {
            total_errors: self.total_errors.load(Ordering::SeqCst),
            successful_recoveries: self.successful_recoveries.load(Ordering::SeqCst),
            failed_recoveries: self.failed_recoveries.load(Ordering::SeqCst),
            retry_attempts: self.retry_attempts.load(Ordering::SeqCst),
            container_restarts: self.container_restarts.load(Ordering::SeqCst),
        }
    }
}
