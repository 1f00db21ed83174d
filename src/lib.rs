// ============================================================================
// Batchguard Library
// ============================================================================

pub mod alert;
pub mod core;
pub mod disk;
pub mod queue;
pub mod recovery;
pub mod retry;

// Re-export main types for convenience
pub use self::core::{
    ErrorContext, Failure, FailureKind, Metadata, RecoveryAction, RecoveryError, RecoveryResult,
    RecoveryStats, RecoveryStatsSnapshot, Result, Severity,
};

pub use alert::{AlertDispatcher, AlertHandler, AlertRecord, JsonlFileSink, tracing_sink};
pub use disk::{
    CleanupReport, DiskMonitor, DiskMonitorConfig, DiskPathStatus, DiskSpaceReport, DiskStatus,
    DiskThresholds,
};
pub use queue::{LocalQueue, QueueConfig, QueuedOperation};
pub use recovery::{
    AlertConfig, HealthProbe, HealthReport, MaintenanceReport, ProbeReport, QueueProcessReport,
    QueuedOperationHandler, RecoveryConfig, RecoveryOrchestrator, RecoveryWorker, RestartState,
    TcpHealthProbe, WorkerConfig, run_until_shutdown, shutdown_signal, spawn_recovery_worker,
};
pub use retry::{Classification, RetryExecutor, RetryOutcome, RetryPolicy, classify};
