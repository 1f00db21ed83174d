pub mod config;
pub mod orchestrator;
pub mod probe;
pub mod restart;
pub mod worker;

pub use config::{AlertConfig, RecoveryConfig, WorkerConfig};
pub use orchestrator::{
    HealthReport, MaintenanceReport, QUEUEABLE_OPERATIONS, QueueProcessReport,
    RecoveryOrchestrator, is_queueable,
};
pub use probe::{
    HealthProbe, ProbeReplayHandler, ProbeReport, QueuedOperationHandler, TcpHealthProbe,
};
pub use restart::RestartState;
pub use worker::{RecoveryWorker, run_until_shutdown, shutdown_signal, spawn_recovery_worker};
