use super::config::RecoveryConfig;
use super::probe::{
    HealthProbe, ProbeReplayHandler, ProbeReport, QueuedOperationHandler, probe_healthy,
};
use super::restart::{RestartState, read_restart_state, write_restart_state};
use crate::alert::{AlertDispatcher, AlertHandler, AlertRecord};
use crate::core::{
    ErrorContext, Failure, FailureKind, Metadata, RecoveryAction, RecoveryResult, RecoveryStats,
    RecoveryStatsSnapshot, Result, Severity,
};
use crate::disk::{CleanupReport, DiskMonitor, DiskSpaceReport, DiskStatus};
use crate::queue::{LocalQueue, QueuedOperation};
use crate::retry::{RetryExecutor, classify};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

/// Operations that may be deferred to the local queue when the database is
/// unavailable. Matched as substrings of the reported operation name.
pub const QUEUEABLE_OPERATIONS: &[&str] = &[
    "database_insert",
    "database_update",
    "log_entry",
    "metric_update",
    "status_update",
];

/// Prefix of operations replayed through the health probe by default.
pub const DATABASE_OPERATION_PREFIX: &str = "database_";

pub fn is_queueable(operation: &str) -> bool {
    QUEUEABLE_OPERATIONS
        .iter()
        .any(|queueable| operation.contains(queueable))
}

/// Counters for one pass over the local queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueProcessReport {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub requeued: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub queue: QueueProcessReport,
    pub disk: DiskSpaceReport,
    pub cleanup: Option<CleanupReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub stats: RecoveryStatsSnapshot,
    pub queue_size: usize,
    pub queue_capacity: usize,
    pub alert_history_len: usize,
    pub disk: DiskSpaceReport,
}

/// Single point deciding what happens to a reported failure.
///
/// Transient failures are retried against the health probe; failures that
/// survive retry are queued locally when the operation allows it and fail
/// fast otherwise. Every decision is also pushed to the alert dispatcher.
pub struct RecoveryOrchestrator {
    config: RecoveryConfig,
    stats: Arc<RecoveryStats>,
    retry: RetryExecutor,
    queue: Arc<LocalQueue>,
    disk: DiskMonitor,
    alerts: Arc<AlertDispatcher>,
    probe: Arc<dyn HealthProbe>,
    queue_handlers: RwLock<Vec<(String, Arc<dyn QueuedOperationHandler>)>>,
}

impl RecoveryOrchestrator {
    /// Builds every component from `config`, restoring the local queue from
    /// its snapshot.
    pub async fn open(config: RecoveryConfig, probe: Arc<dyn HealthProbe>) -> Result<Self> {
        config.validate()?;
        let queue = Arc::new(LocalQueue::open(config.queue.clone()).await?);
        let alerts = Arc::new(AlertDispatcher::new(config.alerts.history_limit));
        Ok(Self::from_parts(
            config,
            probe,
            queue,
            alerts,
            Arc::new(RecoveryStats::new()),
        ))
    }

    /// Assembles an orchestrator around existing components.
    pub fn from_parts(
        config: RecoveryConfig,
        probe: Arc<dyn HealthProbe>,
        queue: Arc<LocalQueue>,
        alerts: Arc<AlertDispatcher>,
        stats: Arc<RecoveryStats>,
    ) -> Self {
        let retry = RetryExecutor::new(config.retry.clone(), stats.clone());
        let disk = DiskMonitor::new(config.disk.clone());
        let default_handler: Arc<dyn QueuedOperationHandler> =
            Arc::new(ProbeReplayHandler::new(probe.clone()));

        Self {
            config,
            stats,
            retry,
            queue,
            disk,
            alerts,
            probe,
            queue_handlers: RwLock::new(vec![(
                DATABASE_OPERATION_PREFIX.to_string(),
                default_handler,
            )]),
        }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<LocalQueue> {
        &self.queue
    }

    pub fn alerts(&self) -> &Arc<AlertDispatcher> {
        &self.alerts
    }

    pub fn disk_monitor(&self) -> &DiskMonitor {
        &self.disk
    }

    pub fn recovery_stats(&self) -> RecoveryStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn add_alert_handler(&self, handler: AlertHandler) {
        self.alerts.add_handler(handler);
    }

    pub fn alert_history(&self, limit: usize) -> Vec<AlertRecord> {
        self.alerts.history(limit)
    }

    /// Registers a replay handler for queued operations whose name starts
    /// with `prefix`. The longest matching prefix wins.
    pub fn register_queue_handler(&self, prefix: &str, handler: Arc<dyn QueuedOperationHandler>) {
        let mut handlers = self
            .queue_handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        handlers.retain(|(existing, _)| existing != prefix);
        handlers.push((prefix.to_string(), handler));
    }

    /// Decides the disposition of one failure. Never fails.
    pub async fn handle_error(
        &self,
        failure: &Failure,
        component: &str,
        operation: &str,
        context: Metadata,
    ) -> RecoveryResult {
        let span = info_span!(
            "recovery.handle_error",
            component = %component,
            operation = %operation,
            kind = %failure.kind
        );
        self.handle_error_inner(failure, component, operation, context)
            .instrument(span)
            .await
    }

    async fn handle_error_inner(
        &self,
        failure: &Failure,
        component: &str,
        operation: &str,
        context: Metadata,
    ) -> RecoveryResult {
        let started = Instant::now();
        let classification = classify(failure);
        let error_context = ErrorContext::new(
            failure,
            component,
            operation,
            classification.severity,
            context.clone(),
        );
        self.stats.record_error();

        warn!(
            error = %failure,
            severity = %classification.severity,
            transient = classification.transient,
            "failure reported"
        );

        let mut attempts = 0;
        if classification.transient {
            let outcome = self.retry.run(|| self.probe_once()).await;
            attempts = outcome.attempts;
            match outcome.result {
                Ok(report) => {
                    self.stats.record_success();
                    info!(
                        attempts = attempts,
                        latency_ms = report.latency_ms,
                        "recovered by retry"
                    );
                    return RecoveryResult::new(
                        true,
                        RecoveryAction::Retry,
                        format!("Recovered after {} attempt(s)", attempts),
                    )
                    .with_retry_count(attempts)
                    .with_duration(started.elapsed())
                    .with_metadata("latency_ms", report.latency_ms);
                }
                Err(last) => {
                    warn!(attempts = attempts, error = %last, "retry did not recover");
                }
            }
        }

        if is_queueable(operation) {
            return self
                .queue_locally(operation, context, error_context, attempts, started)
                .await;
        }

        self.alerts.send_alert(
            Severity::Critical,
            &format!("Unrecoverable failure in {}", component),
            &format!("Operation '{}' failed: {}", operation, failure.message),
            alert_metadata(&error_context),
        );
        self.stats.record_failure();
        RecoveryResult::new(
            false,
            RecoveryAction::FailFast,
            format!("Operation '{}' is not recoverable: {}", operation, failure.message),
        )
        .with_retry_count(attempts)
        .with_duration(started.elapsed())
    }

    async fn queue_locally(
        &self,
        operation: &str,
        context: Metadata,
        error_context: ErrorContext,
        attempts: u32,
        started: Instant,
    ) -> RecoveryResult {
        let queued = QueuedOperation::new(
            operation,
            context,
            error_context.clone(),
            self.config.queue.max_retries,
        );
        let operation_id = queued.operation_id;

        if self.queue.enqueue(queued).await {
            let queue_size = self.queue.size().await;
            let mut metadata = alert_metadata(&error_context);
            metadata.insert("operation_id".to_string(), json!(operation_id));
            metadata.insert("queue_size".to_string(), json!(queue_size));
            self.alerts.send_alert(
                Severity::Medium,
                "Operation queued locally",
                &format!("Operation '{}' queued for later replay", operation),
                metadata,
            );
            return RecoveryResult::new(
                true,
                RecoveryAction::QueueLocally,
                format!("Operation '{}' queued locally", operation),
            )
            .with_retry_count(attempts)
            .with_duration(started.elapsed())
            .with_metadata("operation_id", operation_id.to_string())
            .with_metadata("queue_size", queue_size);
        }

        self.alerts.send_alert(
            Severity::Critical,
            "Local queue full",
            &format!(
                "Operation '{}' dropped: local queue is at capacity ({})",
                operation,
                self.queue.capacity()
            ),
            alert_metadata(&error_context),
        );
        self.stats.record_failure();
        RecoveryResult::new(
            false,
            RecoveryAction::FailFast,
            format!("Local queue full, operation '{}' dropped", operation),
        )
        .with_retry_count(attempts)
        .with_duration(started.elapsed())
    }

    async fn probe_once(&self) -> std::result::Result<ProbeReport, Failure> {
        probe_healthy(self.probe.as_ref()).await
    }

    /// Replays up to `drain_batch` queued operations.
    ///
    /// Operations requeued during this pass are not replayed again until the
    /// next call.
    pub async fn process_queued_operations(&self) -> QueueProcessReport {
        self.drain_queue(self.config.worker.drain_batch).await
    }

    async fn drain_queue(&self, limit: usize) -> QueueProcessReport {
        let mut report = QueueProcessReport::default();
        let batch = limit.min(self.queue.size().await);

        for _ in 0..batch {
            let Some(mut operation) = self.queue.try_dequeue().await else {
                break;
            };
            report.processed += 1;

            match self.replay(&operation).await {
                Ok(()) => {
                    report.successful += 1;
                    debug!(
                        operation = %operation.operation_name,
                        operation_id = %operation.operation_id,
                        "queued operation replayed"
                    );
                }
                Err(failure) if operation.can_retry() => {
                    operation.retry_count += 1;
                    debug!(
                        operation = %operation.operation_name,
                        retry_count = operation.retry_count,
                        error = %failure,
                        "queued operation failed, requeueing"
                    );
                    if self.queue.enqueue(operation.clone()).await {
                        report.requeued += 1;
                        continue;
                    }

                    report.failed += 1;
                    warn!(
                        operation = %operation.operation_name,
                        operation_id = %operation.operation_id,
                        retries = operation.retry_count,
                        error = %failure,
                        "local queue full on requeue, dropping"
                    );
                    let mut metadata = alert_metadata(&operation.error_context);
                    metadata.insert("operation_id".to_string(), json!(operation.operation_id));
                    self.alerts.send_alert(
                        Severity::High,
                        "Queued operation dropped",
                        &format!(
                            "Operation '{}' dropped: local queue full on requeue ({})",
                            operation.operation_name,
                            self.queue.capacity()
                        ),
                        metadata,
                    );
                }
                Err(failure) => {
                    report.failed += 1;
                    warn!(
                        operation = %operation.operation_name,
                        operation_id = %operation.operation_id,
                        retries = operation.retry_count,
                        error = %failure,
                        "queued operation exceeded max retries, dropping"
                    );
                    self.alerts.send_alert(
                        Severity::High,
                        "Queued operation dropped",
                        &format!(
                            "Operation '{}' failed after {} retries: {}",
                            operation.operation_name, operation.retry_count, failure.message
                        ),
                        alert_metadata(&operation.error_context),
                    );
                }
            }
        }

        if report.processed > 0 {
            info!(
                processed = report.processed,
                successful = report.successful,
                failed = report.failed,
                requeued = report.requeued,
                "processed queued operations"
            );
        }
        report
    }

    async fn replay(&self, operation: &QueuedOperation) -> std::result::Result<(), Failure> {
        let handler = {
            let handlers = self
                .queue_handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            handlers
                .iter()
                .filter(|(prefix, _)| operation.operation_name.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, handler)| handler.clone())
        };

        match handler {
            Some(handler) => handler.replay(operation).await,
            None => Err(Failure::new(
                FailureKind::Unknown,
                format!(
                    "no handler registered for operation '{}'",
                    operation.operation_name
                ),
            )),
        }
    }

    /// Records a container restart: persists the restart state, alerts, and
    /// bumps the restart counter.
    pub async fn handle_container_restart(&self, reason: &str) -> RecoveryResult {
        let started = Instant::now();
        let state = RestartState {
            restart_timestamp: Utc::now(),
            restart_reason: reason.to_string(),
            queue_size: self.queue.size().await,
            recovery_stats: self.stats.snapshot(),
        };

        let persisted = match write_restart_state(&self.config.restart_state_path, &state).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    path = %self.config.restart_state_path.display(),
                    error = %err,
                    "failed to persist restart state"
                );
                false
            }
        };

        let mut metadata = Metadata::new();
        metadata.insert("restart_reason".to_string(), json!(reason));
        metadata.insert("queue_size".to_string(), json!(state.queue_size));
        self.alerts.send_alert(
            Severity::High,
            "Container restart",
            &format!("Container restarting: {}", reason),
            metadata,
        );
        self.stats.record_restart();
        info!(reason = %reason, queue_size = state.queue_size, "container restart recorded");

        RecoveryResult::new(
            persisted,
            RecoveryAction::Restart,
            format!("Restart recorded: {}", reason),
        )
        .with_duration(started.elapsed())
        .with_metadata("state_persisted", persisted)
        .with_metadata("queue_size", state.queue_size)
    }

    /// Restart state left behind by the previous process, if any.
    pub async fn last_restart_state(&self) -> Option<RestartState> {
        read_restart_state(&self.config.restart_state_path).await
    }

    /// Best-effort drain of the local queue before exit. Bounded by
    /// `drain_batch`; whatever is left stays in the snapshot.
    pub async fn graceful_shutdown(&self) -> QueueProcessReport {
        let queue_size = self.queue.size().await;
        info!(queue_size = queue_size, "graceful shutdown: draining local queue");
        let report = self.drain_queue(self.config.worker.drain_batch).await;
        let remaining = self.queue.size().await;
        info!(
            processed = report.processed,
            successful = report.successful,
            remaining = remaining,
            "graceful shutdown complete"
        );
        report
    }

    /// One background cycle: drain the queue, sample disks, alert on disk
    /// problems, and clean up when the disks are critical.
    pub async fn run_maintenance_cycle(&self) -> MaintenanceReport {
        let queue = self.process_queued_operations().await;
        let disk = self.disk.check_disk_space().await;

        for alert in &disk.alerts {
            let mut metadata = Metadata::new();
            metadata.insert("path".to_string(), json!(alert.path));
            self.alerts
                .send_alert(alert.severity, "Disk space alert", &alert.message, metadata);
        }

        let cleanup_due =
            disk.overall_status == DiskStatus::Critical && self.config.worker.auto_cleanup;
        let cleanup = if cleanup_due {
            let report = self
                .disk
                .cleanup_disk_space(self.config.worker.cleanup_target_free_percent)
                .await;
            info!(
                freed_bytes = report.total_freed_bytes,
                success = report.success,
                "disk cleanup finished"
            );
            Some(report)
        } else {
            None
        };

        MaintenanceReport {
            queue,
            disk,
            cleanup,
        }
    }

    pub async fn health_report(&self) -> HealthReport {
        HealthReport {
            stats: self.stats.snapshot(),
            queue_size: self.queue.size().await,
            queue_capacity: self.queue.capacity(),
            alert_history_len: self.alerts.history_len(),
            disk: self.disk.check_disk_space().await,
        }
    }
}

fn alert_metadata(error_context: &ErrorContext) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(
        "error_context".to_string(),
        serde_json::to_value(error_context).unwrap_or(Value::Null),
    );
    metadata
}
