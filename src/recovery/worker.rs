use super::orchestrator::{QueueProcessReport, RecoveryOrchestrator};
use crate::core::{RecoveryError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};

/// Background task running the maintenance cycle on a fixed interval.
pub struct RecoveryWorker {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl RecoveryWorker {
    /// Signals the worker to stop and waits for it to finish.
    ///
    /// A cycle already in progress runs to completion first.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| RecoveryError::Worker(format!("recovery worker join: {}", err)))?;
        }
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(|join_handle| join_handle.is_finished())
    }
}

impl Drop for RecoveryWorker {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Spawns the maintenance loop. Must be called inside a tokio runtime.
pub fn spawn_recovery_worker(orchestrator: Arc<RecoveryOrchestrator>) -> RecoveryWorker {
    let interval = Duration::from_millis(orchestrator.config().worker.interval_ms.max(10));
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    break;
                }
                _ = sleep(interval) => {
                    orchestrator.run_maintenance_cycle().await;
                }
            }
        }
    });

    RecoveryWorker {
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}

/// Runs the maintenance loop until `shutdown` resolves, then stops the loop
/// and drains the queue once more.
pub async fn run_until_shutdown<S>(
    orchestrator: Arc<RecoveryOrchestrator>,
    shutdown: S,
) -> Result<QueueProcessReport>
where
    S: Future<Output = ()>,
{
    let worker = spawn_recovery_worker(orchestrator.clone());
    info!(
        interval_ms = orchestrator.config().worker.interval_ms,
        "recovery worker started"
    );

    shutdown.await;
    info!("shutdown requested, stopping recovery worker");
    worker.stop().await?;

    Ok(orchestrator.graceful_shutdown().await)
}

/// Resolves on SIGINT or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install ctrl+c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
