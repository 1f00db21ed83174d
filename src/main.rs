use anyhow::{Context, Result};
use batchguard::{
    JsonlFileSink, RecoveryConfig, RecoveryOrchestrator, TcpHealthProbe, run_until_shutdown,
    shutdown_signal, tracing_sink,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = RecoveryConfig::from_env().context("failed to load configuration")?;
    let probe_addr = env_string("BATCHGUARD_PROBE_ADDR", "127.0.0.1:5432");
    let probe_timeout_ms = env_string("BATCHGUARD_PROBE_TIMEOUT_MS", "5000")
        .parse::<u64>()
        .context("BATCHGUARD_PROBE_TIMEOUT_MS must be an integer")?;
    let probe = Arc::new(TcpHealthProbe::new(
        probe_addr.clone(),
        Duration::from_millis(probe_timeout_ms),
    ));

    let alert_log = config.alerts.log_path.clone();
    let orchestrator = Arc::new(
        RecoveryOrchestrator::open(config, probe)
            .await
            .context("failed to initialize recovery orchestrator")?,
    );
    orchestrator.add_alert_handler(tracing_sink());
    if let Some(path) = alert_log {
        orchestrator.add_alert_handler(JsonlFileSink::new(path).into_handler());
    }

    if let Some(previous) = orchestrator.last_restart_state().await {
        info!(
            restarted_at = %previous.restart_timestamp,
            reason = %previous.restart_reason,
            queue_size = previous.queue_size,
            "previous restart state found"
        );
    }

    let queue_size = orchestrator.queue().size().await;
    info!(
        probe_addr = %probe_addr,
        queue_size = queue_size,
        "batchguard started"
    );

    let report = run_until_shutdown(orchestrator.clone(), shutdown_signal())
        .await
        .context("recovery worker failed")?;

    let remaining = orchestrator.queue().size().await;
    info!(
        drained = report.processed,
        remaining = remaining,
        "batchguard stopped"
    );
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("batchguard=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
