use crate::core::{Failure, FailureKind};
use crate::queue::QueuedOperation;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeReport {
    pub healthy: bool,
    pub latency_ms: f64,
}

/// Health check against the data-access layer.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> Result<ProbeReport, Failure>;
}

/// Runs one probe and turns an unhealthy report into a transient failure.
pub async fn probe_healthy(probe: &dyn HealthProbe) -> Result<ProbeReport, Failure> {
    let report = probe.check().await?;
    if report.healthy {
        Ok(report)
    } else {
        Err(Failure::new(
            FailureKind::ConnectionLost,
            format!("health check reported unhealthy ({:.1}ms)", report.latency_ms),
        ))
    }
}

/// Treats the database as healthy when a TCP connection can be opened.
#[derive(Debug, Clone)]
pub struct TcpHealthProbe {
    addr: String,
    connect_timeout: Duration,
}

impl TcpHealthProbe {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl HealthProbe for TcpHealthProbe {
    async fn check(&self) -> Result<ProbeReport, Failure> {
        let started = Instant::now();
        match timeout(self.connect_timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_stream)) => Ok(ProbeReport {
                healthy: true,
                latency_ms: started.elapsed().as_secs_f64() * 1_000.0,
            }),
            Ok(Err(err)) => Err(Failure::from_io(&err)),
            Err(_) => Err(Failure::new(
                FailureKind::Timeout,
                format!(
                    "health check to {} timed out after {}ms",
                    self.addr,
                    self.connect_timeout.as_millis()
                ),
            )),
        }
    }
}

/// Replays a queued operation once the database is reachable again.
#[async_trait]
pub trait QueuedOperationHandler: Send + Sync {
    async fn replay(&self, operation: &QueuedOperation) -> Result<(), Failure>;
}

/// Considers a queued operation delivered when the health probe passes.
pub struct ProbeReplayHandler {
    probe: Arc<dyn HealthProbe>,
}

impl ProbeReplayHandler {
    pub fn new(probe: Arc<dyn HealthProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl QueuedOperationHandler for ProbeReplayHandler {
    async fn replay(&self, _operation: &QueuedOperation) -> Result<(), Failure> {
        probe_healthy(self.probe.as_ref()).await.map(|_| ())
    }
}
