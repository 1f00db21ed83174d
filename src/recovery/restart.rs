//! Restart bookkeeping file.

use crate::core::{RecoveryStatsSnapshot, Result};
use crate::queue::persistence::atomic_write;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartState {
    pub restart_timestamp: DateTime<Utc>,
    pub restart_reason: String,
    pub queue_size: usize,
    pub recovery_stats: RecoveryStatsSnapshot,
}

/// Overwrites the restart-state file.
pub async fn write_restart_state(path: &Path, state: &RestartState) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(state)?;
    atomic_write(path, &bytes).await
}

/// Reads the restart-state file left by a previous run, if any.
pub async fn read_restart_state(path: &Path) -> Option<RestartState> {
    let bytes = fs::read(path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(state) => Some(state),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "malformed restart state");
            None
        }
    }
}
