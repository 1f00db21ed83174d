use super::operation::QueuedOperation;
use super::persistence::{read_snapshot, write_snapshot};
use crate::core::{RecoveryError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

/// Local queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of queued operations
    pub max_size: usize,

    /// Snapshot file; `None` keeps the queue in memory only
    pub persistence_path: Option<PathBuf>,

    /// Redelivery budget stamped on operations queued by the orchestrator
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            persistence_path: None,
            max_retries: 3,
        }
    }
}

impl QueueConfig {
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn persistence_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persistence_path = Some(path.into());
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(RecoveryError::InvalidConfig(
                "queue.max_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bounded FIFO of deferred operations, mirrored to a JSON snapshot.
///
/// Every mutation rewrites the whole snapshot. Writes are serialized behind
/// `persist_lock`, and the contents are copied while that lock is held, so
/// the file always reflects one consistent point in time and a slower
/// writer can never overwrite a newer snapshot.
///
/// Several processes sharing one snapshot path will race on the file;
/// nothing here coordinates across processes.
pub struct LocalQueue {
    config: QueueConfig,
    items: Mutex<VecDeque<QueuedOperation>>,
    available: Notify,
    persist_lock: Mutex<()>,
}

impl LocalQueue {
    /// Opens the queue, restoring any operations left in the snapshot file.
    ///
    /// Restored operations keep their original order. Operations beyond
    /// `max_size` are dropped.
    pub async fn open(config: QueueConfig) -> Result<Self> {
        config.validate()?;

        let mut items = VecDeque::new();
        if let Some(path) = &config.persistence_path {
            let restored = read_snapshot(path).await;
            let total = restored.len();
            items.extend(restored.into_iter().take(config.max_size));
            if total > items.len() {
                debug!(
                    path = %path.display(),
                    restored = items.len(),
                    dropped = total - items.len(),
                    "queue snapshot exceeds capacity"
                );
            }
            if !items.is_empty() {
                info!(path = %path.display(), restored = items.len(), "restored queued operations");
            }
        }

        Ok(Self {
            config,
            items: Mutex::new(items),
            available: Notify::new(),
            persist_lock: Mutex::new(()),
        })
    }

    /// Creates a queue that is never written to disk.
    pub fn in_memory(max_size: usize) -> Self {
        Self {
            config: QueueConfig::default().max_size(max_size),
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            persist_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.max_size
    }

    /// Appends an operation. Returns `false` when the queue is full.
    pub async fn enqueue(&self, mut operation: QueuedOperation) -> bool {
        {
            let mut items = self.items.lock().await;
            if items.len() >= self.config.max_size {
                warn!(
                    operation = %operation.operation_name,
                    capacity = self.config.max_size,
                    "local queue full, rejecting operation"
                );
                return false;
            }
            operation.queued_at = Utc::now();
            debug!(
                operation = %operation.operation_name,
                operation_id = %operation.operation_id,
                "operation queued locally"
            );
            items.push_back(operation);
        }

        self.available.notify_one();
        self.persist().await;
        true
    }

    /// Waits up to `timeout` for the oldest operation.
    pub async fn dequeue(&self, timeout: Duration) -> Option<QueuedOperation> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so an enqueue in between is not missed.
            notified.as_mut().enable();

            if let Some(operation) = self.try_dequeue().await {
                return Some(operation);
            }

            if timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Removes the oldest operation without waiting.
    pub async fn try_dequeue(&self) -> Option<QueuedOperation> {
        let operation = self.items.lock().await.pop_front()?;
        self.persist().await;
        Some(operation)
    }

    pub async fn size(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_full(&self) -> bool {
        self.size().await >= self.config.max_size
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Drops every queued operation and returns how many were removed.
    pub async fn clear(&self) -> usize {
        let removed = {
            let mut items = self.items.lock().await;
            let removed = items.len();
            items.clear();
            removed
        };
        if removed > 0 {
            info!(removed = removed, "local queue cleared");
        }
        self.persist().await;
        removed
    }

    /// Copy of the current contents, oldest first.
    pub async fn snapshot(&self) -> Vec<QueuedOperation> {
        self.items.lock().await.iter().cloned().collect()
    }

    async fn persist(&self) {
        let Some(path) = &self.config.persistence_path else {
            return;
        };

        let _guard = self.persist_lock.lock().await;
        let contents = self.snapshot().await;
        if let Err(err) = write_snapshot(path, &contents).await {
            warn!(path = %path.display(), error = %err, "failed to persist local queue");
        }
    }
}
