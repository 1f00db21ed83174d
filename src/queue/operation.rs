use crate::core::{ErrorContext, Metadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An operation deferred until the database is reachable again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    #[serde(default = "Uuid::new_v4")]
    pub operation_id: Uuid,
    pub operation_name: String,
    #[serde(default)]
    pub context: Metadata,
    pub error_context: ErrorContext,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Overwritten when the operation is accepted by a queue.
    pub queued_at: DateTime<Utc>,
}

impl QueuedOperation {
    pub fn new(
        operation_name: impl Into<String>,
        context: Metadata,
        error_context: ErrorContext,
        max_retries: u32,
    ) -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            operation_name: operation_name.into(),
            context,
            error_context,
            retry_count: 0,
            max_retries,
            queued_at: Utc::now(),
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}
