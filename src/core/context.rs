use super::failure::{Failure, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// String-keyed metadata attached to failures, alerts and queued operations.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Immutable record of one reported failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub error_kind: String,
    pub message: String,
    pub component: String,
    pub operation: String,
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
    pub severity: Severity,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ErrorContext {
    pub fn new(
        failure: &Failure,
        component: &str,
        operation: &str,
        severity: Severity,
        metadata: Metadata,
    ) -> Self {
        Self {
            error_kind: failure.kind.as_str().to_string(),
            message: failure.message.clone(),
            component: component.to_string(),
            operation: operation.to_string(),
            timestamp: Utc::now(),
            retry_count: 0,
            severity,
            metadata,
        }
    }
}

/// Disposition chosen for a single reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    Retry,
    Restart,
    QueueLocally,
    AlertAndContinue,
    FailFast,
}

impl RecoveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryAction::Retry => "retry",
            RecoveryAction::Restart => "restart",
            RecoveryAction::QueueLocally => "queue_locally",
            RecoveryAction::AlertAndContinue => "alert_and_continue",
            RecoveryAction::FailFast => "fail_fast",
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of handling one failure. Returned to the caller, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryResult {
    pub success: bool,
    pub action_taken: RecoveryAction,
    pub message: String,
    pub retry_count: u32,
    pub duration: Duration,
    pub metadata: Metadata,
}

impl RecoveryResult {
    pub(crate) fn new(
        success: bool,
        action_taken: RecoveryAction,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success,
            action_taken,
            message: message.into(),
            retry_count: 0,
            duration: Duration::ZERO,
            metadata: Metadata::new(),
        }
    }

    pub(crate) fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub(crate) fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub(crate) fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}
