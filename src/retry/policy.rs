use crate::core::{RecoveryError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior on transient failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of calls to the operation, including the first one.
    pub max_attempts: u32,
    /// Wait before the second attempt, in milliseconds.
    pub min_wait_ms: u64,
    /// Upper bound for any single wait, in milliseconds.
    pub max_wait_ms: u64,
    /// Growth factor applied to the wait after every failed attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_wait_ms: 1_000,
            max_wait_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn min_wait(mut self, wait: Duration) -> Self {
        self.min_wait_ms = wait.as_millis() as u64;
        self
    }

    pub fn max_wait(mut self, wait: Duration) -> Self {
        self.max_wait_ms = wait.as_millis() as u64;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Wait performed after the `attempt`-th failed call (1-based):
    /// `min(max_wait, min_wait * multiplier^(attempt - 1))`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let wait_ms = self.min_wait_ms as f64 * self.multiplier.powi(exponent);
        let capped = if wait_ms.is_finite() {
            wait_ms.min(self.max_wait_ms as f64)
        } else {
            self.max_wait_ms as f64
        };
        Duration::from_millis(capped.max(0.0) as u64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(RecoveryError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.min_wait_ms > self.max_wait_ms {
            return Err(RecoveryError::InvalidConfig(format!(
                "retry.min_wait_ms ({}) must not exceed retry.max_wait_ms ({})",
                self.min_wait_ms, self.max_wait_ms
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(RecoveryError::InvalidConfig(format!(
                "retry.multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }
}
