use super::classifier::is_transient;
use super::policy::RetryPolicy;
use crate::core::{Failure, RecoveryStats};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a retried operation together with the number of calls made.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, Failure>,
    pub attempts: u32,
}

/// Runs an operation with bounded, exponentially backed-off retries.
///
/// Only transient failures are retried. A permanent failure ends the loop
/// immediately without waiting; exhausting the attempt budget returns the
/// last transient failure unchanged.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    stats: Arc<RecoveryStats>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, stats: Arc<RecoveryStats>) -> Self {
        Self { policy, stats }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, Failure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        self.run(operation).await.result
    }

    pub async fn run<T, F, Fut>(&self, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let failure = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempts = attempt, "operation succeeded after retry");
                    }
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(failure) => failure,
            };

            if !is_transient(&failure) {
                debug!(error = %failure, attempts = attempt, "permanent failure, not retrying");
                return RetryOutcome {
                    result: Err(failure),
                    attempts: attempt,
                };
            }

            if attempt >= max_attempts {
                warn!(
                    error = %failure,
                    attempts = attempt,
                    "retry attempts exhausted"
                );
                return RetryOutcome {
                    result: Err(failure),
                    attempts: attempt,
                };
            }

            let delay = self.policy.backoff(attempt);
            warn!(
                error = %failure,
                attempt = attempt,
                max_attempts = max_attempts,
                delay_ms = delay.as_millis() as u64,
                "transient failure, retrying"
            );
            self.stats.record_retry_attempt();
            tokio::time::sleep(delay).await;
        }
    }
}
