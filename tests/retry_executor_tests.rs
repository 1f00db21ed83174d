use batchguard::{Failure, FailureKind, RecoveryStats, RetryExecutor, RetryPolicy};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .max_attempts(max_attempts)
        .min_wait(Duration::from_millis(1))
        .max_wait(Duration::from_millis(5))
        .multiplier(2.0)
}

#[tokio::test]
async fn test_transient_failures_exhaust_attempts() {
    let stats = Arc::new(RecoveryStats::new());
    let executor = RetryExecutor::new(fast_policy(4), stats.clone());
    let calls = AtomicU32::new(0);

    let outcome = executor
        .run(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err::<(), _>(Failure::new(FailureKind::Timeout, format!("timeout #{n}")))
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(outcome.attempts, 4);
    // The last failure comes back unchanged.
    let err = outcome.result.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
    assert_eq!(err.message, "timeout #4");
    // One wait between each pair of attempts.
    assert_eq!(stats.snapshot().retry_attempts, 3);
}

#[tokio::test]
async fn test_permanent_failure_stops_immediately() {
    let stats = Arc::new(RecoveryStats::new());
    let executor = RetryExecutor::new(fast_policy(5), stats.clone());
    let calls = AtomicU32::new(0);

    let result = executor
        .execute(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Failure::new(FailureKind::Syntax, "syntax error"))
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.unwrap_err().kind, FailureKind::Syntax);
    assert_eq!(stats.snapshot().retry_attempts, 0);
}

#[tokio::test]
async fn test_failure_turning_permanent_stops_retrying() {
    let executor = RetryExecutor::new(fast_policy(5), Arc::new(RecoveryStats::new()));
    let calls = AtomicU32::new(0);

    let outcome = executor
        .run(|| async {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err::<(), _>(Failure::untyped("server closed the connection unexpectedly")),
                _ => Err(Failure::new(FailureKind::PermissionDenied, "permission denied")),
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.result.unwrap_err().kind, FailureKind::PermissionDenied);
}

#[tokio::test]
async fn test_success_after_transient_failures() {
    let stats = Arc::new(RecoveryStats::new());
    let executor = RetryExecutor::new(fast_policy(3), stats.clone());
    let calls = AtomicU32::new(0);

    let outcome = executor
        .run(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Failure::new(FailureKind::PoolExhausted, "pool exhausted"))
            } else {
                Ok(42)
            }
        })
        .await;

    assert_eq!(outcome.result.unwrap(), 42);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(stats.snapshot().retry_attempts, 2);
}

#[tokio::test]
async fn test_single_attempt_never_waits() {
    let stats = Arc::new(RecoveryStats::new());
    let executor = RetryExecutor::new(fast_policy(1), stats.clone());

    let result = executor
        .execute(|| async { Err::<(), _>(Failure::new(FailureKind::ConnectionLost, "gone")) })
        .await;

    assert!(result.is_err());
    assert_eq!(stats.snapshot().retry_attempts, 0);
}
