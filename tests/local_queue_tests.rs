//! Integration tests for the durable local queue

use batchguard::{
    ErrorContext, Failure, FailureKind, LocalQueue, Metadata, QueueConfig, QueuedOperation,
    Severity,
};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn operation(name: &str) -> QueuedOperation {
    let failure = Failure::new(FailureKind::ConnectionLost, "connection lost");
    let error_context =
        ErrorContext::new(&failure, "loader", name, Severity::High, Metadata::new());
    let mut context = Metadata::new();
    context.insert("row".to_string(), json!({ "name": name }));
    QueuedOperation::new(name, context, error_context, 3)
}

#[tokio::test]
async fn test_enqueue_respects_capacity() {
    let queue = LocalQueue::in_memory(2);

    assert!(queue.enqueue(operation("database_insert")).await);
    assert!(queue.enqueue(operation("database_update")).await);
    assert!(queue.is_full().await);

    assert!(!queue.enqueue(operation("status_update")).await);
    assert_eq!(queue.size().await, 2);
}

#[tokio::test]
async fn test_fifo_order() {
    let queue = LocalQueue::in_memory(10);
    for i in 0..5 {
        queue.enqueue(operation(&format!("op_{i}"))).await;
    }

    for i in 0..5 {
        let op = queue.dequeue(Duration::from_millis(10)).await.unwrap();
        assert_eq!(op.operation_name, format!("op_{i}"));
    }
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_persistence_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.json");
    let config = QueueConfig::default().max_size(10).persistence_path(&path);

    let ids = {
        let queue = LocalQueue::open(config.clone()).await.unwrap();
        let mut ids = Vec::new();
        for i in 0..3 {
            let op = operation(&format!("database_insert_{i}"));
            ids.push(op.operation_id);
            assert!(queue.enqueue(op).await);
        }
        ids
        // Simulate crash - drop queue without draining
    };

    assert!(path.exists());

    let queue = LocalQueue::open(config).await.unwrap();
    assert_eq!(queue.size().await, 3);
    for (i, id) in ids.iter().enumerate() {
        let op = queue.try_dequeue().await.unwrap();
        assert_eq!(op.operation_id, *id);
        assert_eq!(op.operation_name, format!("database_insert_{i}"));
        assert_eq!(op.context["row"]["name"], json!(format!("database_insert_{i}")));
        assert_eq!(op.error_context.error_kind, "connection_lost");
    }
}

#[tokio::test]
async fn test_snapshot_reflects_dequeue_and_clear() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.json");
    let queue = LocalQueue::open(QueueConfig::default().persistence_path(&path))
        .await
        .unwrap();

    queue.enqueue(operation("a")).await;
    queue.enqueue(operation("b")).await;
    queue.enqueue(operation("c")).await;
    queue.try_dequeue().await.unwrap();

    let on_disk: Vec<QueuedOperation> =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let names: Vec<&str> = on_disk.iter().map(|op| op.operation_name.as_str()).collect();
    assert_eq!(names, vec!["b", "c"]);

    assert_eq!(queue.clear().await, 2);
    let on_disk: Vec<QueuedOperation> =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert!(on_disk.is_empty());
}

#[tokio::test]
async fn test_restore_truncates_at_capacity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.json");

    {
        let queue = LocalQueue::open(QueueConfig::default().max_size(5).persistence_path(&path))
            .await
            .unwrap();
        for i in 0..5 {
            queue.enqueue(operation(&format!("op_{i}"))).await;
        }
    }

    let queue = LocalQueue::open(QueueConfig::default().max_size(2).persistence_path(&path))
        .await
        .unwrap();
    assert_eq!(queue.size().await, 2);
    let names: Vec<String> = queue
        .snapshot()
        .await
        .into_iter()
        .map(|op| op.operation_name)
        .collect();
    assert_eq!(names, vec!["op_0", "op_1"]);
}

#[tokio::test]
async fn test_malformed_snapshot_starts_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.json");
    std::fs::write(&path, b"{ this is not a queue").unwrap();

    let queue = LocalQueue::open(QueueConfig::default().persistence_path(&path))
        .await
        .unwrap();
    assert_eq!(queue.size().await, 0);

    assert!(queue.enqueue(operation("database_insert")).await);
    assert_eq!(queue.size().await, 1);
}

#[tokio::test]
async fn test_missing_snapshot_is_not_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("queue.json");

    let queue = LocalQueue::open(QueueConfig::default().persistence_path(&path))
        .await
        .unwrap();
    assert!(queue.is_empty().await);

    queue.enqueue(operation("log_entry")).await;
    assert!(path.exists());
}

#[tokio::test]
async fn test_zero_capacity_is_rejected() {
    let result = LocalQueue::open(QueueConfig::default().max_size(0)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_dequeue_times_out_when_empty() {
    let queue = LocalQueue::in_memory(4);
    let started = Instant::now();

    assert!(queue.dequeue(Duration::from_millis(50)).await.is_none());
    assert!(started.elapsed() >= Duration::from_millis(45));
}

#[tokio::test]
async fn test_dequeue_wakes_on_enqueue() {
    let queue = Arc::new(LocalQueue::in_memory(4));

    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.dequeue(Duration::from_secs(5)).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.enqueue(operation("metric_update")).await;

    let op = consumer.await.unwrap().unwrap();
    assert_eq!(op.operation_name, "metric_update");
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_concurrent_enqueue_never_exceeds_capacity() {
    let queue = Arc::new(LocalQueue::in_memory(50));
    let mut handles = vec![];

    for task_id in 0..10 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            let mut accepted = 0;
            for i in 0..10 {
                if queue.enqueue(operation(&format!("op_{task_id}_{i}"))).await {
                    accepted += 1;
                }
            }
            accepted
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        accepted += handle.await.unwrap();
    }

    assert_eq!(accepted, 50);
    assert_eq!(queue.size().await, 50);
}

#[tokio::test]
async fn test_unwritable_snapshot_keeps_queue_in_memory() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"regular file").unwrap();
    let path = blocker.join("queue.json");

    let queue = LocalQueue::open(QueueConfig::default().max_size(4).persistence_path(&path))
        .await
        .unwrap();

    assert!(queue.enqueue(operation("database_insert")).await);
    assert!(queue.enqueue(operation("database_update")).await);
    assert_eq!(queue.size().await, 2);
    assert!(!path.exists());

    let op = queue.try_dequeue().await.unwrap();
    assert_eq!(op.operation_name, "database_insert");
    assert_eq!(queue.size().await, 1);
}
