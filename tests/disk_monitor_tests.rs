use batchguard::disk::CleanupRule;
use batchguard::{DiskMonitor, DiskMonitorConfig, DiskStatus, Severity};
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn write_aged(path: &Path, bytes: &[u8], age: Duration) {
    fs::write(path, bytes).unwrap();
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

#[tokio::test]
async fn test_check_existing_path() {
    let dir = tempdir().unwrap();
    let monitor = DiskMonitor::new(DiskMonitorConfig::default().paths([dir.path()]));

    let report = monitor.check_disk_space().await;
    let key = dir.path().display().to_string();
    let status = &report.paths[&key];

    assert!(status.error.is_none());
    assert!(status.total_bytes > 0);
    assert!(status.free_bytes <= status.total_bytes);
    assert_eq!(status.used_bytes, status.total_bytes - status.free_bytes);
    assert!((0.0..=100.0).contains(&status.used_percent));
    assert_ne!(status.status, DiskStatus::Error);
    assert_eq!(report.overall_status, status.status);
}

#[tokio::test]
async fn test_threshold_zero_marks_every_path_critical() {
    let dir = tempdir().unwrap();
    let monitor = DiskMonitor::new(
        DiskMonitorConfig::default()
            .paths([dir.path()])
            .thresholds(0.0, 0.0),
    );

    let report = monitor.check_disk_space().await;

    assert_eq!(report.overall_status, DiskStatus::Critical);
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].severity, Severity::Critical);
}

#[tokio::test]
async fn test_unreadable_path_reports_error_and_keeps_sampling() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does").join("not").join("exist");
    let monitor = DiskMonitor::new(
        DiskMonitorConfig::default()
            .paths([missing.clone(), dir.path().to_path_buf()])
            .thresholds(100.0, 100.0),
    );

    let report = monitor.check_disk_space().await;

    assert_eq!(report.paths.len(), 2);
    let broken = &report.paths[&missing.display().to_string()];
    assert_eq!(broken.status, DiskStatus::Error);
    assert!(broken.error.is_some());

    let healthy = &report.paths[&dir.path().display().to_string()];
    assert!(healthy.error.is_none());

    assert_eq!(report.overall_status, DiskStatus::Error);
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].severity, Severity::High);
    assert_eq!(report.alerts[0].path, missing.display().to_string());
}

#[tokio::test]
async fn test_cleanup_removes_only_aged_files() {
    let dir = tempdir().unwrap();
    let logs = dir.path().join("logs");
    let tmp = dir.path().join("tmp");
    let cache = dir.path().join("cache");
    for d in [&logs, &tmp, &cache] {
        fs::create_dir_all(d).unwrap();
    }
    fs::create_dir_all(logs.join("archive")).unwrap();

    write_aged(&logs.join("old.log"), &[0u8; 100], 8 * DAY);
    write_aged(&logs.join("archive").join("older.log"), &[0u8; 50], 30 * DAY);
    write_aged(&logs.join("fresh.log"), &[0u8; 100], Duration::ZERO);
    write_aged(&logs.join("old.txt"), &[0u8; 100], 8 * DAY);
    write_aged(&tmp.join("scratch.bin"), &[0u8; 10], 2 * DAY);
    write_aged(&tmp.join("recent.bin"), &[0u8; 10], Duration::from_secs(60));
    write_aged(&cache.join("stale"), &[0u8; 20], 4 * DAY);
    write_aged(&cache.join("warm"), &[0u8; 20], 2 * DAY);

    let monitor = DiskMonitor::new(
        DiskMonitorConfig::default().cleanup_paths([logs.clone(), tmp.clone(), cache.clone()]),
    );
    let report = monitor.cleanup_disk_space(100.0).await;

    assert!(report.success);
    assert_eq!(report.total_freed_bytes, 100 + 50 + 10 + 20);

    assert!(!logs.join("old.log").exists());
    assert!(!logs.join("archive").join("older.log").exists());
    assert!(logs.join("fresh.log").exists());
    assert!(logs.join("old.txt").exists());
    assert!(!tmp.join("scratch.bin").exists());
    assert!(tmp.join("recent.bin").exists());
    assert!(!cache.join("stale").exists());
    assert!(cache.join("warm").exists());

    let logs_result = &report.results[&logs.display().to_string()];
    assert_eq!(logs_result.rule, Some(CleanupRule::Logs));
    assert_eq!(logs_result.files_removed, 2);
    assert_eq!(logs_result.bytes_freed, 150);
}

#[tokio::test]
async fn test_cleanup_skips_when_enough_space_is_free() {
    let dir = tempdir().unwrap();
    let logs = dir.path().join("logs");
    fs::create_dir_all(&logs).unwrap();
    write_aged(&logs.join("old.log"), b"data", 8 * DAY);

    let monitor = DiskMonitor::new(DiskMonitorConfig::default().cleanup_paths([logs.clone()]));
    let report = monitor.cleanup_disk_space(0.0).await;

    assert!(report.success);
    assert_eq!(report.total_freed_bytes, 0);
    assert!(report.results[&logs.display().to_string()].skipped);
    assert!(logs.join("old.log").exists());
}

#[tokio::test]
async fn test_cleanup_missing_directory_is_not_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("tmp");

    let monitor = DiskMonitor::new(DiskMonitorConfig::default().cleanup_paths([missing.clone()]));
    let report = monitor.cleanup_disk_space(100.0).await;

    assert!(report.success);
    assert_eq!(report.total_freed_bytes, 0);
    assert!(report.results[&missing.display().to_string()].error.is_none());
}

#[tokio::test]
async fn test_cleanup_rule_taken_from_parent_directory() {
    let dir = tempdir().unwrap();
    let etl_logs = dir.path().join("log").join("etl");
    fs::create_dir_all(&etl_logs).unwrap();
    write_aged(&etl_logs.join("run.log"), &[0u8; 64], 10 * DAY);
    write_aged(&etl_logs.join("run.csv"), &[0u8; 64], 10 * DAY);

    let monitor = DiskMonitor::new(DiskMonitorConfig::default().cleanup_paths([etl_logs.clone()]));
    let report = monitor.cleanup_disk_space(100.0).await;

    let result = &report.results[&etl_logs.display().to_string()];
    assert_eq!(result.rule, Some(CleanupRule::Logs));
    assert!(!result.skipped);
    assert_eq!(result.files_removed, 1);
    assert!(!etl_logs.join("run.log").exists());
    assert!(etl_logs.join("run.csv").exists());
}
