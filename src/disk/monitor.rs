use super::cleanup::{CleanupReport, PathCleanupResult, cleanup_directory};
use super::status::{DiskAlert, DiskPathStatus, DiskSpaceReport, DiskStatus, DiskThresholds};
use crate::core::{RecoveryError, Result, Severity};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Disk monitoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskMonitorConfig {
    /// Paths whose filesystems are sampled every cycle
    pub paths: Vec<PathBuf>,

    /// Directories eligible for age-based cleanup
    pub cleanup_paths: Vec<PathBuf>,

    /// Used percent at or above which a path is `warning`
    pub warning_threshold: f64,

    /// Used percent at or above which a path is `critical`
    pub critical_threshold: f64,
}

impl Default for DiskMonitorConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(".")],
            cleanup_paths: Vec::new(),
            warning_threshold: 80.0,
            critical_threshold: 90.0,
        }
    }
}

impl DiskMonitorConfig {
    pub fn paths(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn cleanup_paths(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.cleanup_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn thresholds(mut self, warning: f64, critical: f64) -> Self {
        self.warning_threshold = warning;
        self.critical_threshold = critical;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let in_range = |value: f64| (0.0..=100.0).contains(&value);
        if !in_range(self.warning_threshold) || !in_range(self.critical_threshold) {
            return Err(RecoveryError::InvalidConfig(
                "disk thresholds must be within 0..=100".to_string(),
            ));
        }
        if self.warning_threshold > self.critical_threshold {
            return Err(RecoveryError::InvalidConfig(format!(
                "disk warning threshold ({}) must not exceed critical threshold ({})",
                self.warning_threshold, self.critical_threshold
            )));
        }
        Ok(())
    }
}

/// Periodic sampler of configured filesystem paths.
#[derive(Debug, Clone)]
pub struct DiskMonitor {
    config: DiskMonitorConfig,
    thresholds: DiskThresholds,
}

impl DiskMonitor {
    pub fn new(config: DiskMonitorConfig) -> Self {
        let thresholds = DiskThresholds {
            warning: config.warning_threshold,
            critical: config.critical_threshold,
        };
        Self { config, thresholds }
    }

    pub fn config(&self) -> &DiskMonitorConfig {
        &self.config
    }

    pub fn thresholds(&self) -> &DiskThresholds {
        &self.thresholds
    }

    /// Samples every configured path.
    ///
    /// A path that cannot be statted is reported with status `error` and a
    /// high-severity alert; the remaining paths are still sampled.
    pub async fn check_disk_space(&self) -> DiskSpaceReport {
        let mut report = DiskSpaceReport {
            checked_at: Utc::now(),
            paths: Default::default(),
            alerts: Vec::new(),
            overall_status: DiskStatus::Healthy,
        };

        for path in &self.config.paths {
            let status = self.sample_path(path).await;
            if let Some(alert) = alert_for(&status) {
                report.alerts.push(alert);
            }
            report.overall_status = report.overall_status.max(status.status);
            report.paths.insert(status.path.clone(), status);
        }

        debug!(
            overall = %report.overall_status,
            paths = report.paths.len(),
            alerts = report.alerts.len(),
            "disk space checked"
        );
        report
    }

    pub async fn sample_path(&self, path: &Path) -> DiskPathStatus {
        let shown = path.display().to_string();
        let owned = path.to_path_buf();
        let usage = spawn_blocking(move || {
            let total = fs2::total_space(&owned)?;
            let free = fs2::available_space(&owned)?;
            Ok::<_, std::io::Error>((total, free))
        })
        .await;

        match usage {
            Ok(Ok((total, free))) => {
                DiskPathStatus::from_usage(&shown, total, free, &self.thresholds)
            }
            Ok(Err(err)) => {
                warn!(path = %shown, error = %err, "failed to stat path");
                DiskPathStatus::unavailable(&shown, err.to_string())
            }
            Err(err) => {
                warn!(path = %shown, error = %err, "disk sampling task failed");
                DiskPathStatus::unavailable(&shown, err.to_string())
            }
        }
    }

    /// Removes aged files from every configured cleanup path.
    ///
    /// Paths whose filesystem already has `target_free_percent` free are
    /// skipped. One path failing never stops the others.
    pub async fn cleanup_disk_space(&self, target_free_percent: f64) -> CleanupReport {
        let mut results = Vec::with_capacity(self.config.cleanup_paths.len());

        for dir in &self.config.cleanup_paths {
            let status = self.sample_path(dir).await;
            if status.error.is_none() && status.free_percent() >= target_free_percent {
                debug!(
                    path = %dir.display(),
                    free_percent = status.free_percent(),
                    "enough free space, skipping cleanup"
                );
                results.push(PathCleanupResult {
                    path: dir.display().to_string(),
                    skipped: true,
                    ..PathCleanupResult::default()
                });
                continue;
            }

            let owned = dir.clone();
            let result = spawn_blocking(move || cleanup_directory(&owned, SystemTime::now()))
                .await
                .unwrap_or_else(|err| PathCleanupResult {
                    path: dir.display().to_string(),
                    error: Some(format!("cleanup task failed: {}", err)),
                    ..PathCleanupResult::default()
                });

            if result.rule.is_none() {
                debug!(path = %result.path, "no cleanup rule matches path, skipping");
            }
            match &result.error {
                Some(err) => warn!(path = %result.path, error = %err, "disk cleanup failed"),
                None if result.files_removed > 0 => info!(
                    path = %result.path,
                    files_removed = result.files_removed,
                    bytes_freed = result.bytes_freed,
                    "disk cleanup freed space"
                ),
                None => {}
            }
            results.push(result);
        }

        CleanupReport::from_results(results)
    }
}

fn alert_for(status: &DiskPathStatus) -> Option<DiskAlert> {
    let (severity, message) = match status.status {
        DiskStatus::Healthy => return None,
        DiskStatus::Warning => (
            Severity::Medium,
            format!("Disk usage high on {}: {:.1}% used", status.path, status.used_percent),
        ),
        DiskStatus::Critical => (
            Severity::Critical,
            format!("Disk usage critical on {}: {:.1}% used", status.path, status.used_percent),
        ),
        DiskStatus::Error => (
            Severity::High,
            format!(
                "Unable to check disk space for {}: {}",
                status.path,
                status.error.as_deref().unwrap_or("unknown error")
            ),
        ),
    };

    Some(DiskAlert {
        path: status.path.clone(),
        severity,
        message,
    })
}
