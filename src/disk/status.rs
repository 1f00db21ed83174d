use crate::core::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Health of one sampled path.
///
/// Variants are ordered from best to worst so the overall status of a
/// sampling cycle is simply the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskStatus {
    Healthy,
    Warning,
    /// The path could not be statted.
    Error,
    Critical,
}

impl DiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiskStatus::Healthy => "healthy",
            DiskStatus::Warning => "warning",
            DiskStatus::Error => "error",
            DiskStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for DiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage thresholds in percent of total capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskThresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Default for DiskThresholds {
    fn default() -> Self {
        Self {
            warning: 80.0,
            critical: 90.0,
        }
    }
}

impl DiskThresholds {
    /// Both bounds are inclusive.
    pub fn status_for(&self, used_percent: f64) -> DiskStatus {
        if used_percent >= self.critical {
            DiskStatus::Critical
        } else if used_percent >= self.warning {
            DiskStatus::Warning
        } else {
            DiskStatus::Healthy
        }
    }
}

/// Usage of one configured path as of the latest sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskPathStatus {
    pub path: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: f64,
    pub status: DiskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiskPathStatus {
    pub fn from_usage(
        path: &str,
        total_bytes: u64,
        free_bytes: u64,
        thresholds: &DiskThresholds,
    ) -> Self {
        let free_bytes = free_bytes.min(total_bytes);
        let used_bytes = total_bytes - free_bytes;
        let used_percent = if total_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 / total_bytes as f64 * 100.0
        };

        Self {
            path: path.to_string(),
            total_bytes,
            used_bytes,
            free_bytes,
            used_percent,
            status: thresholds.status_for(used_percent),
            error: None,
        }
    }

    pub fn unavailable(path: &str, error: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            total_bytes: 0,
            used_bytes: 0,
            free_bytes: 0,
            used_percent: 0.0,
            status: DiskStatus::Error,
            error: Some(error.into()),
        }
    }

    pub fn free_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.free_bytes as f64 / self.total_bytes as f64 * 100.0
        }
    }
}

/// Alert raised by a sampling cycle, dispatched by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskAlert {
    pub path: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSpaceReport {
    pub checked_at: DateTime<Utc>,
    pub paths: BTreeMap<String, DiskPathStatus>,
    pub alerts: Vec<DiskAlert>,
    pub overall_status: DiskStatus,
}
