use crate::alert::DEFAULT_HISTORY_LIMIT;
use crate::core::{RecoveryError, Result};
use crate::disk::DiskMonitorConfig;
use crate::queue::QueueConfig;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_DATA_DIR: &str = ".batchguard";
pub const QUEUE_SNAPSHOT_FILE: &str = "local_queue.json";
pub const ALERT_LOG_FILE: &str = "alerts.jsonl";
pub const RESTART_STATE_FILE: &str = "restart_state.json";

const ENV_PREFIX: &str = "BATCHGUARD_";

/// Alert dispatch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Number of alerts kept in memory
    pub history_limit: usize,

    /// JSON-lines alert log written by the file sink
    pub log_path: Option<PathBuf>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            log_path: None,
        }
    }
}

/// Background maintenance cycle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Delay between maintenance cycles, in milliseconds
    pub interval_ms: u64,

    /// Maximum queued operations replayed per drain
    pub drain_batch: usize,

    /// Free space a cleanup tries to reach, in percent
    pub cleanup_target_free_percent: f64,

    /// Run disk cleanup when the overall disk status is critical
    pub auto_cleanup: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            drain_batch: 100,
            cleanup_target_free_percent: 20.0,
            auto_cleanup: true,
        }
    }
}

/// Full configuration of the recovery subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    pub retry: RetryPolicy,
    pub queue: QueueConfig,
    pub disk: DiskMonitorConfig,
    pub alerts: AlertConfig,
    pub worker: WorkerConfig,
    /// Overwritten on every container restart
    pub restart_state_path: PathBuf,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self::with_data_dir(DEFAULT_DATA_DIR)
    }
}

impl RecoveryConfig {
    /// Default configuration with every file placed under `dir`.
    pub fn with_data_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            retry: RetryPolicy::default(),
            queue: QueueConfig::default().persistence_path(dir.join(QUEUE_SNAPSHOT_FILE)),
            disk: DiskMonitorConfig::default().paths([dir.to_path_buf()]),
            alerts: AlertConfig {
                log_path: Some(dir.join(ALERT_LOG_FILE)),
                ..AlertConfig::default()
            },
            worker: WorkerConfig::default(),
            restart_state_path: dir.join(RESTART_STATE_FILE),
        }
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    pub fn disk(mut self, disk: DiskMonitorConfig) -> Self {
        self.disk = disk;
        self
    }

    pub fn alerts(mut self, alerts: AlertConfig) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn worker(mut self, worker: WorkerConfig) -> Self {
        self.worker = worker;
        self
    }

    /// Reads `BATCHGUARD_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RecoveryConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let data_dir = var("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let mut config = Self::with_data_dir(&data_dir);

        config.retry.max_attempts =
            parse_or(&var, "RETRY_MAX_ATTEMPTS", config.retry.max_attempts)?;
        config.retry.min_wait_ms = parse_or(&var, "RETRY_MIN_WAIT_MS", config.retry.min_wait_ms)?;
        config.retry.max_wait_ms = parse_or(&var, "RETRY_MAX_WAIT_MS", config.retry.max_wait_ms)?;
        config.retry.multiplier = parse_or(&var, "RETRY_MULTIPLIER", config.retry.multiplier)?;

        config.queue.max_size = parse_or(&var, "QUEUE_MAX_SIZE", config.queue.max_size)?;
        config.queue.max_retries = parse_or(&var, "QUEUE_MAX_RETRIES", config.queue.max_retries)?;

        if let Some(paths) = var("DISK_PATHS") {
            config.disk.paths = split_paths(&paths);
        }
        if let Some(paths) = var("CLEANUP_PATHS") {
            config.disk.cleanup_paths = split_paths(&paths);
        }
        config.disk.warning_threshold =
            parse_or(&var, "DISK_WARNING_PERCENT", config.disk.warning_threshold)?;
        config.disk.critical_threshold =
            parse_or(&var, "DISK_CRITICAL_PERCENT", config.disk.critical_threshold)?;

        config.alerts.history_limit =
            parse_or(&var, "ALERT_HISTORY_LIMIT", config.alerts.history_limit)?;

        config.worker.interval_ms =
            parse_or(&var, "WORKER_INTERVAL_MS", config.worker.interval_ms)?;
        config.worker.drain_batch = parse_or(&var, "DRAIN_BATCH", config.worker.drain_batch)?;
        config.worker.cleanup_target_free_percent = parse_or(
            &var,
            "CLEANUP_TARGET_FREE_PERCENT",
            config.worker.cleanup_target_free_percent,
        )?;
        config.worker.auto_cleanup = parse_or(&var, "AUTO_CLEANUP", config.worker.auto_cleanup)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;
        self.queue.validate()?;
        self.disk.validate()?;

        if self.alerts.history_limit == 0 {
            return Err(RecoveryError::InvalidConfig(
                "alerts.history_limit must be greater than 0".to_string(),
            ));
        }
        if self.worker.drain_batch == 0 {
            return Err(RecoveryError::InvalidConfig(
                "worker.drain_batch must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.worker.cleanup_target_free_percent) {
            return Err(RecoveryError::InvalidConfig(
                "worker.cleanup_target_free_percent must be within 0..=100".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|err| {
            RecoveryError::InvalidConfig(format!("{ENV_PREFIX}{name}='{raw}': {err}"))
        }),
        None => Ok(default),
    }
}

fn split_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}
