//! Age-based cleanup of log, temp and cache directories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Deletion policy chosen from the directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupRule {
    /// `*.log` files older than 7 days.
    Logs,
    /// Any file older than 1 day.
    Temporary,
    /// Any file older than 3 days.
    Cache,
}

impl CleanupRule {
    /// Picks a rule from the path name, case-insensitively. Components are
    /// checked from the last one up and the first that names a rule wins, so
    /// `/var/log/etl` is a log directory and `/tmp/jobs/cache` a cache. Within
    /// one component the order is `log`, then `tmp`/`temp`, then `cache`.
    pub fn for_path(path: &Path) -> Option<Self> {
        path.components()
            .rev()
            .find_map(|component| Self::for_name(&component.as_os_str().to_string_lossy()))
    }

    fn for_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.contains("log") {
            Some(CleanupRule::Logs)
        } else if name.contains("tmp") || name.contains("temp") {
            Some(CleanupRule::Temporary)
        } else if name.contains("cache") {
            Some(CleanupRule::Cache)
        } else {
            None
        }
    }

    pub fn max_age(&self) -> Duration {
        match self {
            CleanupRule::Logs => DAY * 7,
            CleanupRule::Temporary => DAY,
            CleanupRule::Cache => DAY * 3,
        }
    }

    fn matches(&self, file: &Path) -> bool {
        match self {
            CleanupRule::Logs => file
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("log")),
            CleanupRule::Temporary | CleanupRule::Cache => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathCleanupResult {
    pub path: String,
    pub rule: Option<CleanupRule>,
    pub files_removed: usize,
    pub bytes_freed: u64,
    /// Nothing was attempted: no rule applies, the directory is missing, or
    /// its filesystem already has the requested free space.
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub results: BTreeMap<String, PathCleanupResult>,
    pub total_freed_bytes: u64,
    pub success: bool,
}

impl CleanupReport {
    pub(crate) fn from_results(results: Vec<PathCleanupResult>) -> Self {
        let total_freed_bytes = results.iter().map(|result| result.bytes_freed).sum();
        let success = results.iter().all(|result| result.error.is_none());
        Self {
            results: results
                .into_iter()
                .map(|result| (result.path.clone(), result))
                .collect(),
            total_freed_bytes,
            success,
        }
    }
}

/// Applies the rule for `dir` to every file beneath it.
///
/// A file that cannot be removed is recorded as the path's error; remaining
/// files are still processed.
pub fn cleanup_directory(dir: &Path, now: SystemTime) -> PathCleanupResult {
    let mut result = PathCleanupResult {
        path: dir.display().to_string(),
        rule: CleanupRule::for_path(dir),
        ..PathCleanupResult::default()
    };

    let Some(rule) = result.rule else {
        result.skipped = true;
        return result;
    };
    if !dir.is_dir() {
        result.skipped = true;
        return result;
    }

    let files = match collect_files(dir) {
        Ok(files) => files,
        Err(err) => {
            result.error = Some(format!("failed to list '{}': {}", dir.display(), err));
            return result;
        }
    };

    for file in files {
        if !rule.matches(&file) {
            continue;
        }
        let Ok(metadata) = fs::metadata(&file) else {
            continue;
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= rule.max_age() {
            continue;
        }

        let size = metadata.len();
        match fs::remove_file(&file) {
            Ok(()) => {
                result.files_removed += 1;
                result.bytes_freed += size;
            }
            Err(err) => {
                if result.error.is_none() {
                    result.error = Some(format!("failed to delete '{}': {}", file.display(), err));
                }
            }
        }
    }

    result
}

fn collect_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_from_directory_name() {
        assert_eq!(CleanupRule::for_path(Path::new("/var/log/etl")), Some(CleanupRule::Logs));
        assert_eq!(CleanupRule::for_path(Path::new("/tmp/jobs/cache")), Some(CleanupRule::Cache));
        assert_eq!(CleanupRule::for_path(Path::new("/srv/etl/data")), None);
        assert_eq!(CleanupRule::for_path(Path::new("/var/etl/logs")), Some(CleanupRule::Logs));
        assert_eq!(CleanupRule::for_path(Path::new("/srv/tmp")), Some(CleanupRule::Temporary));
        assert_eq!(CleanupRule::for_path(Path::new("/srv/Temp")), Some(CleanupRule::Temporary));
        assert_eq!(CleanupRule::for_path(Path::new("/srv/http_cache")), Some(CleanupRule::Cache));
        // log wins over tmp
        assert_eq!(CleanupRule::for_path(Path::new("/srv/tmp_logs")), Some(CleanupRule::Logs));
    }

    #[test]
    fn test_max_ages() {
        assert_eq!(CleanupRule::Logs.max_age(), Duration::from_secs(7 * 86_400));
        assert_eq!(CleanupRule::Temporary.max_age(), Duration::from_secs(86_400));
        assert_eq!(CleanupRule::Cache.max_age(), Duration::from_secs(3 * 86_400));
    }

    #[test]
    fn test_log_rule_only_matches_log_files() {
        assert!(CleanupRule::Logs.matches(Path::new("a/job.log")));
        assert!(CleanupRule::Logs.matches(Path::new("a/job.LOG")));
        assert!(!CleanupRule::Logs.matches(Path::new("a/job.log.gz")));
        assert!(CleanupRule::Cache.matches(Path::new("a/blob.bin")));
    }

    #[test]
    fn test_report_success_requires_no_errors() {
        let ok = PathCleanupResult {
            path: "a".to_string(),
            bytes_freed: 10,
            ..PathCleanupResult::default()
        };
        let failed = PathCleanupResult {
            path: "b".to_string(),
            bytes_freed: 5,
            error: Some("denied".to_string()),
            ..PathCleanupResult::default()
        };
        let report = CleanupReport::from_results(vec![ok.clone(), failed]);
        assert_eq!(report.total_freed_bytes, 15);
        assert!(!report.success);

        let report = CleanupReport::from_results(vec![ok]);
        assert!(report.success);
    }
}
