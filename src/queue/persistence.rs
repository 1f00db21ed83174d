//! JSON snapshot file backing the local queue.

use super::operation::QueuedOperation;
use crate::core::{RecoveryError, Result};
use std::path::Path;
use tokio::fs;
use tracing::warn;

/// Reads a queue snapshot.
///
/// A missing file yields an empty list. So does a file that cannot be read
/// or parsed, after logging a warning.
pub async fn read_snapshot(path: &Path) -> Vec<QueuedOperation> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read queue snapshot");
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Vec<QueuedOperation>>(&bytes) {
        Ok(operations) => operations,
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "malformed queue snapshot, starting with an empty queue"
            );
            Vec::new()
        }
    }
}

/// Serializes the full queue contents and atomically replaces the snapshot.
pub async fn write_snapshot<'a, I>(path: &Path, operations: I) -> Result<()>
where
    I: IntoIterator<Item = &'a QueuedOperation>,
{
    let operations: Vec<&QueuedOperation> = operations.into_iter().collect();
    let bytes = serde_json::to_vec_pretty(&operations)?;
    atomic_write(path, &bytes).await
}

pub(crate) async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|err| {
            RecoveryError::Io(format!(
                "Failed to create parent directory '{}': {}",
                parent.display(),
                err
            ))
        })?;
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await.map_err(|err| {
        RecoveryError::Io(format!(
            "Failed to write temp file '{}': {}",
            tmp.display(),
            err
        ))
    })?;

    fs::rename(&tmp, path).await.map_err(|err| {
        RecoveryError::Io(format!(
            "Failed to rename temp file '{}' -> '{}': {}",
            tmp.display(),
            path.display(),
            err
        ))
    })?;
    Ok(())
}
