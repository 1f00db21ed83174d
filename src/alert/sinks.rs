//! Built-in alert sinks.

use super::dispatcher::{AlertHandler, AlertRecord};
use crate::core::Severity;
use anyhow::Context;
use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

/// Logs every alert through `tracing`, at a level derived from its severity.
pub fn tracing_sink() -> AlertHandler {
    Arc::new(|alert: &AlertRecord| -> anyhow::Result<()> {
        match alert.severity {
            Severity::Critical => error!(
                severity = %alert.severity,
                title = %alert.title,
                component = %alert.component,
                "ALERT: {}",
                alert.message
            ),
            Severity::High | Severity::Medium => warn!(
                severity = %alert.severity,
                title = %alert.title,
                component = %alert.component,
                "ALERT: {}",
                alert.message
            ),
            Severity::Low => info!(
                severity = %alert.severity,
                title = %alert.title,
                component = %alert.component,
                "ALERT: {}",
                alert.message
            ),
        }
        Ok(())
    })
}

/// Appends each alert as one JSON line to a log file.
///
/// The file is opened on the first alert and the handle is kept for later
/// ones. Writes are synchronous on the dispatching thread and cost one
/// buffered line write each. A failed write drops the handle so the next
/// alert reopens the file.
pub struct JsonlFileSink {
    path: PathBuf,
    writer: Mutex<Option<LineWriter<File>>>,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
        }
    }

    pub fn append(&self, alert: &AlertRecord) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(alert).context("failed to serialize alert")?;
        line.push(b'\n');

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if writer.is_none() {
            *writer = Some(LineWriter::new(self.open()?));
        }
        let Some(file) = writer.as_mut() else {
            return Ok(());
        };
        if let Err(err) = file.write_all(&line) {
            *writer = None;
            return Err(err)
                .with_context(|| format!("failed to write alert log '{}'", self.path.display()));
        }
        Ok(())
    }

    fn open(&self) -> anyhow::Result<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open alert log '{}'", self.path.display()))
    }

    pub fn into_handler(self) -> AlertHandler {
        let sink = Arc::new(self);
        Arc::new(move |alert: &AlertRecord| sink.append(alert))
    }
}
