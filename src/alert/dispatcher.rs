use crate::core::{Metadata, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

pub const ALERT_COMPONENT: &str = "recovery";
pub const DEFAULT_HISTORY_LIMIT: usize = 1_000;

/// One alert as delivered to sinks and kept in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub component: String,
}

/// Alert sink callback. Errors and panics are caught by the dispatcher.
pub type AlertHandler = Arc<dyn Fn(&AlertRecord) -> anyhow::Result<()> + Send + Sync>;

/// Fans alerts out to every registered sink and keeps a bounded history.
///
/// History is a ring of the most recent `history_limit` records; the oldest
/// record is evicted first.
pub struct AlertDispatcher {
    handlers: RwLock<Vec<AlertHandler>>,
    history: Mutex<VecDeque<AlertRecord>>,
    history_limit: usize,
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl AlertDispatcher {
    pub fn new(history_limit: usize) -> Self {
        let history_limit = history_limit.max(1);
        Self {
            handlers: RwLock::new(Vec::new()),
            history: Mutex::new(VecDeque::with_capacity(history_limit.min(DEFAULT_HISTORY_LIMIT))),
            history_limit,
        }
    }

    pub fn add_handler(&self, handler: AlertHandler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Records the alert and delivers it to every sink.
    ///
    /// Returns `true` if at least one sink accepted it. With no sinks
    /// registered the alert is still recorded and `false` is returned.
    pub fn send_alert(
        &self,
        severity: Severity,
        title: &str,
        message: &str,
        metadata: Metadata,
    ) -> bool {
        let record = AlertRecord {
            timestamp: Utc::now(),
            severity,
            title: title.to_string(),
            message: message.to_string(),
            metadata,
            component: ALERT_COMPONENT.to_string(),
        };

        self.record(record.clone());

        let handlers: Vec<AlertHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut delivered = 0usize;
        for (index, handler) in handlers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(&record))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    warn!(
                        handler = index,
                        title = %record.title,
                        error = %err,
                        "alert handler failed"
                    );
                }
                Err(_) => {
                    warn!(handler = index, title = %record.title, "alert handler panicked");
                }
            }
        }

        debug!(
            severity = %record.severity,
            title = %record.title,
            delivered = delivered,
            handlers = handlers.len(),
            "alert dispatched"
        );
        delivered > 0
    }

    /// The most recent `limit` alerts, oldest first.
    pub fn history(&self, limit: usize) -> Vec<AlertRecord> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn record(&self, record: AlertRecord) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        while history.len() >= self.history_limit {
            history.pop_front();
        }
        history.push_back(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_returns_most_recent_in_order() {
        let dispatcher = AlertDispatcher::new(3);
        for i in 0..5 {
            dispatcher.send_alert(Severity::Low, &format!("alert {i}"), "", Metadata::new());
        }

        let titles: Vec<String> = dispatcher.history(10).into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["alert 2", "alert 3", "alert 4"]);

        let titles: Vec<String> = dispatcher.history(2).into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["alert 3", "alert 4"]);
    }

    #[test]
    fn test_no_handlers_is_not_delivered() {
        let dispatcher = AlertDispatcher::default();
        assert!(!dispatcher.send_alert(Severity::High, "t", "m", Metadata::new()));
        assert_eq!(dispatcher.history_len(), 1);
        assert_eq!(dispatcher.history(1)[0].component, ALERT_COMPONENT);
    }
}
