//! Failure classification.
//!
//! Classification is table driven and ordered: the declared kind is checked
//! first, then the message is matched case-insensitively against the
//! substring tables below. Callers that never attach a typed kind still get
//! sensible behavior through the message fallback.

use crate::core::{Failure, FailureKind, Severity};

/// Declared kinds that are always retried.
pub const TRANSIENT_KINDS: &[FailureKind] = &[
    FailureKind::ConnectionLost,
    FailureKind::Interface,
    FailureKind::Timeout,
    FailureKind::PoolExhausted,
];

/// Message fragments that mark an otherwise untyped failure as transient.
pub const TRANSIENT_MESSAGE_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection timed out",
    "connection lost",
    "connection closed",
    "server closed the connection",
    "could not connect to server",
    "too many connections",
    "remaining connection slots are reserved",
    "broken pipe",
    "database is starting up",
    "database system is starting up",
    "database system is shutting down",
    "database system is in recovery mode",
    "terminating connection due to administrator command",
    "timeout expired",
];

pub const CRITICAL_PATTERNS: &[&str] = &[
    "out of memory",
    "disk full",
    "no space left",
    "connection refused",
];

pub const HIGH_PATTERNS: &[&str] = &["timeout", "connection lost", "authentication failed"];

pub const MEDIUM_PATTERNS: &[&str] = &["temporary failure", "retry", "network error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub transient: bool,
    pub severity: Severity,
}

/// Classifies a failure. Pure and deterministic.
pub fn classify(failure: &Failure) -> Classification {
    let message = failure.message.to_lowercase();
    Classification {
        transient: is_transient_kind(failure.kind)
            || matches_any(&message, TRANSIENT_MESSAGE_PATTERNS),
        severity: severity_for_message(&message),
    }
}

pub fn is_transient(failure: &Failure) -> bool {
    classify(failure).transient
}

fn is_transient_kind(kind: FailureKind) -> bool {
    TRANSIENT_KINDS.contains(&kind)
}

/// Expects an already lowercased message.
fn severity_for_message(message: &str) -> Severity {
    if matches_any(message, CRITICAL_PATTERNS) {
        Severity::Critical
    } else if matches_any(message, HIGH_PATTERNS) {
        Severity::High
    } else {
        // MEDIUM_PATTERNS and unmatched messages share the same level.
        Severity::Medium
    }
}

fn matches_any(message: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| message.contains(pattern))
}
