use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Declared classification carried by a [`Failure`].
///
/// The first four kinds are the connectivity class and are always treated as
/// transient by the classifier. Everything else is only retried when its
/// message matches one of the transient patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The connection to the database dropped or could not be established.
    ConnectionLost,
    /// The driver reported that its connection handle is no longer usable.
    Interface,
    /// A connect, query or lock wait timed out.
    Timeout,
    /// No connection could be checked out of the pool.
    PoolExhausted,
    Syntax,
    PermissionDenied,
    NotFound,
    InvalidValue,
    Io,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ConnectionLost => "connection_lost",
            FailureKind::Interface => "interface",
            FailureKind::Timeout => "timeout",
            FailureKind::PoolExhausted => "pool_exhausted",
            FailureKind::Syntax => "syntax",
            FailureKind::PermissionDenied => "permission_denied",
            FailureKind::NotFound => "not_found",
            FailureKind::InvalidValue => "invalid_value",
            FailureKind::Io => "io",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-facing severity of a failure or alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed operation as reported to the recovery subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wraps an error that carries no typed classification.
    ///
    /// Only the message is kept, so classification falls back to substring
    /// matching.
    pub fn untyped(err: impl fmt::Display) -> Self {
        Self::new(FailureKind::Unknown, err.to_string())
    }

    /// Maps an I/O error onto the closest declared kind.
    pub fn from_io(err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FailureKind::Timeout,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe => FailureKind::ConnectionLost,
            io::ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            io::ErrorKind::NotFound => FailureKind::NotFound,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => FailureKind::InvalidValue,
            _ => FailureKind::Io,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<io::Error> for Failure {
    fn from(err: io::Error) -> Self {
        Self::from_io(&err)
    }
}
