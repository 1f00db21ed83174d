pub mod context;
pub mod error;
pub mod failure;
pub mod stats;

pub use context::{ErrorContext, Metadata, RecoveryAction, RecoveryResult};
pub use error::{RecoveryError, Result};
pub use failure::{Failure, FailureKind, Severity};
pub use stats::{RecoveryStats, RecoveryStatsSnapshot};
