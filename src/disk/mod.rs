pub mod cleanup;
pub mod monitor;
pub mod status;

pub use cleanup::{CleanupReport, CleanupRule, PathCleanupResult};
pub use monitor::{DiskMonitor, DiskMonitorConfig};
pub use status::{DiskAlert, DiskPathStatus, DiskSpaceReport, DiskStatus, DiskThresholds};
