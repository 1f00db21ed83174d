pub mod local_queue;
pub mod operation;
pub mod persistence;

pub use local_queue::{LocalQueue, QueueConfig};
pub use operation::QueuedOperation;
