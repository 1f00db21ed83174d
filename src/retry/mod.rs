pub mod classifier;
pub mod executor;
pub mod policy;

pub use classifier::{Classification, classify, is_transient};
pub use executor::{RetryExecutor, RetryOutcome};
pub use policy::RetryPolicy;
