pub mod dispatcher;
pub mod sinks;

pub use dispatcher::{
    ALERT_COMPONENT, AlertDispatcher, AlertHandler, AlertRecord, DEFAULT_HISTORY_LIMIT,
};
pub use sinks::{JsonlFileSink, tracing_sink};
