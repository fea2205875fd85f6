//! Flattening of OTLP export requests into storage records.

mod logs;
mod metrics;
mod traces;

pub use logs::{body_to_string, transform_logs};
pub use metrics::transform_metrics;
pub use traces::transform_traces;
