pub mod attrs;
pub mod log;
pub mod metric;
pub mod trace;

pub use attrs::{AttrValue, Attributes, merge_attributes};
pub use log::LogRecord;
pub use metric::{Exemplar, MetricRecord, MetricType};
pub use trace::{Span, SpanEvent, SpanKind, SpanLink, SpanStatus, Trace};
