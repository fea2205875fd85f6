use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{LogRecord, MetricRecord, Trace};

pub const MIN_COMPARE_TRACES: usize = 2;
pub const MAX_COMPARE_TRACES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    Avg,
    Sum,
    Min,
    Max,
    Count,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }

    pub fn sql_function(&self) -> &'static str {
        match self {
            Self::Avg => "AVG",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Count => "COUNT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeBucket {
    #[serde(rename = "1 minute", alias = "1m")]
    OneMinute,
    #[serde(rename = "5 minutes", alias = "5m")]
    FiveMinutes,
    #[serde(rename = "15 minutes", alias = "15m")]
    FifteenMinutes,
    #[serde(rename = "30 minutes", alias = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1 hour", alias = "1h")]
    OneHour,
    #[serde(rename = "6 hours", alias = "6h")]
    SixHours,
}

impl TimeBucket {
    pub fn seconds(&self) -> i64 {
        match self {
            Self::OneMinute => 60,
            Self::FiveMinutes => 300,
            Self::FifteenMinutes => 900,
            Self::ThirtyMinutes => 1_800,
            Self::OneHour => 3_600,
            Self::SixHours => 21_600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub aggregation_type: AggregationType,
    pub time_bucket: TimeBucket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub time_bucket: DateTime<Utc>,
    pub metric_name: String,
    pub aggregation_type: AggregationType,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResponse {
    pub results: Vec<AggregationResult>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracesResponse {
    pub traces: Vec<Trace>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub trace_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spread<T> {
    pub min: T,
    pub max: T,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceComparison {
    pub count: usize,
    pub duration_ms: Spread<i64>,
    pub span_count: Spread<usize>,
    pub total_errors: usize,
}

impl TraceComparison {
    /// Summary statistics over the compared traces; `None` when there is nothing to compare.
    pub fn from_traces(traces: &[Trace]) -> Option<Self> {
        let first = traces.first()?;
        let n = traces.len() as f64;

        let mut duration = Spread {
            min: first.duration_ms,
            max: first.duration_ms,
            avg: 0.0,
        };
        let mut spans = Spread {
            min: first.span_count,
            max: first.span_count,
            avg: 0.0,
        };
        let mut duration_total = 0i64;
        let mut span_total = 0usize;
        let mut total_errors = 0usize;

        for trace in traces {
            duration.min = duration.min.min(trace.duration_ms);
            duration.max = duration.max.max(trace.duration_ms);
            spans.min = spans.min.min(trace.span_count);
            spans.max = spans.max.max(trace.span_count);
            duration_total += trace.duration_ms;
            span_total += trace.span_count;
            total_errors += trace.error_count;
        }
        duration.avg = duration_total as f64 / n;
        spans.avg = span_total as f64 / n;

        Some(Self {
            count: traces.len(),
            duration_ms: duration,
            span_count: spans,
            total_errors,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResponse {
    pub traces: Vec<Trace>,
    pub comparison: TraceComparison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<LogRecord>,
    pub count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceLogsResponse {
    pub logs: Vec<LogRecord>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub metrics: Vec<MetricRecord>,
    pub count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricNamesResponse {
    pub names: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesResponse {
    pub services: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::model::SpanStatus;

    fn trace(id: &str, duration_ms: i64, span_count: usize, error_count: usize) -> Trace {
        let start = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        Trace {
            trace_id: id.to_string(),
            service_name: "svc".to_string(),
            operation_name: "op".to_string(),
            start_time: start,
            end_time: start + chrono::Duration::milliseconds(duration_ms),
            duration_ms,
            span_count,
            error_count,
            status_code: SpanStatus::Unset,
            attributes: None,
            spans: Vec::new(),
        }
    }

    #[test]
    fn comparison_stats() {
        let traces = vec![trace("a", 100, 2, 0), trace("b", 300, 5, 2), trace("c", 50, 3, 1)];

        let cmp = TraceComparison::from_traces(&traces).unwrap();

        assert_eq!(cmp.count, 3);
        assert_eq!(cmp.duration_ms.min, 50);
        assert_eq!(cmp.duration_ms.max, 300);
        assert_eq!(cmp.duration_ms.avg, 150.0);
        assert_eq!(cmp.span_count.min, 2);
        assert_eq!(cmp.span_count.max, 5);
        assert!((cmp.span_count.avg - 10.0 / 3.0).abs() < 1e-9);
        assert_eq!(cmp.total_errors, 3);
        assert!(TraceComparison::from_traces(&[]).is_none());
    }

    #[test]
    fn aggregation_request_parses_bucket_names() {
        let req: AggregationRequest = serde_json::from_value(serde_json::json!({
            "metric_name": "http.server.duration",
            "start_time": "2026-02-01T00:00:00Z",
            "end_time": "2026-02-01T01:00:00Z",
            "aggregation_type": "sum",
            "time_bucket": "15 minutes"
        }))
        .unwrap();

        assert_eq!(req.aggregation_type, AggregationType::Sum);
        assert_eq!(req.time_bucket.seconds(), 900);
        assert!(req.service_name.is_none());

        let short: TimeBucket = serde_json::from_value(serde_json::json!("6h")).unwrap();
        assert_eq!(short, TimeBucket::SixHours);
        assert!(serde_json::from_value::<TimeBucket>(serde_json::json!("2 days")).is_err());
    }
}
