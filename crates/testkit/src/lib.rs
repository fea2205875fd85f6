use chrono::{DateTime, Duration, Utc};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue, any_value};
use opentelemetry_proto::tonic::logs::v1::{LogRecord as OtlpLogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::metrics::v1::{
    Gauge, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics, metric, number_data_point,
};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span as OtlpSpan, Status, span};
use otelview_core::model::{
    AttrValue, Attributes, LogRecord, MetricRecord, MetricType, Span, SpanEvent, SpanKind,
    SpanStatus, Trace,
};

pub const TRACE_ID: [u8; 16] = [
    0x4b, 0xf9, 0x2f, 0x35, 0x77, 0xb3, 0x4d, 0xa6, 0xa3, 0xce, 0x92, 0x9d, 0x0e, 0x0e, 0x47, 0x36,
];
pub const TRACE_ID_HEX: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
pub const ROOT_SPAN_ID: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 0x0a];
pub const ROOT_SPAN_HEX: &str = "000000000000000a";
pub const CHILD_SPAN_ID: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 0x0b];
pub const CHILD_SPAN_HEX: &str = "000000000000000b";

/// 2026-02-01T00:00:00Z in unix nanoseconds.
pub const BASE_NANOS: u64 = 1_769_904_000_000_000_000;

pub fn attrs(pairs: &[(&str, AttrValue)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Root span (100ms) with one child span (60ms) nested inside it.
pub fn sample_trace(trace_id: &str, service: &str, start: DateTime<Utc>) -> Trace {
    let root_id = format!("{trace_id}-root");
    let root = Span {
        span_id: root_id.clone(),
        trace_id: trace_id.to_string(),
        parent_span_id: None,
        service_name: service.to_string(),
        operation_name: "GET /checkout".to_string(),
        span_kind: SpanKind::Server,
        start_time: start,
        end_time: start + Duration::milliseconds(100),
        duration_ms: 100,
        status_code: SpanStatus::Ok,
        status_message: None,
        attributes: Some(attrs(&[("http.method", "GET".into())])),
        events: Vec::new(),
        links: Vec::new(),
    };
    let child = Span {
        span_id: format!("{trace_id}-child"),
        trace_id: trace_id.to_string(),
        parent_span_id: Some(root_id),
        service_name: service.to_string(),
        operation_name: "SELECT orders".to_string(),
        span_kind: SpanKind::Client,
        start_time: start + Duration::milliseconds(20),
        end_time: start + Duration::milliseconds(80),
        duration_ms: 60,
        status_code: SpanStatus::Unset,
        status_message: None,
        attributes: Some(attrs(&[("db.system", "duckdb".into())])),
        events: vec![SpanEvent {
            name: "rows fetched".to_string(),
            timestamp: start + Duration::milliseconds(70),
            attributes: Some(attrs(&[("rows", 3i64.into())])),
        }],
        links: Vec::new(),
    };

    let mut trace = Trace::seed(&root, Some(attrs(&[("service.name", service.into())])));
    trace.absorb(&child);
    trace.spans = vec![root, child];
    trace
}

pub fn log_record(
    ts: DateTime<Utc>,
    service: &str,
    severity: i32,
    body: &str,
    trace_id: Option<&str>,
) -> LogRecord {
    LogRecord {
        id: 0,
        timestamp: ts,
        trace_id: trace_id.map(str::to_string),
        span_id: trace_id.map(|t| format!("{t}-root")),
        severity_text: String::new(),
        severity_number: severity,
        body: body.to_string(),
        service_name: service.to_string(),
        attributes: Some(attrs(&[("logger", "app".into())])),
        resource_attributes: Some(attrs(&[("service.name", service.into())])),
    }
}

/// `count` gauge points valued 1..=count, `step` apart.
pub fn metric_series(
    name: &str,
    service: &str,
    start: DateTime<Utc>,
    count: usize,
    step: Duration,
) -> Vec<MetricRecord> {
    (0..count)
        .map(|i| MetricRecord {
            id: 0,
            timestamp: start + step * i as i32,
            metric_name: name.to_string(),
            metric_type: MetricType::Gauge,
            service_name: service.to_string(),
            value: (i + 1) as f64,
            unit: Some("1".to_string()),
            attributes: Some(attrs(&[("host", "a".into())])),
            exemplars: None,
        })
        .collect()
}

pub fn str_kv(key: &str, value: &str) -> KeyValue {
    kv(key, any_value::Value::StringValue(value.to_string()))
}

pub fn kv(key: &str, value: any_value::Value) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue { value: Some(value) }),
    }
}

pub fn resource(service: &str) -> Resource {
    Resource {
        attributes: vec![str_kv("service.name", service)],
        ..Default::default()
    }
}

fn scope() -> InstrumentationScope {
    InstrumentationScope {
        name: "testkit".to_string(),
        version: "0.1.0".to_string(),
        ..Default::default()
    }
}

pub fn otlp_span(
    span_id: [u8; 8],
    parent: Option<[u8; 8]>,
    name: &str,
    start_ms: u64,
    end_ms: u64,
    status_code: i32,
) -> OtlpSpan {
    OtlpSpan {
        trace_id: TRACE_ID.to_vec(),
        span_id: span_id.to_vec(),
        parent_span_id: parent.map(|p| p.to_vec()).unwrap_or_default(),
        name: name.to_string(),
        kind: span::SpanKind::Server as i32,
        start_time_unix_nano: BASE_NANOS + start_ms * 1_000_000,
        end_time_unix_nano: BASE_NANOS + end_ms * 1_000_000,
        status: Some(Status {
            message: String::new(),
            code: status_code,
        }),
        ..Default::default()
    }
}

pub fn trace_request(service: &str, spans: Vec<OtlpSpan>) -> ExportTraceServiceRequest {
    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(resource(service)),
            scope_spans: vec![ScopeSpans {
                scope: Some(scope()),
                spans,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

/// Root span A (100ms) and child span B (60ms, parent A) for `service`.
pub fn root_and_child_request(service: &str) -> ExportTraceServiceRequest {
    trace_request(
        service,
        vec![
            otlp_span(ROOT_SPAN_ID, None, "GET /orders", 0, 100, 0),
            otlp_span(CHILD_SPAN_ID, Some(ROOT_SPAN_ID), "load orders", 20, 80, 0),
        ],
    )
}

pub fn otlp_log(body: &str, severity: i32, trace_id: &[u8], offset_ms: u64) -> OtlpLogRecord {
    OtlpLogRecord {
        time_unix_nano: BASE_NANOS + offset_ms * 1_000_000,
        severity_number: severity,
        body: Some(AnyValue {
            value: Some(any_value::Value::StringValue(body.to_string())),
        }),
        attributes: vec![str_kv("logger", "app")],
        trace_id: trace_id.to_vec(),
        ..Default::default()
    }
}

pub fn logs_request(service: &str, log_records: Vec<OtlpLogRecord>) -> ExportLogsServiceRequest {
    ExportLogsServiceRequest {
        resource_logs: vec![ResourceLogs {
            resource: Some(resource(service)),
            scope_logs: vec![ScopeLogs {
                scope: Some(scope()),
                log_records,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

pub fn metrics_request(service: &str, metrics: Vec<Metric>) -> ExportMetricsServiceRequest {
    ExportMetricsServiceRequest {
        resource_metrics: vec![ResourceMetrics {
            resource: Some(resource(service)),
            scope_metrics: vec![ScopeMetrics {
                scope: Some(scope()),
                metrics,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

/// Gauge with one double point per `(offset_ms, value)` pair.
pub fn gauge(name: &str, points: &[(u64, f64)]) -> Metric {
    Metric {
        name: name.to_string(),
        unit: "ms".to_string(),
        data: Some(metric::Data::Gauge(Gauge {
            data_points: points
                .iter()
                .map(|(offset_ms, value)| NumberDataPoint {
                    time_unix_nano: BASE_NANOS + offset_ms * 1_000_000,
                    value: Some(number_data_point::Value::AsDouble(*value)),
                    ..Default::default()
                })
                .collect(),
        })),
        ..Default::default()
    }
}
