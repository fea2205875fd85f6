use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::common::v1::AnyValue;
use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::logs::v1::LogRecord as OtlpLogRecord;
use otelview_core::filter::Severity;
use otelview_core::ids::{id_to_hex, to_hex};
use otelview_core::model::{AttrValue, Attributes, LogRecord};
use otelview_core::time::nanos_to_dt;

use crate::otlp::attrs::{decode_any_value, decode_attributes, service_name};

pub fn transform_logs(req: &ExportLogsServiceRequest) -> Vec<LogRecord> {
    let mut out = Vec::new();
    for rl in &req.resource_logs {
        let resource = rl.resource.as_ref();
        let service = service_name(resource);
        let resource_attrs = resource.and_then(|r| decode_attributes(&r.attributes));

        for sl in &rl.scope_logs {
            for record in &sl.log_records {
                out.push(convert_log(record, &service, resource_attrs.as_ref()));
            }
        }
    }
    out
}

fn convert_log(
    record: &OtlpLogRecord,
    service: &str,
    resource_attrs: Option<&Attributes>,
) -> LogRecord {
    let ts_nanos = if record.time_unix_nano == 0 {
        record.observed_time_unix_nano
    } else {
        record.time_unix_nano
    };
    let severity_text = if record.severity_text.is_empty() {
        Severity::from_number(record.severity_number)
            .map(|s| s.label().to_string())
            .unwrap_or_default()
    } else {
        record.severity_text.clone()
    };

    LogRecord {
        id: 0,
        timestamp: nanos_to_dt(ts_nanos),
        trace_id: id_to_hex(&record.trace_id),
        span_id: id_to_hex(&record.span_id),
        severity_text,
        severity_number: record.severity_number,
        body: body_to_string(record.body.as_ref()),
        service_name: service.to_string(),
        attributes: decode_attributes(&record.attributes),
        resource_attributes: resource_attrs.cloned(),
    }
}

/// Human-readable rendering of a log body. Maps print as `map[k:v ...]` in key order;
/// arrays as `[a, b]`.
pub fn body_to_string(body: Option<&AnyValue>) -> String {
    let Some((any, value)) = body.and_then(|b| b.value.as_ref().map(|v| (b, v))) else {
        return String::new();
    };
    match value {
        Value::StringValue(s) => s.clone(),
        Value::IntValue(i) => i.to_string(),
        Value::DoubleValue(d) => d.to_string(),
        Value::BoolValue(b) => b.to_string(),
        Value::BytesValue(b) => to_hex(b),
        Value::KvlistValue(_) => decode_any_value(any).map(|v| render(&v)).unwrap_or_default(),
        Value::ArrayValue(array) => {
            let items: Vec<String> = array.values.iter().map(|v| body_to_string(Some(v))).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

fn render(value: &AttrValue) -> String {
    match value {
        AttrValue::String(s) => s.clone(),
        AttrValue::Int(i) => i.to_string(),
        AttrValue::Float(f) => f.to_string(),
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Bytes(b) => to_hex(b),
        AttrValue::Map(map) => {
            let entries: Vec<String> = map.iter().map(|(k, v)| format!("{k}:{}", render(v))).collect();
            format!("map[{}]", entries.join(" "))
        }
        AttrValue::List(items) => {
            let items: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", items.join(" "))
        }
    }
}
