use std::collections::HashMap;

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::trace::v1::Span as OtlpSpan;
use opentelemetry_proto::tonic::trace::v1::span::{Event, Link};
use otelview_core::ids::{id_to_hex, to_hex};
use otelview_core::model::{
    Span, SpanEvent, SpanKind, SpanLink, SpanStatus, Trace, merge_attributes,
};
use otelview_core::time::nanos_to_dt;

use crate::otlp::attrs::{decode_attributes, service_name};

/// Groups the request's spans into trace aggregates, in first-seen order of trace id.
/// The first span seen for a trace supplies its service, operation and attributes.
pub fn transform_traces(req: &ExportTraceServiceRequest) -> Vec<Trace> {
    let mut traces: Vec<Trace> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for rs in &req.resource_spans {
        let resource = rs.resource.as_ref();
        let service = service_name(resource);
        let resource_attrs = resource.and_then(|r| decode_attributes(&r.attributes));

        for ss in &rs.scope_spans {
            for otlp in &ss.spans {
                let Some(span) = convert_span(otlp, &service) else {
                    tracing::debug!(name = %otlp.name, "dropping span without trace or span id");
                    continue;
                };

                let slot = match index.get(&span.trace_id) {
                    Some(&slot) => {
                        traces[slot].absorb(&span);
                        slot
                    }
                    None => {
                        let merged = merge_attributes(resource_attrs.as_ref(), span.attributes.as_ref());
                        let attributes = (!merged.is_empty()).then_some(merged);
                        index.insert(span.trace_id.clone(), traces.len());
                        traces.push(Trace::seed(&span, attributes));
                        traces.len() - 1
                    }
                };
                traces[slot].spans.push(span);
            }
        }
    }

    traces
}

fn convert_span(span: &OtlpSpan, service: &str) -> Option<Span> {
    let trace_id = id_to_hex(&span.trace_id)?;
    let span_id = id_to_hex(&span.span_id)?;
    let status = span.status.as_ref();
    let duration_ns = span.end_time_unix_nano.saturating_sub(span.start_time_unix_nano);

    Some(Span {
        span_id,
        trace_id,
        parent_span_id: id_to_hex(&span.parent_span_id),
        service_name: service.to_string(),
        operation_name: span.name.clone(),
        span_kind: SpanKind::from_otlp(span.kind),
        start_time: nanos_to_dt(span.start_time_unix_nano),
        end_time: nanos_to_dt(span.end_time_unix_nano),
        duration_ms: (duration_ns / 1_000_000) as i64,
        status_code: SpanStatus::from(status.map(|s| s.code).unwrap_or_default()),
        status_message: status
            .map(|s| s.message.clone())
            .filter(|m| !m.is_empty()),
        attributes: decode_attributes(&span.attributes),
        events: span.events.iter().map(convert_event).collect(),
        links: span.links.iter().map(convert_link).collect(),
    })
}

fn convert_event(event: &Event) -> SpanEvent {
    SpanEvent {
        name: event.name.clone(),
        timestamp: nanos_to_dt(event.time_unix_nano),
        attributes: decode_attributes(&event.attributes),
    }
}

fn convert_link(link: &Link) -> SpanLink {
    SpanLink {
        trace_id: to_hex(&link.trace_id),
        span_id: to_hex(&link.span_id),
        attributes: decode_attributes(&link.attributes),
    }
}
