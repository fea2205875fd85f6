use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::metrics::v1::{
    Exemplar as OtlpExemplar, ExponentialHistogramDataPoint, HistogramDataPoint, Metric,
    NumberDataPoint, SummaryDataPoint, exemplar, metric, number_data_point,
};
use otelview_core::ids::to_hex;
use otelview_core::model::{
    AttrValue, Attributes, Exemplar, MetricRecord, MetricType, merge_attributes,
};
use otelview_core::time::nanos_to_dt;

use crate::otlp::attrs::{decode_attributes, service_name};

/// One record per datapoint, across every metric kind.
pub fn transform_metrics(req: &ExportMetricsServiceRequest) -> Vec<MetricRecord> {
    let mut out = Vec::new();
    for rm in &req.resource_metrics {
        let resource = rm.resource.as_ref();
        let ctx = MetricContext {
            service: service_name(resource),
            resource_attrs: resource.and_then(|r| decode_attributes(&r.attributes)),
        };
        for sm in &rm.scope_metrics {
            for metric in &sm.metrics {
                ctx.convert_metric(metric, &mut out);
            }
        }
    }
    out
}

struct MetricContext {
    service: String,
    resource_attrs: Option<Attributes>,
}

impl MetricContext {
    fn convert_metric(&self, metric: &Metric, out: &mut Vec<MetricRecord>) {
        let Some(data) = metric.data.as_ref() else {
            tracing::debug!(metric = %metric.name, "skipping metric without data");
            return;
        };
        match data {
            metric::Data::Gauge(gauge) => {
                for dp in &gauge.data_points {
                    out.push(self.number_point(metric, MetricType::Gauge, dp));
                }
            }
            metric::Data::Sum(sum) => {
                for dp in &sum.data_points {
                    out.push(self.number_point(metric, MetricType::Sum, dp));
                }
            }
            metric::Data::Histogram(hist) => {
                for dp in &hist.data_points {
                    out.push(self.histogram_point(metric, dp));
                }
            }
            metric::Data::ExponentialHistogram(hist) => {
                for dp in &hist.data_points {
                    out.push(self.exponential_point(metric, dp));
                }
            }
            metric::Data::Summary(summary) => {
                for dp in &summary.data_points {
                    out.push(self.summary_point(metric, dp));
                }
            }
        }
    }

    fn number_point(&self, metric: &Metric, kind: MetricType, dp: &NumberDataPoint) -> MetricRecord {
        let value = match dp.value {
            Some(number_data_point::Value::AsDouble(d)) => d,
            Some(number_data_point::Value::AsInt(i)) => i as f64,
            None => 0.0,
        };
        self.record(
            metric,
            kind,
            dp.time_unix_nano,
            value,
            &dp.attributes,
            Vec::new(),
            &dp.exemplars,
        )
    }

    fn histogram_point(&self, metric: &Metric, dp: &HistogramDataPoint) -> MetricRecord {
        let sum = dp.sum.unwrap_or_default();
        let buckets = dp
            .bucket_counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                let mut bucket = Attributes::new();
                bucket.insert("count".to_string(), AttrValue::Int(*count as i64));
                // the overflow bucket has no upper bound
                if let Some(bound) = dp.explicit_bounds.get(i) {
                    bucket.insert("upper_bound".to_string(), AttrValue::Float(*bound));
                }
                AttrValue::Map(bucket)
            })
            .collect();

        self.record(
            metric,
            MetricType::Histogram,
            dp.time_unix_nano,
            sum,
            &dp.attributes,
            vec![
                ("count", AttrValue::Int(dp.count as i64)),
                ("sum", AttrValue::Float(sum)),
                ("buckets", AttrValue::List(buckets)),
            ],
            &dp.exemplars,
        )
    }

    fn exponential_point(&self, metric: &Metric, dp: &ExponentialHistogramDataPoint) -> MetricRecord {
        let sum = dp.sum.unwrap_or_default();
        self.record(
            metric,
            MetricType::ExponentialHistogram,
            dp.time_unix_nano,
            sum,
            &dp.attributes,
            vec![
                ("count", AttrValue::Int(dp.count as i64)),
                ("sum", AttrValue::Float(sum)),
                ("scale", AttrValue::Int(i64::from(dp.scale))),
            ],
            &dp.exemplars,
        )
    }

    fn summary_point(&self, metric: &Metric, dp: &SummaryDataPoint) -> MetricRecord {
        let quantiles = dp
            .quantile_values
            .iter()
            .map(|q| {
                let mut entry = Attributes::new();
                entry.insert("quantile".to_string(), AttrValue::Float(q.quantile));
                entry.insert("value".to_string(), AttrValue::Float(q.value));
                AttrValue::Map(entry)
            })
            .collect();

        self.record(
            metric,
            MetricType::Summary,
            dp.time_unix_nano,
            dp.sum,
            &dp.attributes,
            vec![
                ("count", AttrValue::Int(dp.count as i64)),
                ("sum", AttrValue::Float(dp.sum)),
                ("quantiles", AttrValue::List(quantiles)),
            ],
            &[],
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        metric: &Metric,
        kind: MetricType,
        time_unix_nano: u64,
        value: f64,
        point_attrs: &[KeyValue],
        shape: Vec<(&str, AttrValue)>,
        exemplars: &[OtlpExemplar],
    ) -> MetricRecord {
        let mut point = decode_attributes(point_attrs).unwrap_or_default();
        point.extend(shape.into_iter().map(|(k, v)| (k.to_string(), v)));
        let merged = merge_attributes(self.resource_attrs.as_ref(), Some(&point));

        MetricRecord {
            id: 0,
            timestamp: nanos_to_dt(time_unix_nano),
            metric_name: metric.name.clone(),
            metric_type: kind,
            service_name: self.service.clone(),
            value,
            unit: (!metric.unit.is_empty()).then(|| metric.unit.clone()),
            attributes: (!merged.is_empty()).then_some(merged),
            exemplars: convert_exemplars(exemplars),
        }
    }
}

fn convert_exemplars(exemplars: &[OtlpExemplar]) -> Option<Vec<Exemplar>> {
    if exemplars.is_empty() {
        return None;
    }
    Some(
        exemplars
            .iter()
            .map(|ex| Exemplar {
                value: match ex.value {
                    Some(exemplar::Value::AsDouble(d)) => d,
                    Some(exemplar::Value::AsInt(i)) => i as f64,
                    None => 0.0,
                },
                timestamp: nanos_to_dt(ex.time_unix_nano),
                trace_id: to_hex(&ex.trace_id),
                span_id: to_hex(&ex.span_id),
                attributes: decode_attributes(&ex.filtered_attributes),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use opentelemetry_proto::tonic::metrics::v1::{
        ExponentialHistogram, Histogram, Sum, Summary, summary_data_point,
    };

    use super::*;

    fn request(metric: Metric) -> ExportMetricsServiceRequest {
        testkit::metrics_request("api", vec![metric])
    }

    fn with_data(name: &str, data: metric::Data) -> Metric {
        Metric {
            name: name.to_string(),
            data: Some(data),
            ..Default::default()
        }
    }

    fn attr<'a>(record: &'a MetricRecord, key: &str) -> Option<&'a AttrValue> {
        record.attributes.as_ref().and_then(|a| a.get(key))
    }

    #[test]
    fn gauge_emits_one_record_per_point() {
        let records = transform_metrics(&request(testkit::gauge(
            "latency",
            &[(0, 1.5), (1_000, 2.5), (2_000, 4.0)],
        )));

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.metric_type == MetricType::Gauge));
        assert_eq!(records[2].value, 4.0);
        assert_eq!(records[0].unit.as_deref(), Some("ms"));
        assert_eq!(records[0].service_name, "api");
        assert_eq!(attr(&records[0], "service.name"), Some(&AttrValue::from("api")));
        assert!(records[0].exemplars.is_none());
    }

    #[test]
    fn sum_coerces_ints_and_point_attrs_win() {
        let metric = with_data(
            "requests",
            metric::Data::Sum(Sum {
                data_points: vec![NumberDataPoint {
                    attributes: vec![testkit::str_kv("service.name", "override")],
                    time_unix_nano: testkit::BASE_NANOS,
                    value: Some(number_data_point::Value::AsInt(42)),
                    exemplars: vec![OtlpExemplar {
                        time_unix_nano: testkit::BASE_NANOS,
                        trace_id: testkit::TRACE_ID.to_vec(),
                        span_id: testkit::ROOT_SPAN_ID.to_vec(),
                        value: Some(exemplar::Value::AsInt(7)),
                        filtered_attributes: vec![testkit::str_kv("route", "/a")],
                    }],
                    ..Default::default()
                }],
                aggregation_temporality: 2,
                is_monotonic: true,
            }),
        );

        let records = transform_metrics(&request(metric));

        assert_eq!(records[0].metric_type, MetricType::Sum);
        assert_eq!(records[0].value, 42.0);
        assert_eq!(records[0].service_name, "api");
        assert_eq!(attr(&records[0], "service.name"), Some(&AttrValue::from("override")));
        let exemplars = records[0].exemplars.as_ref().unwrap();
        assert_eq!(exemplars[0].value, 7.0);
        assert_eq!(exemplars[0].trace_id, testkit::TRACE_ID_HEX);
        assert_eq!(exemplars[0].span_id, testkit::ROOT_SPAN_HEX);
        assert!(exemplars[0].attributes.is_some());
    }

    #[test]
    fn histogram_folds_buckets_into_attributes() {
        let metric = with_data(
            "http.duration",
            metric::Data::Histogram(Histogram {
                data_points: vec![HistogramDataPoint {
                    time_unix_nano: testkit::BASE_NANOS,
                    count: 6,
                    sum: Some(120.0),
                    bucket_counts: vec![1, 2, 3],
                    explicit_bounds: vec![10.0, 50.0],
                    ..Default::default()
                }],
                aggregation_temporality: 2,
            }),
        );

        let records = transform_metrics(&request(metric));
        let record = &records[0];

        assert_eq!(record.metric_type, MetricType::Histogram);
        assert_eq!(record.value, 120.0);
        assert_eq!(attr(record, "count"), Some(&AttrValue::Int(6)));
        assert_eq!(attr(record, "sum"), Some(&AttrValue::Float(120.0)));
        let Some(AttrValue::List(buckets)) = attr(record, "buckets") else {
            panic!("buckets missing");
        };
        assert_eq!(buckets.len(), 3);
        let bounds: Vec<bool> = buckets
            .iter()
            .map(|b| matches!(b, AttrValue::Map(m) if m.contains_key("upper_bound")))
            .collect();
        assert_eq!(bounds, vec![true, true, false]);
    }

    #[test]
    fn exponential_histogram_and_summary() {
        let exp = with_data(
            "payload.size",
            metric::Data::ExponentialHistogram(ExponentialHistogram {
                data_points: vec![ExponentialHistogramDataPoint {
                    time_unix_nano: testkit::BASE_NANOS,
                    count: 4,
                    sum: Some(64.0),
                    scale: 3,
                    ..Default::default()
                }],
                aggregation_temporality: 2,
            }),
        );
        let summary = with_data(
            "gc.pause",
            metric::Data::Summary(Summary {
                data_points: vec![SummaryDataPoint {
                    time_unix_nano: testkit::BASE_NANOS,
                    count: 10,
                    sum: 2.5,
                    quantile_values: vec![
                        summary_data_point::ValueAtQuantile {
                            quantile: 0.5,
                            value: 0.2,
                        },
                        summary_data_point::ValueAtQuantile {
                            quantile: 0.99,
                            value: 0.9,
                        },
                    ],
                    ..Default::default()
                }],
            }),
        );

        let records = transform_metrics(&testkit::metrics_request("api", vec![exp, summary]));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].metric_type, MetricType::ExponentialHistogram);
        assert_eq!(records[0].value, 64.0);
        assert_eq!(attr(&records[0], "scale"), Some(&AttrValue::Int(3)));
        assert_eq!(records[1].metric_type, MetricType::Summary);
        assert_eq!(records[1].value, 2.5);
        let Some(AttrValue::List(quantiles)) = attr(&records[1], "quantiles") else {
            panic!("quantiles missing");
        };
        assert_eq!(quantiles.len(), 2);
        assert!(records[1].exemplars.is_none());
    }

    #[test]
    fn metric_without_data_is_skipped() {
        let empty = Metric {
            name: "nothing".to_string(),
            ..Default::default()
        };
        assert!(transform_metrics(&request(empty)).is_empty());

        let mut unnamed = testkit::metrics_request("api", vec![testkit::gauge("g", &[(0, 1.0)])]);
        unnamed.resource_metrics[0].resource = None;
        let records = transform_metrics(&unnamed);
        assert_eq!(records[0].service_name, "unknown");
        assert!(records[0].attributes.is_none());
    }
}
