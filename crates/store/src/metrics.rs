use chrono::NaiveDateTime;
use duckdb::types::Value;
use duckdb::{params, params_from_iter};
use otelview_core::error::Result;
use otelview_core::filter::MetricFilters;
use otelview_core::model::{MetricRecord, MetricType};
use otelview_core::query::{AggregationRequest, AggregationResult};
use otelview_core::time::epoch_secs_to_dt;

use crate::Store;
use crate::sql::{Conditions, json_col, json_param, naive_to_utc, sql_ts, store_err};

const METRIC_COLUMNS: &str = "id, timestamp, metric_name, metric_type, service_name, value, unit, \
     attributes, exemplars";

impl Store {
    pub fn insert_metrics(&self, metrics: &[MetricRecord]) -> Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn();
        let tx = conn.transaction().map_err(store_err("begin tx failed"))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO metrics (timestamp, metric_name, metric_type, service_name, value,
                                          unit, attributes, exemplars)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(store_err("prepare insert metrics failed"))?;

            for metric in metrics {
                stmt.execute(params![
                    sql_ts(metric.timestamp),
                    metric.metric_name,
                    metric.metric_type.as_str(),
                    metric.service_name,
                    metric.value,
                    metric.unit,
                    json_param(metric.attributes.as_ref())?,
                    json_param(metric.exemplars.as_ref())?,
                ])
                .map_err(store_err("insert metric failed"))?;
            }
        }

        tx.commit().map_err(store_err("commit metrics failed"))
    }

    pub fn query_metrics(&self, filters: &MetricFilters) -> Result<Vec<MetricRecord>> {
        let cond = metric_conditions(filters);
        let sql = format!(
            "SELECT {METRIC_COLUMNS} FROM metrics {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            cond.where_sql()
        );
        let args = cond.paged_args(filters.limit, filters.offset);

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).map_err(store_err("prepare query metrics failed"))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                let kind: String = row.get(3)?;
                Ok(MetricRecord {
                    id: row.get(0)?,
                    timestamp: naive_to_utc(row.get::<_, NaiveDateTime>(1)?),
                    metric_name: row.get(2)?,
                    metric_type: kind.parse().unwrap_or(MetricType::Gauge),
                    service_name: row.get(4)?,
                    value: row.get(5)?,
                    unit: row.get(6)?,
                    attributes: json_col(row, 7)?,
                    exemplars: json_col(row, 8)?,
                })
            })
            .map_err(store_err("query metrics failed"))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err("read metric row failed"))?);
        }
        Ok(out)
    }

    /// Rows matching `filters`, ignoring limit and offset.
    pub fn count_metrics(&self, filters: &MetricFilters) -> Result<usize> {
        let cond = metric_conditions(filters);
        let sql = format!("SELECT COUNT(*) FROM metrics {}", cond.where_sql());
        let conn = self.conn();
        conn.query_row(&sql, params_from_iter(cond.args().iter()), |row| {
            row.get::<_, i64>(0)
        })
        .map(|v| v as usize)
        .map_err(store_err("count metrics failed"))
    }

    pub fn metric_names(&self, service: Option<&str>) -> Result<Vec<String>> {
        let mut cond = Conditions::new();
        cond.eq_text("service_name = ?", service);
        let sql = format!(
            "SELECT DISTINCT metric_name FROM metrics {} ORDER BY metric_name",
            cond.where_sql()
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).map_err(store_err("prepare metric names failed"))?;
        let rows = stmt
            .query_map(params_from_iter(cond.args().iter()), |row| row.get::<_, String>(0))
            .map_err(store_err("metric names failed"))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err("read metric name failed"))?);
        }
        Ok(out)
    }

    /// Per-bucket aggregate over one metric. Buckets are epoch-aligned multiples of the bucket
    /// width; buckets without rows are absent from the result.
    pub fn aggregate_metrics(&self, req: &AggregationRequest) -> Result<Vec<AggregationResult>> {
        let width = req.time_bucket.seconds();
        let func = req.aggregation_type.sql_function();

        let mut cond = Conditions::new();
        cond.push("metric_name = ?", [Value::Text(req.metric_name.clone())]);
        cond.push("timestamp >= ?", [Value::Text(sql_ts(req.start_time))]);
        cond.push("timestamp <= ?", [Value::Text(sql_ts(req.end_time))]);
        cond.eq_text("service_name = ?", req.service_name.as_deref());

        let sql = format!(
            "SELECT CAST(FLOOR(epoch(timestamp) / {width}) AS BIGINT) * {width} AS bucket,
                    CAST({func}(value) AS DOUBLE) AS agg,
                    MAX(unit) AS unit
             FROM metrics {}
             GROUP BY bucket
             ORDER BY bucket ASC",
            cond.where_sql()
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).map_err(store_err("prepare aggregate failed"))?;
        let rows = stmt
            .query_map(params_from_iter(cond.args().iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(store_err("aggregate metrics failed"))?;

        let mut out = Vec::new();
        for row in rows {
            let (bucket, value, unit) = row.map_err(store_err("read aggregate row failed"))?;
            out.push(AggregationResult {
                time_bucket: epoch_secs_to_dt(bucket),
                metric_name: req.metric_name.clone(),
                aggregation_type: req.aggregation_type,
                value: value.unwrap_or_default(),
                unit: unit.filter(|u| !u.is_empty()),
            });
        }
        tracing::debug!(
            metric = %req.metric_name,
            buckets = out.len(),
            width,
            "metric aggregation finished"
        );
        Ok(out)
    }
}

fn metric_conditions(filters: &MetricFilters) -> Conditions {
    let mut cond = Conditions::new();
    cond.window("timestamp >= ?", "timestamp <= ?", &filters.window);
    cond.eq_text("metric_name = ?", filters.name.as_deref());
    cond.eq_text("metric_type = ?", filters.metric_type.as_deref());
    cond.eq_text("service_name = ?", filters.service.as_deref());
    cond
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use otelview_core::filter::TimeWindow;
    use otelview_core::query::{AggregationType, TimeBucket};

    use super::*;

    fn base() -> chrono::DateTime<Utc> {
        // 2026-02-01T00:00:00Z is a multiple of every supported bucket width.
        Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
    }

    fn ten_points(store: &Store) {
        let points = testkit::metric_series("http.requests", "api", base(), 10, Duration::minutes(1));
        store.insert_metrics(&points).unwrap();
    }

    fn request(agg: AggregationType, bucket: TimeBucket) -> AggregationRequest {
        AggregationRequest {
            metric_name: "http.requests".to_string(),
            service_name: None,
            start_time: base() - Duration::hours(1),
            end_time: base() + Duration::hours(1),
            aggregation_type: agg,
            time_bucket: bucket,
        }
    }

    #[test]
    fn five_minute_average_has_two_buckets() {
        let store = Store::open_in_memory().unwrap();
        ten_points(&store);

        let results = store
            .aggregate_metrics(&request(AggregationType::Avg, TimeBucket::FiveMinutes))
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].time_bucket, base());
        assert_eq!(results[1].time_bucket, base() + Duration::minutes(5));
        // values are 1..=10
        assert_eq!(results[0].value, 3.0);
        assert_eq!(results[1].value, 8.0);
        assert_eq!(results[0].unit.as_deref(), Some("1"));
    }

    #[test]
    fn sum_and_count_per_bucket() {
        let store = Store::open_in_memory().unwrap();
        ten_points(&store);

        let sums = store
            .aggregate_metrics(&request(AggregationType::Sum, TimeBucket::FiveMinutes))
            .unwrap();
        let values: Vec<f64> = sums.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![15.0, 40.0]);

        let counts = store
            .aggregate_metrics(&request(AggregationType::Count, TimeBucket::FiveMinutes))
            .unwrap();
        assert!(counts.iter().all(|r| r.value == 5.0));

        let max = store
            .aggregate_metrics(&request(AggregationType::Max, TimeBucket::OneHour))
            .unwrap();
        assert_eq!(max.len(), 1);
        assert_eq!(max[0].value, 10.0);
        assert_eq!(max[0].aggregation_type, AggregationType::Max);
    }

    #[test]
    fn empty_buckets_are_skipped() {
        let store = Store::open_in_memory().unwrap();
        let mut points = testkit::metric_series("queue.depth", "api", base(), 2, Duration::minutes(1));
        points.extend(testkit::metric_series(
            "queue.depth",
            "api",
            base() + Duration::minutes(30),
            1,
            Duration::minutes(1),
        ));
        store.insert_metrics(&points).unwrap();

        let mut req = request(AggregationType::Min, TimeBucket::OneMinute);
        req.metric_name = "queue.depth".to_string();
        let results = store.aggregate_metrics(&req).unwrap();

        let buckets: Vec<_> = results.iter().map(|r| r.time_bucket).collect();
        assert_eq!(
            buckets,
            vec![base(), base() + Duration::minutes(1), base() + Duration::minutes(30)]
        );
    }

    #[test]
    fn unknown_metric_yields_no_rows() {
        let store = Store::open_in_memory().unwrap();
        ten_points(&store);
        let mut req = request(AggregationType::Avg, TimeBucket::OneMinute);
        req.metric_name = "does.not.exist".to_string();
        assert!(store.aggregate_metrics(&req).unwrap().is_empty());
    }

    #[test]
    fn service_filter_scopes_aggregation_and_names() {
        let store = Store::open_in_memory().unwrap();
        ten_points(&store);
        store
            .insert_metrics(&testkit::metric_series(
                "http.requests",
                "worker",
                base(),
                3,
                Duration::minutes(1),
            ))
            .unwrap();
        store
            .insert_metrics(&testkit::metric_series("jobs.done", "worker", base(), 1, Duration::minutes(1)))
            .unwrap();

        let mut req = request(AggregationType::Count, TimeBucket::OneHour);
        req.service_name = Some("worker".to_string());
        let results = store.aggregate_metrics(&req).unwrap();
        assert_eq!(results[0].value, 3.0);

        assert_eq!(store.metric_names(None).unwrap(), vec!["http.requests", "jobs.done"]);
        assert_eq!(store.metric_names(Some("api")).unwrap(), vec!["http.requests"]);
    }

    #[test]
    fn query_filters_and_counts() {
        let store = Store::open_in_memory().unwrap();
        ten_points(&store);

        let filters = MetricFilters {
            name: Some("http.requests".to_string()),
            metric_type: Some(MetricType::Gauge.as_str().to_string()),
            window: TimeWindow::between(base(), base() + Duration::minutes(4)),
            ..MetricFilters::default()
        };
        let rows = store.query_metrics(&filters).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].value, 5.0);
        assert_eq!(store.count_metrics(&filters).unwrap(), 5);

        let sums = MetricFilters {
            metric_type: Some(MetricType::Sum.as_str().to_string()),
            ..MetricFilters::default()
        };
        assert!(store.query_metrics(&sums).unwrap().is_empty());

        let unknown = MetricFilters {
            metric_type: Some("meter".to_string()),
            ..MetricFilters::default()
        };
        assert!(store.query_metrics(&unknown).unwrap().is_empty());
        assert_eq!(store.count_metrics(&unknown).unwrap(), 0);

        let oversized = MetricFilters {
            limit: usize::MAX,
            offset: usize::MAX,
            ..MetricFilters::default()
        };
        assert!(store.query_metrics(&oversized).unwrap().is_empty());

        let paged = MetricFilters {
            limit: 3,
            ..MetricFilters::default()
        };
        assert_eq!(store.query_metrics(&paged).unwrap().len(), 3);
        assert_eq!(store.count_metrics(&paged).unwrap(), 10);
    }
}
