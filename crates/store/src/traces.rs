use chrono::NaiveDateTime;
use duckdb::types::Value;
use duckdb::{OptionalExt, params, params_from_iter};
use otelview_core::error::{Result, ViewError};
use otelview_core::filter::TraceFilters;
use otelview_core::model::{Span, SpanKind, SpanStatus, Trace};

use crate::Store;
use crate::sql::{Conditions, json_col, json_param, naive_to_utc, sql_ts, store_err};

const TRACE_COLUMNS: &str = "trace_id, service_name, operation_name, start_time, end_time, \
     duration_ms, span_count, error_count, status_code, attributes";

const SPAN_COLUMNS: &str = "span_id, trace_id, parent_span_id, service_name, operation_name, \
     span_kind, start_time, end_time, duration_ms, status_code, status_message, attributes, \
     events, links";

impl Store {
    /// Upserts the trace row and inserts its spans in one transaction.
    /// Existing spans with the same id are left untouched.
    pub fn insert_trace(&self, trace: &Trace) -> Result<()> {
        let attributes = json_param(trace.attributes.as_ref())?;
        let mut span_rows = Vec::with_capacity(trace.spans.len());
        for span in &trace.spans {
            span_rows.push((
                span,
                json_param(span.attributes.as_ref())?,
                json_param((!span.events.is_empty()).then_some(&span.events))?,
                json_param((!span.links.is_empty()).then_some(&span.links))?,
            ));
        }

        let mut conn = self.conn();
        let tx = conn.transaction().map_err(store_err("begin tx failed"))?;

        tx.execute(
            "INSERT INTO traces (trace_id, service_name, operation_name, start_time, end_time,
                                 duration_ms, span_count, error_count, status_code, attributes)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (trace_id) DO UPDATE SET
               end_time = excluded.end_time,
               duration_ms = excluded.duration_ms,
               span_count = excluded.span_count,
               error_count = excluded.error_count",
            params![
                trace.trace_id,
                trace.service_name,
                trace.operation_name,
                sql_ts(trace.start_time),
                sql_ts(trace.end_time),
                trace.duration_ms,
                trace.span_count as i64,
                trace.error_count as i64,
                trace.status_code.code(),
                attributes,
            ],
        )
        .map_err(store_err("upsert trace failed"))?;

        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO spans ({SPAN_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT (span_id) DO NOTHING"
                ))
                .map_err(store_err("prepare insert spans failed"))?;

            for (span, attributes, events, links) in &span_rows {
                stmt.execute(params![
                    span.span_id,
                    span.trace_id,
                    span.parent_span_id,
                    span.service_name,
                    span.operation_name,
                    span.span_kind.as_str(),
                    sql_ts(span.start_time),
                    sql_ts(span.end_time),
                    span.duration_ms,
                    span.status_code.code(),
                    span.status_message,
                    attributes,
                    events,
                    links,
                ])
                .map_err(store_err("insert span failed"))?;
            }
        }

        tx.commit().map_err(store_err("commit trace failed"))
    }

    /// Each trace is committed on its own; the first failure stops the batch.
    pub fn insert_traces(&self, traces: &[Trace]) -> Result<()> {
        for trace in traces {
            self.insert_trace(trace)?;
        }
        Ok(())
    }

    pub fn query_traces(&self, filters: &TraceFilters) -> Result<Vec<Trace>> {
        let mut cond = Conditions::new();
        cond.eq_text("service_name = ?", filters.service.as_deref());
        if let Some(min) = filters.min_duration_ms.filter(|d| *d > 0) {
            cond.push("duration_ms >= ?", [Value::BigInt(min)]);
        }
        if let Some(max) = filters.max_duration_ms.filter(|d| *d > 0) {
            cond.push("duration_ms <= ?", [Value::BigInt(max)]);
        }
        if filters.errors_only {
            cond.push("error_count > 0", []);
        }
        if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
            cond.push(
                "(contains(operation_name, ?) OR contains(trace_id, ?))",
                [Value::Text(search.to_string()), Value::Text(search.to_string())],
            );
        }
        cond.window("start_time >= ?", "start_time <= ?", &filters.window);

        let sql = format!(
            "SELECT {TRACE_COLUMNS} FROM traces {} ORDER BY start_time DESC LIMIT ? OFFSET ?",
            cond.where_sql()
        );
        let args = cond.paged_args(filters.limit, filters.offset);

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).map_err(store_err("prepare query traces failed"))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), trace_from_row)
            .map_err(store_err("query traces failed"))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err("read trace row failed"))?);
        }
        Ok(out)
    }

    /// Trace row plus its spans ordered by start time.
    pub fn get_trace(&self, trace_id: &str) -> Result<Trace> {
        let conn = self.conn();
        let trace = conn
            .query_row(
                &format!("SELECT {TRACE_COLUMNS} FROM traces WHERE trace_id = ?"),
                params![trace_id],
                trace_from_row,
            )
            .optional()
            .map_err(store_err("get trace failed"))?;
        let Some(mut trace) = trace else {
            return Err(ViewError::NotFound(format!("trace not found: {trace_id}")));
        };

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SPAN_COLUMNS} FROM spans WHERE trace_id = ? ORDER BY start_time ASC"
            ))
            .map_err(store_err("prepare trace spans failed"))?;
        let rows = stmt
            .query_map(params![trace_id], span_from_row)
            .map_err(store_err("query trace spans failed"))?;
        for row in rows {
            trace
                .spans
                .push(row.map_err(store_err("read span row failed"))?);
        }
        Ok(trace)
    }

    pub fn list_services(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT DISTINCT service_name FROM traces ORDER BY service_name")
            .map_err(store_err("prepare list services failed"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(store_err("list services failed"))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err("read service row failed"))?);
        }
        Ok(out)
    }
}

fn trace_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Trace> {
    Ok(Trace {
        trace_id: row.get(0)?,
        service_name: row.get(1)?,
        operation_name: row.get(2)?,
        start_time: naive_to_utc(row.get::<_, NaiveDateTime>(3)?),
        end_time: naive_to_utc(row.get::<_, NaiveDateTime>(4)?),
        duration_ms: row.get(5)?,
        span_count: row.get::<_, i64>(6)? as usize,
        error_count: row.get::<_, i64>(7)? as usize,
        status_code: SpanStatus::from(row.get::<_, i32>(8)?),
        attributes: json_col(row, 9)?,
        spans: Vec::new(),
    })
}

fn span_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Span> {
    let kind: String = row.get(5)?;
    Ok(Span {
        span_id: row.get(0)?,
        trace_id: row.get(1)?,
        parent_span_id: row.get(2)?,
        service_name: row.get(3)?,
        operation_name: row.get(4)?,
        span_kind: kind.parse().unwrap_or(SpanKind::Unspecified),
        start_time: naive_to_utc(row.get::<_, NaiveDateTime>(6)?),
        end_time: naive_to_utc(row.get::<_, NaiveDateTime>(7)?),
        duration_ms: row.get(8)?,
        status_code: SpanStatus::from(row.get::<_, i32>(9)?),
        status_message: row.get(10)?,
        attributes: json_col(row, 11)?,
        events: json_col(row, 12)?.unwrap_or_default(),
        links: json_col(row, 13)?.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use otelview_core::filter::TimeWindow;
    use otelview_core::model::AttrValue;

    use super::*;

    fn base() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn insert_and_get_trace_orders_spans() {
        let store = Store::open_in_memory().unwrap();
        let trace = testkit::sample_trace("trace-1", "checkout", base());

        store.insert_trace(&trace).unwrap();
        let got = store.get_trace("trace-1").unwrap();

        assert_eq!(got.span_count, 2);
        assert_eq!(got.error_count, 0);
        assert_eq!(got.duration_ms, 100);
        assert_eq!(got.spans.len(), 2);
        assert!(got.spans[0].start_time <= got.spans[1].start_time);
        assert_eq!(got.spans[0].span_id, "trace-1-root");
        assert_eq!(got.spans[1].parent_span_id.as_deref(), Some("trace-1-root"));
        assert_eq!(got.spans[1].span_kind, SpanKind::Client);
        assert_eq!(got.spans[1].events.len(), 1);
        assert_eq!(
            got.attributes
                .as_ref()
                .and_then(|a| a.get("service.name"))
                .and_then(AttrValue::as_str),
            Some("checkout")
        );
    }

    #[test]
    fn missing_trace_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.get_trace("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn repeated_batches_upsert_counts_and_ignore_duplicate_spans() {
        let store = Store::open_in_memory().unwrap();
        let first = testkit::sample_trace("trace-1", "checkout", base());
        store.insert_trace(&first).unwrap();

        let mut second = testkit::sample_trace("trace-1", "checkout", base());
        second.operation_name = "other".to_string();
        second.end_time = base() + Duration::milliseconds(250);
        second.duration_ms = 250;
        second.span_count = 3;
        second.error_count = 1;
        second.spans[0].operation_name = "renamed".to_string();
        store.insert_trace(&second).unwrap();

        let got = store.get_trace("trace-1").unwrap();
        assert_eq!(got.operation_name, "GET /checkout");
        assert_eq!(got.duration_ms, 250);
        assert_eq!(got.span_count, 3);
        assert_eq!(got.error_count, 1);
        assert_eq!(got.spans.len(), 2);
        assert_eq!(got.spans[0].operation_name, "GET /checkout");
    }

    #[test]
    fn min_duration_filter_is_inclusive() {
        let store = Store::open_in_memory().unwrap();
        for (i, ms) in [10i64, 50, 100, 200, 400].iter().enumerate() {
            let mut trace = testkit::sample_trace(&format!("t{i}"), "svc", base());
            trace.duration_ms = *ms;
            trace.end_time = trace.start_time + Duration::milliseconds(*ms);
            trace.spans.clear();
            store.insert_trace(&trace).unwrap();
        }

        let got = store
            .query_traces(&TraceFilters {
                min_duration_ms: Some(100),
                ..TraceFilters::default()
            })
            .unwrap();
        let mut durations: Vec<i64> = got.iter().map(|t| t.duration_ms).collect();
        durations.sort();
        assert_eq!(durations, vec![100, 200, 400]);

        let got = store
            .query_traces(&TraceFilters {
                min_duration_ms: Some(50),
                max_duration_ms: Some(200),
                ..TraceFilters::default()
            })
            .unwrap();
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn query_filters_service_errors_search_and_pages() {
        let store = Store::open_in_memory().unwrap();
        for i in 0..5 {
            let service = if i % 2 == 0 { "api" } else { "worker" };
            let mut trace =
                testkit::sample_trace(&format!("trace-{i}"), service, base() + Duration::minutes(i));
            trace.error_count = usize::from(i == 3);
            store.insert_trace(&trace).unwrap();
        }

        let api = store
            .query_traces(&TraceFilters {
                service: Some("api".to_string()),
                ..TraceFilters::default()
            })
            .unwrap();
        let ids: Vec<&str> = api.iter().map(|t| t.trace_id.as_str()).collect();
        assert_eq!(ids, vec!["trace-4", "trace-2", "trace-0"]);

        let errors = store
            .query_traces(&TraceFilters {
                errors_only: true,
                ..TraceFilters::default()
            })
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].trace_id, "trace-3");

        let search = store
            .query_traces(&TraceFilters {
                search: Some("ce-1".to_string()),
                ..TraceFilters::default()
            })
            .unwrap();
        assert_eq!(search.len(), 1);

        let by_op = store
            .query_traces(&TraceFilters {
                search: Some("/checkout".to_string()),
                ..TraceFilters::default()
            })
            .unwrap();
        assert_eq!(by_op.len(), 5);

        let page = store
            .query_traces(&TraceFilters {
                limit: 2,
                offset: 1,
                ..TraceFilters::default()
            })
            .unwrap();
        let ids: Vec<&str> = page.iter().map(|t| t.trace_id.as_str()).collect();
        assert_eq!(ids, vec!["trace-3", "trace-2"]);

        let windowed = store
            .query_traces(&TraceFilters {
                window: TimeWindow::between(base() + Duration::minutes(1), base() + Duration::minutes(2)),
                ..TraceFilters::default()
            })
            .unwrap();
        assert_eq!(windowed.len(), 2);
    }

    #[test]
    fn services_are_distinct_and_sorted() {
        let store = Store::open_in_memory().unwrap();
        for (id, svc) in [("a", "worker"), ("b", "api"), ("c", "worker")] {
            store
                .insert_trace(&testkit::sample_trace(id, svc, base()))
                .unwrap();
        }
        assert_eq!(store.list_services().unwrap(), vec!["api", "worker"]);
    }
}
