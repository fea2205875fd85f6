use chrono::NaiveDateTime;
use duckdb::types::Value;
use duckdb::{params, params_from_iter};
use otelview_core::error::Result;
use otelview_core::filter::LogFilters;
use otelview_core::model::LogRecord;

use crate::Store;
use crate::sql::{Conditions, json_col, json_param, naive_to_utc, sql_ts, store_err};

const LOG_COLUMNS: &str = "id, timestamp, trace_id, span_id, severity_text, severity_number, \
     body, service_name, attributes, resource_attributes";

impl Store {
    /// Inserts the whole batch or nothing.
    pub fn insert_logs(&self, logs: &[LogRecord]) -> Result<()> {
        if logs.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn();
        let tx = conn.transaction().map_err(store_err("begin tx failed"))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO logs (timestamp, trace_id, span_id, severity_text, severity_number,
                                       body, service_name, attributes, resource_attributes)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(store_err("prepare insert logs failed"))?;

            for log in logs {
                stmt.execute(params![
                    sql_ts(log.timestamp),
                    log.trace_id,
                    log.span_id,
                    log.severity_text,
                    log.severity_number,
                    log.body,
                    log.service_name,
                    json_param(log.attributes.as_ref())?,
                    json_param(log.resource_attributes.as_ref())?,
                ])
                .map_err(store_err("insert log failed"))?;
            }
        }

        tx.commit().map_err(store_err("commit logs failed"))
    }

    pub fn query_logs(&self, filters: &LogFilters) -> Result<Vec<LogRecord>> {
        let cond = log_conditions(filters);
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM logs {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            cond.where_sql()
        );
        self.select_logs(&sql, cond.paged_args(filters.limit, filters.offset))
    }

    /// Rows matching `filters`, ignoring limit and offset.
    pub fn count_logs(&self, filters: &LogFilters) -> Result<usize> {
        let cond = log_conditions(filters);
        let sql = format!("SELECT COUNT(*) FROM logs {}", cond.where_sql());
        let conn = self.conn();
        conn.query_row(&sql, params_from_iter(cond.args().iter()), |row| {
            row.get::<_, i64>(0)
        })
        .map(|v| v as usize)
        .map_err(store_err("count logs failed"))
    }

    /// All logs correlated with a trace, oldest first.
    pub fn logs_by_trace_id(&self, trace_id: &str) -> Result<Vec<LogRecord>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM logs WHERE trace_id = ? ORDER BY timestamp ASC, id ASC"
        );
        self.select_logs(&sql, vec![Value::Text(trace_id.to_string())])
    }

    fn select_logs(&self, sql: &str, args: Vec<Value>) -> Result<Vec<LogRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql).map_err(store_err("prepare query logs failed"))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(LogRecord {
                    id: row.get(0)?,
                    timestamp: naive_to_utc(row.get::<_, NaiveDateTime>(1)?),
                    trace_id: row.get(2)?,
                    span_id: row.get(3)?,
                    severity_text: row.get(4)?,
                    severity_number: row.get(5)?,
                    body: row.get(6)?,
                    service_name: row.get(7)?,
                    attributes: json_col(row, 8)?,
                    resource_attributes: json_col(row, 9)?,
                })
            })
            .map_err(store_err("query logs failed"))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err("read log row failed"))?);
        }
        Ok(out)
    }
}

fn log_conditions(filters: &LogFilters) -> Conditions {
    let mut cond = Conditions::new();
    cond.window("timestamp >= ?", "timestamp <= ?", &filters.window);
    cond.eq_text("service_name = ?", filters.service.as_deref());
    cond.eq_text("trace_id = ?", filters.trace_id.as_deref());
    if let Some(min) = filters.min_severity.filter(|s| *s > 0) {
        cond.push("severity_number >= ?", [Value::Int(min)]);
    }
    if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
        cond.push("contains(body, ?)", [Value::Text(search.to_string())]);
    }
    cond
}
