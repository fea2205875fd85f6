use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::Row;
use duckdb::types::{Type, Value};
use otelview_core::error::{Result, ViewError};
use otelview_core::filter::TimeWindow;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Incrementally built `WHERE` clause with positional arguments.
#[derive(Default)]
pub(crate) struct Conditions {
    parts: Vec<&'static str>,
    args: Vec<Value>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: &'static str, args: impl IntoIterator<Item = Value>) {
        self.parts.push(clause);
        self.args.extend(args);
    }

    pub fn eq_text(&mut self, clause: &'static str, value: Option<&str>) {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.push(clause, [Value::Text(v.to_string())]);
        }
    }

    pub fn window(&mut self, column_ge: &'static str, column_le: &'static str, window: &TimeWindow) {
        if let Some(since) = window.since {
            self.push(column_ge, [Value::Text(sql_ts(since))]);
        }
        if let Some(until) = window.until {
            self.push(column_le, [Value::Text(sql_ts(until))]);
        }
    }

    pub fn where_sql(&self) -> String {
        if self.parts.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.parts.join(" AND "))
        }
    }

    pub fn args(&self) -> Vec<Value> {
        self.args.clone()
    }

    pub fn paged_args(&self, limit: usize, offset: usize) -> Vec<Value> {
        let mut args = self.args.clone();
        args.push(Value::BigInt(page_bound(limit)));
        args.push(Value::BigInt(page_bound(offset)));
        args
    }
}

/// DuckDB rejects LIMIT/OFFSET values above 2^62.
const MAX_PAGE_BOUND: i64 = 1 << 62;

fn page_bound(value: usize) -> i64 {
    i64::try_from(value).map_or(MAX_PAGE_BOUND, |v| v.min(MAX_PAGE_BOUND))
}

/// Timestamp literal in UTC with microsecond precision, matching the TIMESTAMP column type.
pub(crate) fn sql_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

pub(crate) fn naive_to_utc(ts: NaiveDateTime) -> DateTime<Utc> {
    ts.and_utc()
}

pub(crate) fn json_param<T: Serialize>(value: Option<&T>) -> Result<Option<String>> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| ViewError::Store(format!("failed to encode json column: {e}")))
}

pub(crate) fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> duckdb::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    match raw.as_deref() {
        None | Some("") | Some("null") => Ok(None),
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

pub(crate) fn store_err(context: &'static str) -> impl Fn(duckdb::Error) -> ViewError {
    move |e| ViewError::Store(format!("{context}: {e}"))
}
