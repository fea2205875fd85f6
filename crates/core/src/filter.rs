use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};

pub const DEFAULT_TRACE_LIMIT: usize = 100;
pub const DEFAULT_LOG_LIMIT: usize = 100;
pub const DEFAULT_METRIC_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Trace = 1,
    Debug = 5,
    Info = 9,
    Warn = 13,
    Error = 17,
    Fatal = 21,
}

impl Severity {
    pub fn number(self) -> i32 {
        self as i32
    }

    /// Level bucket for an OTLP severity number (1..=24); zero and out-of-range values have none.
    pub fn from_number(n: i32) -> Option<Self> {
        match n {
            1..=4 => Some(Self::Trace),
            5..=8 => Some(Self::Debug),
            9..=12 => Some(Self::Info),
            13..=16 => Some(Self::Warn),
            17..=20 => Some(Self::Error),
            21..=24 => Some(Self::Fatal),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl FromStr for Severity {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "FATAL" => Ok(Self::Fatal),
            _ => Err(ViewError::Parse(format!("unknown severity: {s}"))),
        }
    }
}

/// Minimum severity number from a query value: either the number itself or a level name.
pub fn parse_min_severity(input: &str) -> Option<i32> {
    let input = input.trim();
    if let Ok(n) = input.parse::<i32>() {
        return (n > 0).then_some(n);
    }
    Severity::from_str(input).ok().map(Severity::number)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimeWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn all() -> Self {
        Self {
            since: None,
            until: None,
        }
    }

    pub fn between(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            until: Some(until),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceFilters {
    pub service: Option<String>,
    pub min_duration_ms: Option<i64>,
    pub max_duration_ms: Option<i64>,
    pub errors_only: bool,
    pub search: Option<String>,
    pub window: TimeWindow,
    pub limit: usize,
    pub offset: usize,
}

impl Default for TraceFilters {
    fn default() -> Self {
        Self {
            service: None,
            min_duration_ms: None,
            max_duration_ms: None,
            errors_only: false,
            search: None,
            window: TimeWindow::all(),
            limit: DEFAULT_TRACE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogFilters {
    pub service: Option<String>,
    pub trace_id: Option<String>,
    pub min_severity: Option<i32>,
    pub search: Option<String>,
    pub window: TimeWindow,
    pub limit: usize,
    pub offset: usize,
}

impl Default for LogFilters {
    fn default() -> Self {
        Self {
            service: None,
            trace_id: None,
            min_severity: None,
            search: None,
            window: TimeWindow::all(),
            limit: DEFAULT_LOG_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricFilters {
    pub name: Option<String>,
    /// Stored type name (`gauge`, `sum`, ...), matched exactly.
    pub metric_type: Option<String>,
    pub service: Option<String>,
    pub window: TimeWindow,
    pub limit: usize,
    pub offset: usize,
}

impl Default for MetricFilters {
    fn default() -> Self {
        Self {
            name: None,
            metric_type: None,
            service: None,
            window: TimeWindow::all(),
            limit: DEFAULT_METRIC_LIMIT,
            offset: 0,
        }
    }
}
