use axum::Json;
use axum::extract::{Path, Query, State};
use otelview_core::filter::{DEFAULT_LOG_LIMIT, LogFilters, TimeWindow, parse_min_severity};
use otelview_core::query::{LogsResponse, TraceLogsResponse};
use serde::Deserialize;

use super::{ApiError, ApiResult, AppState, non_empty, time_param, usize_or};

#[derive(Debug, Default, Deserialize)]
pub struct LogParams {
    service: Option<String>,
    trace_id: Option<String>,
    search: Option<String>,
    severity: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

impl LogParams {
    fn into_filters(self) -> LogFilters {
        LogFilters {
            service: non_empty(&self.service),
            trace_id: non_empty(&self.trace_id),
            min_severity: self.severity.as_deref().and_then(parse_min_severity),
            search: non_empty(&self.search),
            window: TimeWindow {
                since: time_param("start_time", &self.start_time),
                until: time_param("end_time", &self.end_time),
            },
            limit: usize_or(&self.limit, DEFAULT_LOG_LIMIT),
            offset: usize_or(&self.offset, 0),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<LogParams>,
) -> ApiResult<Json<LogsResponse>> {
    let filters = params.into_filters();
    let logs = state
        .store
        .query_logs(&filters)
        .map_err(|e| ApiError::from_view_error("failed to retrieve logs", e))?;
    let total = state
        .store
        .count_logs(&filters)
        .map_err(|e| ApiError::from_view_error("failed to count logs", e))?;
    Ok(Json(LogsResponse {
        count: logs.len(),
        logs,
        total,
    }))
}

pub async fn by_trace(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
) -> ApiResult<Json<TraceLogsResponse>> {
    let logs = state
        .store
        .logs_by_trace_id(&trace_id)
        .map_err(|e| ApiError::from_view_error("failed to retrieve logs for trace", e))?;
    Ok(Json(TraceLogsResponse {
        count: logs.len(),
        logs,
    }))
}
