use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use otelview_core::ViewError;
use otelview_core::filter::{DEFAULT_TRACE_LIMIT, TimeWindow, TraceFilters};
use otelview_core::model::Trace;
use otelview_core::query::{
    CompareRequest, CompareResponse, MAX_COMPARE_TRACES, MIN_COMPARE_TRACES, TraceComparison,
    TracesResponse,
};
use serde::Deserialize;

use super::{ApiError, ApiResult, AppState, non_empty, time_param, usize_or};

#[derive(Debug, Default, Deserialize)]
pub struct TraceParams {
    service: Option<String>,
    errors: Option<String>,
    min_duration: Option<String>,
    max_duration: Option<String>,
    search: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

impl TraceParams {
    fn into_filters(self) -> TraceFilters {
        TraceFilters {
            service: non_empty(&self.service),
            min_duration_ms: millis(&self.min_duration),
            max_duration_ms: millis(&self.max_duration),
            errors_only: self.errors.as_deref() == Some("true"),
            search: non_empty(&self.search),
            window: TimeWindow {
                since: time_param("start_time", &self.start_time),
                until: time_param("end_time", &self.end_time),
            },
            limit: usize_or(&self.limit, DEFAULT_TRACE_LIMIT),
            offset: usize_or(&self.offset, 0),
        }
    }
}

fn millis(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(|v| v.trim().parse().ok())
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<TraceParams>,
) -> ApiResult<Json<TracesResponse>> {
    let filters = params.into_filters();
    let traces = state
        .store
        .query_traces(&filters)
        .map_err(|e| ApiError::from_view_error("failed to retrieve traces", e))?;
    Ok(Json(TracesResponse {
        count: traces.len(),
        traces,
    }))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Trace>> {
    lookup(&state, &id).map(Json)
}

pub async fn compare(
    State(state): State<AppState>,
    body: Result<Json<CompareRequest>, JsonRejection>,
) -> ApiResult<Json<CompareResponse>> {
    let Json(req) = body.map_err(|e| {
        ApiError::bad_request(format!(
            "invalid request body, expected {MIN_COMPARE_TRACES}-{MAX_COMPARE_TRACES} trace_ids: {e}"
        ))
    })?;
    if !(MIN_COMPARE_TRACES..=MAX_COMPARE_TRACES).contains(&req.trace_ids.len()) {
        return Err(ApiError::bad_request(format!(
            "must provide between {MIN_COMPARE_TRACES} and {MAX_COMPARE_TRACES} trace_ids"
        )));
    }

    let mut traces = Vec::with_capacity(req.trace_ids.len());
    for id in &req.trace_ids {
        traces.push(lookup(&state, id)?);
    }
    let comparison = TraceComparison::from_traces(&traces)
        .ok_or_else(|| ApiError::bad_request("no traces to compare"))?;

    Ok(Json(CompareResponse { traces, comparison }))
}

fn lookup(state: &AppState, id: &str) -> ApiResult<Trace> {
    state.store.get_trace(id).map_err(|e| match e {
        ViewError::NotFound(_) => ApiError::trace_not_found(id),
        other => ApiError::from_view_error("failed to retrieve trace", other),
    })
}
