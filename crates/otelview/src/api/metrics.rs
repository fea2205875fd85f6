use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use otelview_core::filter::{DEFAULT_METRIC_LIMIT, MetricFilters, TimeWindow};
use otelview_core::query::{
    AggregationRequest, AggregationResponse, MetricNamesResponse, MetricsResponse,
};
use serde::Deserialize;

use super::{ApiError, ApiResult, AppState, non_empty, time_param, usize_or};

#[derive(Debug, Default, Deserialize)]
pub struct MetricParams {
    name: Option<String>,
    #[serde(rename = "type")]
    metric_type: Option<String>,
    service: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

impl MetricParams {
    fn into_filters(self) -> MetricFilters {
        MetricFilters {
            name: non_empty(&self.name),
            metric_type: non_empty(&self.metric_type),
            service: non_empty(&self.service),
            window: TimeWindow {
                since: time_param("start_time", &self.start_time),
                until: time_param("end_time", &self.end_time),
            },
            limit: usize_or(&self.limit, DEFAULT_METRIC_LIMIT),
            offset: usize_or(&self.offset, 0),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NameParams {
    service: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<MetricParams>,
) -> ApiResult<Json<MetricsResponse>> {
    let filters = params.into_filters();
    let metrics = state
        .store
        .query_metrics(&filters)
        .map_err(|e| ApiError::from_view_error("failed to retrieve metrics", e))?;
    let total = state
        .store
        .count_metrics(&filters)
        .map_err(|e| ApiError::from_view_error("failed to count metrics", e))?;
    Ok(Json(MetricsResponse {
        count: metrics.len(),
        metrics,
        total,
    }))
}

pub async fn names(
    State(state): State<AppState>,
    Query(params): Query<NameParams>,
) -> ApiResult<Json<MetricNamesResponse>> {
    let service = non_empty(&params.service);
    let names = state
        .store
        .metric_names(service.as_deref())
        .map_err(|e| ApiError::from_view_error("failed to retrieve metric names", e))?;
    Ok(Json(MetricNamesResponse {
        count: names.len(),
        names,
    }))
}

pub async fn aggregate(
    State(state): State<AppState>,
    body: Result<Json<AggregationRequest>, JsonRejection>,
) -> ApiResult<Json<AggregationResponse>> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))?;
    let results = state
        .store
        .aggregate_metrics(&req)
        .map_err(|e| ApiError::from_view_error("failed to aggregate metrics", e))?;
    Ok(Json(AggregationResponse {
        count: results.len(),
        results,
    }))
}
