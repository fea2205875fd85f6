mod error;
mod logs;
mod metrics;
mod traces;

use axum::Router;
use axum::extract::State;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Json;
use chrono::{DateTime, Utc};
use otelview_core::query::{HealthResponse, ServicesResponse};
use otelview_core::time::parse_optional_rfc3339;
use otelview_store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

pub fn router(store: Store) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/services", get(services))
        .route("/api/traces", get(traces::list))
        .route("/api/traces/compare", post(traces::compare))
        .route("/api/traces/{id}", get(traces::get_one))
        .route("/api/logs", get(logs::list))
        .route("/api/logs/trace/{trace_id}", get(logs::by_trace))
        .route("/api/metrics", get(metrics::list))
        .route("/api/metrics/names", get(metrics::names))
        .route("/api/metrics/aggregate", post(metrics::aggregate))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(AppState { store })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().timestamp(),
    })
}

async fn services(State(state): State<AppState>) -> ApiResult<Json<ServicesResponse>> {
    let services = state
        .store
        .list_services()
        .map_err(|e| ApiError::from_view_error("failed to list services", e))?;
    Ok(Json(ServicesResponse {
        count: services.len(),
        services,
    }))
}

// Query-string helpers. Malformed values fall back instead of rejecting the request.

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}

/// Values that would not fit a SQL BIGINT count as malformed.
fn usize_or(value: &Option<String>, default: usize) -> usize {
    value
        .as_deref()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

fn time_param(name: &str, value: &Option<String>) -> Option<DateTime<Utc>> {
    parse_optional_rfc3339(name, value.as_deref())
}
