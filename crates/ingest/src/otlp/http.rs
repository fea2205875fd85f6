use std::io::Read;

use axum::extract::State;
use axum::http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Router, body::Bytes};
use flate2::read::GzDecoder;
use opentelemetry_proto::tonic::collector::logs::v1::{
    ExportLogsServiceRequest, ExportLogsServiceResponse,
};
use opentelemetry_proto::tonic::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use prost::Message;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::pipeline::Pipeline;

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

pub fn router(pipeline: Pipeline) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    Router::new()
        .route("/v1/logs", post(export_logs))
        .route("/v1/traces", post(export_traces))
        .route("/v1/metrics", post(export_metrics))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(pipeline)
}

async fn export_traces(
    State(pipeline): State<Pipeline>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(req) = decode_body::<ExportTraceServiceRequest>(&headers, body, "traces") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match pipeline.ingest_traces(req).await {
        Ok(count) => {
            tracing::debug!(count, "otlp http traces accepted");
            protobuf_response(ExportTraceServiceResponse::default())
        }
        Err(e) => {
            tracing::error!(error = %e, "otlp http traces store failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn export_logs(
    State(pipeline): State<Pipeline>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(req) = decode_body::<ExportLogsServiceRequest>(&headers, body, "logs") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match pipeline.ingest_logs(req).await {
        Ok(count) => {
            tracing::debug!(count, "otlp http logs accepted");
            protobuf_response(ExportLogsServiceResponse::default())
        }
        Err(e) => {
            tracing::error!(error = %e, "otlp http logs store failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn export_metrics(
    State(pipeline): State<Pipeline>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(req) = decode_body::<ExportMetricsServiceRequest>(&headers, body, "metrics") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match pipeline.ingest_metrics(req).await {
        Ok(count) => {
            tracing::debug!(count, "otlp http metrics accepted");
            protobuf_response(ExportMetricsServiceResponse::default())
        }
        Err(e) => {
            tracing::error!(error = %e, "otlp http metrics store failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn decode_body<M: Message + Default>(headers: &HeaderMap, body: Bytes, signal: &str) -> Option<M> {
    let gzip = headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));

    let decoded = if gzip {
        let mut raw = Vec::new();
        if let Err(e) = GzDecoder::new(body.as_ref()).read_to_end(&mut raw) {
            tracing::warn!(signal, error = %e, "otlp http gzip body decode failed");
            return None;
        }
        M::decode(raw.as_slice())
    } else {
        M::decode(body)
    };

    match decoded {
        Ok(req) => Some(req),
        Err(e) => {
            tracing::warn!(signal, error = %e, "otlp http decode failed");
            None
        }
    }
}

fn protobuf_response<M: Message>(msg: M) -> Response {
    ([(CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)], msg.encode_to_vec()).into_response()
}
