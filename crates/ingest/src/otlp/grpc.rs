use opentelemetry_proto::tonic::collector::logs::v1::logs_service_server::{
    LogsService, LogsServiceServer,
};
use opentelemetry_proto::tonic::collector::logs::v1::{
    ExportLogsServiceRequest, ExportLogsServiceResponse,
};
use opentelemetry_proto::tonic::collector::metrics::v1::metrics_service_server::{
    MetricsService, MetricsServiceServer,
};
use opentelemetry_proto::tonic::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use opentelemetry_proto::tonic::collector::trace::v1::trace_service_server::{
    TraceService, TraceServiceServer,
};
use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use otelview_core::error::ViewError;
use tonic::codec::CompressionEncoding;
use tonic::{Request, Response, Status};

use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct GrpcIngest {
    pipeline: Pipeline,
}

impl GrpcIngest {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn logs_service(&self) -> LogsServiceServer<Self> {
        LogsServiceServer::new(self.clone()).accept_compressed(CompressionEncoding::Gzip)
    }

    pub fn traces_service(&self) -> TraceServiceServer<Self> {
        TraceServiceServer::new(self.clone()).accept_compressed(CompressionEncoding::Gzip)
    }

    pub fn metrics_service(&self) -> MetricsServiceServer<Self> {
        MetricsServiceServer::new(self.clone()).accept_compressed(CompressionEncoding::Gzip)
    }
}

fn store_status(signal: &str, err: ViewError) -> Status {
    tracing::error!(signal, error = %err, "otlp grpc store failed");
    Status::internal(format!("failed to store {signal}: {err}"))
}

#[tonic::async_trait]
impl LogsService for GrpcIngest {
    async fn export(
        &self,
        request: Request<ExportLogsServiceRequest>,
    ) -> std::result::Result<Response<ExportLogsServiceResponse>, Status> {
        let count = self
            .pipeline
            .ingest_logs(request.into_inner())
            .await
            .map_err(|e| store_status("logs", e))?;
        tracing::debug!(count, "otlp grpc logs accepted");
        Ok(Response::new(ExportLogsServiceResponse::default()))
    }
}

#[tonic::async_trait]
impl TraceService for GrpcIngest {
    async fn export(
        &self,
        request: Request<ExportTraceServiceRequest>,
    ) -> std::result::Result<Response<ExportTraceServiceResponse>, Status> {
        let count = self
            .pipeline
            .ingest_traces(request.into_inner())
            .await
            .map_err(|e| store_status("traces", e))?;
        tracing::debug!(count, "otlp grpc traces accepted");
        Ok(Response::new(ExportTraceServiceResponse::default()))
    }
}

#[tonic::async_trait]
impl MetricsService for GrpcIngest {
    async fn export(
        &self,
        request: Request<ExportMetricsServiceRequest>,
    ) -> std::result::Result<Response<ExportMetricsServiceResponse>, Status> {
        let count = self
            .pipeline
            .ingest_metrics(request.into_inner())
            .await
            .map_err(|e| store_status("metrics", e))?;
        tracing::debug!(count, "otlp grpc metrics accepted");
        Ok(Response::new(ExportMetricsServiceResponse::default()))
    }
}
