use std::net::SocketAddr;

use otelview_core::error::{Result, ViewError};
use tokio::sync::watch;
use tonic::transport::Server;

use crate::otlp::grpc::GrpcIngest;
use crate::otlp::http;
use crate::pipeline::Pipeline;

/// Runs the OTLP gRPC and HTTP receivers until `shutdown` flips to `true` (or its sender is
/// dropped). A listener that fails is logged and does not stop the other one.
pub async fn run_ingest_servers(
    store: otelview_store::Store,
    grpc_addr: SocketAddr,
    http_addr: SocketAddr,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let pipeline = Pipeline::new(store);
    let grpc = GrpcIngest::new(pipeline.clone());
    let http_router = http::router(pipeline);

    let grpc_shutdown = shutdown.clone();
    let grpc_task = tokio::spawn(async move {
        tracing::info!(addr = %grpc_addr, "otlp grpc receiver listening");
        Server::builder()
            .add_service(grpc.logs_service())
            .add_service(grpc.traces_service())
            .add_service(grpc.metrics_service())
            .serve_with_shutdown(grpc_addr, wait_for_shutdown(grpc_shutdown))
            .await
            .map_err(|e| ViewError::Ingest(format!("gRPC server failed: {e}")))
    });

    let http_task = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(http_addr)
            .await
            .map_err(|e| ViewError::Io(format!("failed to bind otlp http {http_addr}: {e}")))?;
        tracing::info!(addr = %http_addr, "otlp http receiver listening");
        axum::serve(listener, http_router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await
            .map_err(|e| ViewError::Ingest(format!("HTTP server failed: {e}")))
    });

    let (grpc_res, http_res) = tokio::join!(grpc_task, http_task);
    let grpc_res = flatten("gRPC", grpc_res);
    let http_res = flatten("HTTP", http_res);
    grpc_res.and(http_res)
}

fn flatten(
    name: &str,
    res: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    let res = res
        .map_err(|e| ViewError::Ingest(format!("{name} task join failed: {e}")))
        .and_then(|inner| inner);
    if let Err(e) = &res {
        tracing::error!(receiver = name, error = %e, "otlp receiver stopped with error");
    }
    res
}

/// Resolves once the flag is set or the sender goes away.
pub async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
