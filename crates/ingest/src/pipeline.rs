use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use otelview_core::error::{Result, ViewError};
use otelview_store::Store;

use crate::transform::{transform_logs, transform_metrics, transform_traces};

/// Transform-then-persist path shared by the HTTP and gRPC receivers.
/// Each call writes straight through to the store; there is no buffering.
#[derive(Clone)]
pub struct Pipeline {
    store: Store,
}

impl Pipeline {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Returns the number of spans stored.
    pub async fn ingest_traces(&self, req: ExportTraceServiceRequest) -> Result<usize> {
        let store = self.store.clone();
        run_blocking(move || {
            let traces = transform_traces(&req);
            store.insert_traces(&traces)?;
            Ok(traces.iter().map(|t| t.spans.len()).sum())
        })
        .await
    }

    pub async fn ingest_logs(&self, req: ExportLogsServiceRequest) -> Result<usize> {
        let store = self.store.clone();
        run_blocking(move || {
            let logs = transform_logs(&req);
            store.insert_logs(&logs)?;
            Ok(logs.len())
        })
        .await
    }

    pub async fn ingest_metrics(&self, req: ExportMetricsServiceRequest) -> Result<usize> {
        let store = self.store.clone();
        run_blocking(move || {
            let points = transform_metrics(&req);
            store.insert_metrics(&points)?;
            Ok(points.len())
        })
        .await
    }
}

async fn run_blocking<F>(f: F) -> Result<usize>
where
    F: FnOnce() -> Result<usize> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ViewError::Internal(format!("ingest task join failed: {e}")))?
}
