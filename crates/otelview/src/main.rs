mod api;
mod telemetry;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use otelview_core::config::{Config, ConfigOverrides};
use otelview_store::Store;
use tokio::sync::{oneshot, watch};

use crate::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "otelview", version)]
#[command(about = "Local OpenTelemetry receiver with an in-memory query API")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    api_addr: Option<String>,

    #[arg(long)]
    otlp_grpc_addr: Option<String>,

    #[arg(long)]
    otlp_http_addr: Option<String>,

    /// How long the query API may drain on shutdown, e.g. `10s`.
    #[arg(long)]
    shutdown_grace: Option<String>,

    #[arg(long)]
    debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_addr: self.api_addr.clone(),
            otlp_grpc_addr: self.otlp_grpc_addr.clone(),
            otlp_http_addr: self.otlp_http_addr.clone(),
            shutdown_grace: self.shutdown_grace.clone(),
            debug: self.debug.then_some(true),
            log_json: self.log_json.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load(cli.config.as_deref()).context("load config")?;
    cfg.apply(cli.overrides(), "command line")
        .context("apply command line flags")?;
    init_tracing(cfg.debug, cfg.log_json);

    run(cfg).await
}

async fn run(cfg: Config) -> anyhow::Result<()> {
    let store = Store::open_in_memory().context("open in-memory store")?;

    tracing::info!(
        api = %cfg.api_addr,
        otlp_grpc = %cfg.otlp_grpc_addr,
        otlp_http = %cfg.otlp_http_addr,
        "starting otelview"
    );

    let (ingest_tx, ingest_rx) = watch::channel(false);
    let ingest_task = tokio::spawn(otelview_ingest::run_ingest_servers(
        store.clone(),
        cfg.otlp_grpc_addr,
        cfg.otlp_http_addr,
        ingest_rx,
    ));

    let listener = tokio::net::TcpListener::bind(cfg.api_addr)
        .await
        .with_context(|| format!("bind query api {}", cfg.api_addr))?;
    tracing::info!(addr = %cfg.api_addr, "query api listening");

    let (api_stop_tx, api_stop_rx) = oneshot::channel::<()>();
    let mut api_task = tokio::spawn(async move {
        axum::serve(listener, api::router(store))
            .with_graceful_shutdown(async move {
                let _ = api_stop_rx.await;
            })
            .await
    });

    let api_failure = tokio::select! {
        res = &mut api_task => Some(match res {
            Ok(Ok(())) => anyhow::anyhow!("query api stopped unexpectedly"),
            Ok(Err(e)) => anyhow::Error::new(e).context("query api failed"),
            Err(e) => anyhow::Error::new(e).context("query api task panicked"),
        }),
        _ = shutdown_signal() => None,
    };

    if api_failure.is_none() {
        tracing::info!(grace = ?cfg.shutdown_grace, "shutting down query api");
        let _ = api_stop_tx.send(());
        match tokio::time::timeout(cfg.shutdown_grace, &mut api_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::error!(error = %e, "query api shutdown failed"),
            Ok(Err(e)) => tracing::error!(error = %e, "query api task panicked"),
            Err(_) => {
                tracing::warn!("query api did not drain in time, aborting");
                api_task.abort();
            }
        }
    }

    tracing::info!("stopping otlp receivers");
    let _ = ingest_tx.send(true);
    match ingest_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "otlp receivers stopped with error"),
        Err(e) => tracing::error!(error = %e, "otlp receiver task panicked"),
    }

    if let Some(err) = api_failure {
        return Err(err);
    }
    tracing::info!("otelview stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "otelview",
            "--api-addr",
            "127.0.0.1:9000",
            "--otlp-grpc-addr",
            "127.0.0.1:14317",
            "--shutdown-grace",
            "3s",
            "--debug",
        ])
        .unwrap();

        let mut cfg = Config::default();
        cfg.apply(cli.overrides(), "command line").unwrap();
        assert_eq!(cfg.api_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.otlp_grpc_addr, "127.0.0.1:14317".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.otlp_http_addr, Config::default().otlp_http_addr);
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(3));
        assert!(cfg.debug);
        assert!(!cfg.log_json);
    }

    #[test]
    fn absent_switches_keep_config_values() {
        let cli = Cli::try_parse_from(["otelview"]).unwrap();
        let mut cfg = Config {
            log_json: true,
            ..Config::default()
        };
        cfg.apply(cli.overrides(), "command line").unwrap();
        assert!(cfg.log_json);
    }

    #[test]
    fn bad_address_names_the_source() {
        let cli = Cli::try_parse_from(["otelview", "--api-addr", "nowhere"]).unwrap();
        let err = Config::default()
            .apply(cli.overrides(), "command line")
            .unwrap_err();
        assert!(err.to_string().contains("command line"));
    }
}
