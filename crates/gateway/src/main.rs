//! Gateway service entry point.

use anyhow::Result;
use feed::{FeedEngine, FeedExecutor};
use gateway::{create_router, AppState};
use ledger_backend::MemoryBackend;
use ledger_model::{FeeSettings, LedgerHeader};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("starting ledger feed gateway");

    let http_port: u16 = env::var("HTTP_PORT")
        .unwrap_or_else(|_| "8081".to_string())
        .parse()
        .expect("HTTP_PORT must be a number");
    let metrics_port: u16 = env::var("METRICS_PORT")
        .unwrap_or_else(|_| "9091".to_string())
        .parse()
        .expect("METRICS_PORT must be a number");
    let executor_mode = env::var("EXECUTOR").unwrap_or_else(|_| "pool".to_string());

    info!("configuration:");
    info!("  HTTP_PORT: {}", http_port);
    info!("  METRICS_PORT: {}", metrics_port);
    info!("  EXECUTOR: {}", executor_mode);

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], metrics_port))
        .install()
        .expect("failed to start Prometheus exporter");
    info!("prometheus exporter listening on port {}", metrics_port);

    // The replica starts from a genesis window; the applier extends it via
    // the ingest surface.
    let backend = Arc::new(MemoryBackend::new());
    backend.put_ledger(LedgerHeader {
        sequence: 1,
        hash: "0".repeat(64),
        close_time: 0,
    });
    backend.put_fee_settings(
        1,
        &FeeSettings { base_fee: 10, reserve_base: 10_000_000, reserve_inc: 2_000_000 },
    );

    let executor = match executor_mode.as_str() {
        "inline" => FeedExecutor::inline(),
        _ => FeedExecutor::pool(),
    };
    let engine = Arc::new(FeedEngine::new(backend.clone(), executor));

    let state = Arc::new(AppState { engine: engine.clone(), backend });
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = TcpListener::bind(addr).await?;
    info!("gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.shutdown();
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received terminate signal"),
    }
}
