//! KYC Ingestion Server
//!
//! Accepts KYC records over HTTP, encrypts their PII fields with the tenant's
//! KMS public key and writes them to DynamoDB.
//!
//! # Environment
//!
//! - `KYC_TABLE` (required): destination DynamoDB table
//! - `PORT`: listener port, default 8443
//! - `ENV_NAME`, `AWS_REGION`, `REQUEST_TIMEOUT_SECS`, `BODY_READ_TIMEOUT_SECS`,
//!   `MAX_BODY_BYTES`, `GRACEFUL_TIMEOUT_SECS`: see [`IngestConfig`]
//! - `RUST_LOG`: log filter, default `info`

use anyhow::Result;
use kyc_ingestion::aws::AwsClients;
use kyc_ingestion::config::IngestConfig;
use kyc_ingestion::http::{serve, AppState, RequestLimits};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting KYC ingestion server...");

    let config = IngestConfig::from_env()?;
    info!(
        env = %config.env_name,
        table = %config.kyc_table,
        port = config.port,
        "Configuration loaded"
    );

    let aws_clients = AwsClients::new(&config).await;
    let pipeline = aws_clients.pipeline(&config);
    let state = Arc::new(AppState::new(pipeline, RequestLimits::from(&config)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    serve(listener, state, shutdown_signal(), config.graceful_timeout).await?;

    info!("Stopped");
    Ok(())
}
