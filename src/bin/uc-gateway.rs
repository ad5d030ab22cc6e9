//! # Unity Catalog Permissions Gateway
//!
//! Serves list/grant/revoke endpoints in front of the Unity Catalog
//! permissions API.
//!
//! ## Configuration
//!
//! - `GATEWAY_PORT` (default 8000)
//! - `UC_SERVER_URL` (default `http://localhost:8080/api/2.1/unity-catalog`)
//! - `UC_TOKEN_FILE` (default `etc/conf/token.txt`)

use anyhow::{Context, Result};
use dbt_orchestrator::gateway::{self, GatewayConfig, GatewayState, UnityCatalogClient};
use dbt_orchestrator::observability::{self, metrics, DatadogConfig, LogFormat};
use dbt_orchestrator::server::ServerState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

const SERVICE_NAME: &str = "uc-gateway";

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();

    let otel_tracer_provider =
        observability::init_otel(SERVICE_NAME, DatadogConfig::from_env().as_ref())
            .context("Failed to initialize OpenTelemetry")?;
    observability::init_tracing(
        SERVICE_NAME,
        "dbt_orchestrator=info,uc_gateway=info,tower_http=info",
        LogFormat::from_env(),
        otel_tracer_provider.as_ref(),
    )?;

    metrics::register_metrics()?;

    let config = GatewayConfig::from_env()?;
    info!(
        "Unity Catalog at {}, admin token from {}",
        config.uc_server_url,
        config.token_file.display()
    );

    let client = UnityCatalogClient::new(&config.uc_server_url, config.token_file.clone())?;
    let state = GatewayState {
        grants: Arc::new(client),
    };
    let health = Arc::new(ServerState::default());
    let app = gateway::router(state, Arc::clone(&health));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Permissions gateway listening on {}", addr);
    health.mark_ready();

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    observability::shutdown_otel(otel_tracer_provider);
    Ok(())
}
