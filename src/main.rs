//! # dbt Orchestrator
//!
//! Deploys the daily dbt job as an Azure Container Instances container group.
//!
//! ## Overview
//!
//! Each run:
//!
//! 1. **Resolves the managed identity** - user-assigned when `AZURE_CLIENT_ID` is set
//! 2. **Reads secrets** - storage account key and Unity Catalog admin token from Key Vault
//! 3. **Discovers Unity Catalog** - public FQDN of the running UC container group
//! 4. **Builds parameters** - job name, storage path, UC URL, sizing, secrets
//! 5. **Deploys the ARM template** - Incremental mode, waiting for a terminal state
//!
//! ## Usage
//!
//! ```bash
//! # One run, exit code reflects the outcome
//! dbt-orchestrator run
//!
//! # Daily timer at 07:00 UTC with metrics and health checks on port 5000
//! dbt-orchestrator schedule
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dbt_orchestrator::constants::{
    DEFAULT_METRICS_PORT, DEFAULT_SCHEDULE_HOUR_UTC, DEFAULT_SCHEDULE_MINUTE_UTC,
};
use dbt_orchestrator::observability::{self, metrics, DatadogConfig, LogFormat};
use dbt_orchestrator::provider::azure::AzureConnector;
use dbt_orchestrator::schedule::{run_schedule, DailySchedule};
use dbt_orchestrator::server::{start_server, ServerState};
use dbt_orchestrator::{run_with_lookup, BUILD_DATETIME, BUILD_GIT_HASH};
use std::sync::Arc;
use tracing::{error, info};

const SERVICE_NAME: &str = "dbt-orchestrator";

/// Scheduled dbt job deployer
#[derive(Parser)]
#[command(name = "dbt-orchestrator", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single run and exit
    Run,
    /// Run daily on a fixed UTC schedule
    Schedule {
        /// Hour of day (UTC)
        #[arg(long, default_value_t = DEFAULT_SCHEDULE_HOUR_UTC)]
        hour: u32,
        /// Minute of the hour (UTC)
        #[arg(long, default_value_t = DEFAULT_SCHEDULE_MINUTE_UTC)]
        minute: u32,
        /// Also run once immediately at startup
        #[arg(long)]
        run_on_startup: bool,
        /// Port for /metrics, /healthz and /readyz
        #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
        metrics_port: u16,
    },
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider before any TLS client is created
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Local development: pick up settings from .env when present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let otel_tracer_provider =
        observability::init_otel(SERVICE_NAME, DatadogConfig::from_env().as_ref())
            .context("Failed to initialize OpenTelemetry")?;
    observability::init_tracing(
        SERVICE_NAME,
        "dbt_orchestrator=info",
        LogFormat::from_env(),
        otel_tracer_provider.as_ref(),
    )?;

    info!(
        "Starting dbt orchestrator {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        BUILD_GIT_HASH,
        BUILD_DATETIME
    );

    metrics::register_metrics()?;

    let result = match cli.command {
        Commands::Run => run_once().await,
        Commands::Schedule {
            hour,
            minute,
            run_on_startup,
            metrics_port,
        } => run_scheduled(hour, minute, run_on_startup, metrics_port).await,
    };

    observability::shutdown_otel(otel_tracer_provider);
    result
}

async fn run_once() -> Result<()> {
    let outcome = run_with_lookup(&AzureConnector::new(), env_lookup)
        .await
        .context("dbt job run failed")?;
    info!(
        "Successfully triggered dbt job deployment '{}' ({})",
        outcome.deployment_name, outcome.final_state
    );
    Ok(())
}

async fn run_scheduled(
    hour: u32,
    minute: u32,
    run_on_startup: bool,
    metrics_port: u16,
) -> Result<()> {
    let schedule = DailySchedule::at(hour, minute)
        .with_context(|| format!("Invalid schedule time {hour:02}:{minute:02}"))?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(metrics_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    server_state.mark_ready();

    let connector = AzureConnector::new();
    let invocations = run_schedule(
        schedule,
        run_on_startup,
        |_timer| async move {
            match run_with_lookup(&connector, env_lookup).await {
                Ok(outcome) => info!(
                    "Successfully triggered dbt job deployment '{}'",
                    outcome.deployment_name
                ),
                Err(e) => error!("Scheduled run failed in {}: {}", e.phase(), e),
            }
        },
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
    )
    .await;

    info!("Timer stopped after {} invocations", invocations);
    Ok(())
}
