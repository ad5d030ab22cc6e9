//! # Orchestrator Run
//!
//! One end-to-end run of the dbt job orchestrator:
//!
//! ```text
//! CONFIGURING → AUTHENTICATING → DISCOVERING → BUILDING_PARAMS → SUBMITTING → POLLING → {SUCCEEDED | FAILED}
//! ```
//!
//! Nothing is retried. The first failure ends the run; it is logged with the
//! phase it happened in and returned to the caller.

use crate::config::JobConfig;
use crate::deploy::{deployment_name, DeploymentRequest, ProvisioningState, Submitter};
use crate::discovery::discover_uc_fqdn;
use crate::error::{RunError, RunPhase};
use crate::observability::metrics;
use crate::params::build_parameters;
use crate::provider::PlatformConnector;
use crate::secrets::resolve_run_secrets;
use crate::template::{resolve_path, DeploymentTemplate};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, Instrument};

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub job_instance_name: String,
    pub deployment_name: String,
    pub final_state: ProvisioningState,
    pub duration: Duration,
}

/// Load configuration through `lookup` and run
///
/// Configuration is validated before the connector is touched, so a missing
/// variable never results in a credential or network call.
///
/// # Errors
/// Returns the `RunError` that ended the run.
pub async fn run_with_lookup<F>(
    connector: &dyn PlatformConnector,
    lookup: F,
) -> Result<RunOutcome, RunError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match JobConfig::from_lookup(lookup) {
        Ok(config) => config,
        Err(e) => {
            let err = RunError::from(e);
            error!(phase = %err.phase(), "Configuration error: {}", err);
            metrics::increment_runs();
            metrics::increment_run_failures(err.phase().as_str());
            return Err(err);
        }
    };
    run(connector, &config).await
}

/// Execute one run with a validated configuration
///
/// # Errors
/// Returns the `RunError` that ended the run.
pub async fn run(
    connector: &dyn PlatformConnector,
    config: &JobConfig,
) -> Result<RunOutcome, RunError> {
    let span = info_span!(
        "orchestrator.run",
        resource_group = %config.resource_group,
        uc_aci_name = %config.uc_aci_name,
    );
    let start = Instant::now();
    metrics::increment_runs();

    let result = execute(connector, config, start).instrument(span).await;
    metrics::observe_run_duration(start.elapsed().as_secs_f64());

    match &result {
        Ok(outcome) => {
            info!(
                phase = %RunPhase::Succeeded,
                "Deployment '{}' completed in {:.1}s",
                outcome.deployment_name,
                outcome.duration.as_secs_f64()
            );
        }
        Err(err) => {
            let phase = err.phase();
            error!(phase = %phase, "An error occurred during {}: {}", phase, err);
            metrics::increment_run_failures(phase.as_str());
        }
    }
    result
}

async fn execute(
    connector: &dyn PlatformConnector,
    config: &JobConfig,
    start: Instant,
) -> Result<RunOutcome, RunError> {
    info!(phase = %RunPhase::Authenticating, "Resolving credential and platform clients");
    let clients = connector.connect(config).await?;
    let secrets = resolve_run_secrets(clients.secrets.as_ref(), config).await?;

    info!(phase = %RunPhase::Discovering, "Discovering Unity Catalog service");
    let uc_fqdn = discover_uc_fqdn(
        clients.locator.as_ref(),
        &config.resource_group,
        &config.uc_aci_name,
    )
    .await?;

    info!(phase = %RunPhase::BuildingParams, "Building deployment parameters");
    let template = DeploymentTemplate::load(&resolve_path(config)?)?;
    let built = build_parameters(config, &uc_fqdn, &secrets, Utc::now());
    template.validate_parameters(&built.parameters)?;
    let name = deployment_name(&built.job_instance_name);

    info!(phase = %RunPhase::Submitting, "Deployment name: {}", name);
    let submitter = Submitter::new(
        clients.deployments.as_ref(),
        config.poll_interval,
        config.deployment_timeout,
    );
    let request = DeploymentRequest::incremental(template.into_document(), built.parameters);
    let initial = submitter
        .submit(&config.resource_group, &name, request)
        .await?;

    info!(phase = %RunPhase::Polling, "Polling deployment '{}'", name);
    let final_state = submitter
        .wait(&config.resource_group, &name, initial)
        .await?;

    Ok(RunOutcome {
        job_instance_name: built.job_instance_name,
        deployment_name: name,
        final_state: final_state.provisioning_state,
        duration: start.elapsed(),
    })
}
