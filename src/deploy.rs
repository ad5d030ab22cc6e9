//! # Deployment Submitter
//!
//! Submits the dbt job template as an incremental deployment and blocks until
//! the platform reports a terminal provisioning state.

use crate::constants::DEPLOYMENT_NAME_PREFIX;
use crate::error::{ArmErrorBody, DeploymentError, ErrorDetail};
use crate::observability::metrics;
use crate::params::ParameterSet;
use crate::provider::DeploymentApi;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Deployment mode
///
/// `Incremental` only touches resources declared in the template; it is the
/// only mode the job is submitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeploymentMode {
    Incremental,
}

/// Body of a deployment submission
#[derive(Debug, Serialize)]
pub struct DeploymentRequest {
    pub mode: DeploymentMode,
    pub template: serde_json::Value,
    pub parameters: ParameterSet,
}

impl DeploymentRequest {
    #[must_use]
    pub fn incremental(template: serde_json::Value, parameters: ParameterSet) -> Self {
        Self {
            mode: DeploymentMode::Incremental,
            template,
            parameters,
        }
    }
}

/// Provisioning state reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningState {
    Accepted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Other(String),
}

impl ProvisioningState {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "Accepted" => Self::Accepted,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Canceled" | "Cancelled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Accepted => "Accepted",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentState {
    pub provisioning_state: ProvisioningState,
    pub error: Option<ArmErrorBody>,
    /// Delay requested by the platform before the next poll
    pub retry_after: Option<Duration>,
}

/// ARM deployment name for a job instance
#[must_use]
pub fn deployment_name(job_instance_name: &str) -> String {
    format!("{DEPLOYMENT_NAME_PREFIX}-{job_instance_name}")
}

/// Drives a deployment from submission to a terminal state
pub struct Submitter<'a> {
    api: &'a dyn DeploymentApi,
    poll_interval: Duration,
    timeout: Duration,
}

impl fmt::Debug for Submitter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter")
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<'a> Submitter<'a> {
    #[must_use]
    pub fn new(api: &'a dyn DeploymentApi, poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            api,
            poll_interval,
            timeout,
        }
    }

    /// Submit the deployment
    ///
    /// # Errors
    /// Returns `DeploymentError::Transport` when the platform rejects the request.
    pub async fn submit(
        &self,
        resource_group: &str,
        name: &str,
        request: DeploymentRequest,
    ) -> Result<DeploymentState, DeploymentError> {
        info!("Submitting ARM deployment '{}'...", name);
        let state = self
            .api
            .begin_create_or_update(resource_group, name, &request)
            .await?;
        debug!("Deployment '{}' accepted with state {}", name, state.provisioning_state);
        Ok(state)
    }

    /// Block until the deployment reaches a terminal state
    ///
    /// # Errors
    /// Returns `DeploymentError::Failed` for any terminal state other than
    /// `Succeeded`, and `DeploymentError::TimedOut` when the wait exceeds the
    /// configured timeout.
    pub async fn wait(
        &self,
        resource_group: &str,
        name: &str,
        initial: DeploymentState,
    ) -> Result<DeploymentState, DeploymentError> {
        info!("Waiting for deployment '{}'...", name);
        let started = Instant::now();
        let mut state = initial;

        while !state.provisioning_state.is_terminal() {
            let remaining = self.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(DeploymentError::TimedOut {
                    name: name.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            // Retry-After never extends the wait past the timeout
            let delay = state.retry_after.unwrap_or(self.poll_interval).min(remaining);
            tokio::time::sleep(delay).await;
            metrics::increment_deployment_polls();
            state = self.api.get_state(resource_group, name).await?;
            debug!("Deployment '{}' is {}", name, state.provisioning_state);
        }

        info!("Deployment completed with state: {}", state.provisioning_state);
        if state.provisioning_state == ProvisioningState::Succeeded {
            Ok(state)
        } else {
            let detail = match state.error {
                Some(error) => ErrorDetail::Available(error),
                None => ErrorDetail::Unavailable("platform reported no error detail".to_string()),
            };
            Err(DeploymentError::Failed {
                name: name.to_string(),
                state: state.provisioning_state.to_string(),
                detail,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedApi {
        polls: Mutex<VecDeque<DeploymentState>>,
    }

    fn state(provisioning_state: ProvisioningState) -> DeploymentState {
        DeploymentState {
            provisioning_state,
            error: None,
            retry_after: None,
        }
    }

    #[async_trait]
    impl DeploymentApi for ScriptedApi {
        async fn begin_create_or_update(
            &self,
            _resource_group: &str,
            _deployment_name: &str,
            _request: &DeploymentRequest,
        ) -> Result<DeploymentState, DeploymentError> {
            Ok(state(ProvisioningState::Accepted))
        }

        async fn get_state(
            &self,
            _resource_group: &str,
            _deployment_name: &str,
        ) -> Result<DeploymentState, DeploymentError> {
            Ok(self
                .polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| state(ProvisioningState::Running)))
        }
    }

    #[test]
    fn test_deployment_name() {
        assert_eq!(
            deployment_name("dbt-job-1700000000"),
            "dbt-job-deploy-dbt-job-1700000000"
        );
    }

    #[test]
    fn test_provisioning_state_parse() {
        assert_eq!(ProvisioningState::parse("Succeeded"), ProvisioningState::Succeeded);
        assert!(ProvisioningState::parse("Canceled").is_terminal());
        assert!(!ProvisioningState::parse("Running").is_terminal());
        assert_eq!(
            ProvisioningState::parse("Deleting"),
            ProvisioningState::Other("Deleting".to_string())
        );
    }

    #[tokio::test]
    async fn test_wait_until_succeeded() {
        let api = ScriptedApi {
            polls: Mutex::new(VecDeque::from([
                state(ProvisioningState::Running),
                state(ProvisioningState::Succeeded),
            ])),
        };
        let submitter = Submitter::new(&api, Duration::ZERO, Duration::from_secs(60));
        let final_state = submitter
            .wait("rg", "d", state(ProvisioningState::Accepted))
            .await
            .expect("deployment should succeed");
        assert_eq!(final_state.provisioning_state, ProvisioningState::Succeeded);
        assert!(api.polls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wait_reports_platform_error() {
        let failed = DeploymentState {
            provisioning_state: ProvisioningState::Failed,
            error: Some(ArmErrorBody {
                code: Some("DeploymentFailed".into()),
                message: Some("Container group quota exceeded".into()),
                details: vec![],
            }),
            retry_after: None,
        };
        let api = ScriptedApi {
            polls: Mutex::new(VecDeque::from([failed])),
        };
        let submitter = Submitter::new(&api, Duration::ZERO, Duration::from_secs(60));
        let err = submitter
            .wait("rg", "d", state(ProvisioningState::Running))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Failed"), "{message}");
        assert!(message.contains("Container group quota exceeded"), "{message}");
    }

    #[tokio::test]
    async fn test_wait_skips_polling_when_already_terminal() {
        let api = ScriptedApi {
            polls: Mutex::new(VecDeque::new()),
        };
        let submitter = Submitter::new(&api, Duration::ZERO, Duration::from_secs(60));
        let err = submitter
            .wait("rg", "d", state(ProvisioningState::Canceled))
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::Failed { state, .. } if state == "Canceled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let api = ScriptedApi {
            polls: Mutex::new(VecDeque::new()),
        };
        let submitter =
            Submitter::new(&api, Duration::from_secs(10), Duration::from_secs(30));
        let err = submitter
            .wait("rg", "d", state(ProvisioningState::Running))
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::TimedOut { .. }));
    }

    fn running_with_retry_after(secs: u64) -> DeploymentState {
        DeploymentState {
            retry_after: Some(Duration::from_secs(secs)),
            ..state(ProvisioningState::Running)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_uses_retry_after_instead_of_poll_interval() {
        let api = ScriptedApi {
            polls: Mutex::new(VecDeque::from([
                running_with_retry_after(5),
                state(ProvisioningState::Succeeded),
            ])),
        };
        let submitter = Submitter::new(&api, Duration::from_secs(60), Duration::from_secs(600));
        let started = Instant::now();
        let final_state = submitter
            .wait("rg", "d", running_with_retry_after(5))
            .await
            .expect("deployment should succeed");
        assert_eq!(final_state.provisioning_state, ProvisioningState::Succeeded);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_does_not_extend_timeout() {
        let api = ScriptedApi {
            polls: Mutex::new(VecDeque::from([
                running_with_retry_after(7200),
                running_with_retry_after(7200),
            ])),
        };
        let submitter = Submitter::new(&api, Duration::from_secs(10), Duration::from_secs(60));
        let started = Instant::now();
        let err = submitter
            .wait("rg", "d", running_with_retry_after(7200))
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::TimedOut { waited_secs: 60, .. }));
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }
}
