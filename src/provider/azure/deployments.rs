//! # ARM Template Deployments
//!
//! Submits resource-group deployments and reads their provisioning state via
//! `Microsoft.Resources/deployments`.
//!
//! A non-2xx response on submission is turned into `DeploymentError::Transport`
//! with whatever structured error the response body carries. If the body has
//! no usable ARM error the detail is marked unavailable.

use super::arm::{retry_after, ArmClient, ArmRequestError};
use crate::constants::DEPLOYMENTS_API_VERSION;
use crate::deploy::{DeploymentRequest, DeploymentState, ProvisioningState};
use crate::error::{ArmErrorBody, DeploymentError, ErrorDetail};
use crate::observability::metrics;
use crate::provider::DeploymentApi;
use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info_span, Instrument};

#[derive(Serialize)]
struct DeploymentBody<'a> {
    properties: &'a DeploymentRequest,
}

#[derive(Debug, Deserialize)]
struct DeploymentResource {
    #[serde(default)]
    properties: Option<DeploymentProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
    #[serde(default)]
    error: Option<ArmErrorBody>,
}

/// ARM deployments client
#[derive(Debug, Clone)]
pub struct ArmDeployments {
    arm: ArmClient,
}

impl ArmDeployments {
    #[must_use]
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    fn deployment_url(&self, resource_group: &str, deployment_name: &str) -> String {
        self.arm.resource_url(
            resource_group,
            &format!("Microsoft.Resources/deployments/{deployment_name}"),
        )
    }

    async fn read_state(
        deployment_name: &str,
        response: Response,
    ) -> Result<DeploymentState, DeploymentError> {
        let status = response.status();
        let retry = retry_after(&response);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = ErrorDetail::from_body(&body);
            error!("ARM Deployment failed: {} ({})", deployment_name, status);
            error!("Deployment error details: {}", detail);
            metrics::increment_provider_operation_errors("deployments");
            return Err(DeploymentError::Transport {
                name: deployment_name.to_string(),
                status: status.to_string(),
                detail,
            });
        }

        let resource: DeploymentResource = response
            .json()
            .await
            .map_err(|e| DeploymentError::Transport {
                name: deployment_name.to_string(),
                status: status.to_string(),
                detail: ErrorDetail::Unavailable(format!(
                    "Failed to deserialize deployment response: {e}"
                )),
            })?;
        let properties = resource.properties;
        let provisioning_state = properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
            .map_or(ProvisioningState::Accepted, ProvisioningState::parse);

        Ok(DeploymentState {
            provisioning_state,
            error: properties.and_then(|p| p.error),
            retry_after: retry,
        })
    }

    fn transport_error(deployment_name: &str, err: ArmRequestError) -> DeploymentError {
        match err {
            ArmRequestError::Auth(auth) => DeploymentError::Auth(auth),
            ArmRequestError::Http(http) => DeploymentError::Transport {
                name: deployment_name.to_string(),
                status: "request not completed".to_string(),
                detail: ErrorDetail::Unavailable(http.to_string()),
            },
        }
    }
}

#[async_trait]
impl DeploymentApi for ArmDeployments {
    async fn begin_create_or_update(
        &self,
        resource_group: &str,
        deployment_name: &str,
        request: &DeploymentRequest,
    ) -> Result<DeploymentState, DeploymentError> {
        let span = info_span!(
            "azure.arm.deployment.create_or_update",
            resource_group = resource_group,
            deployment.name = deployment_name
        );
        let start = Instant::now();

        async move {
            let url = self.deployment_url(resource_group, deployment_name);
            let body = DeploymentBody {
                properties: request,
            };
            let response = self
                .arm
                .send(Method::PUT, &url, DEPLOYMENTS_API_VERSION, Some(&body))
                .await
                .map_err(|e| Self::transport_error(deployment_name, e))?;
            let state = Self::read_state(deployment_name, response).await?;
            metrics::record_provider_operation("deployments", start.elapsed().as_secs_f64());
            Ok(state)
        }
        .instrument(span)
        .await
    }

    async fn get_state(
        &self,
        resource_group: &str,
        deployment_name: &str,
    ) -> Result<DeploymentState, DeploymentError> {
        let url = self.deployment_url(resource_group, deployment_name);
        let response = self
            .arm
            .send::<()>(Method::GET, &url, DEPLOYMENTS_API_VERSION, None)
            .await
            .map_err(|e| Self::transport_error(deployment_name, e))?;
        Self::read_state(deployment_name, response).await
    }
}
