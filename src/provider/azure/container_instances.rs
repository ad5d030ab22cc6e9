//! # Azure Container Instances
//!
//! Looks up a container group through the ARM REST API and reads its public
//! FQDN from `properties.ipAddress.fqdn`.

use super::arm::{ArmClient, ArmRequestError};
use crate::constants::CONTAINER_GROUPS_API_VERSION;
use crate::error::DiscoveryError;
use crate::observability::metrics;
use crate::provider::ServiceLocator;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::time::Instant;
use tracing::{info_span, Instrument};

#[derive(Debug, Deserialize)]
struct ContainerGroup {
    #[serde(default)]
    properties: Option<ContainerGroupProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerGroupProperties {
    #[serde(default)]
    ip_address: Option<IpAddress>,
}

#[derive(Debug, Deserialize)]
struct IpAddress {
    #[serde(default)]
    fqdn: Option<String>,
}

/// Container group lookups
#[derive(Debug, Clone)]
pub struct ContainerInstances {
    arm: ArmClient,
}

impl ContainerInstances {
    #[must_use]
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }
}

#[async_trait]
impl ServiceLocator for ContainerInstances {
    async fn public_fqdn(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<String>, DiscoveryError> {
        let span = info_span!(
            "azure.aci.container_group.get",
            resource_group = resource_group,
            container_group = name
        );
        let start = Instant::now();

        async move {
            let url = self.arm.resource_url(
                resource_group,
                &format!("Microsoft.ContainerInstance/containerGroups/{name}"),
            );
            let response = self
                .arm
                .send::<()>(Method::GET, &url, CONTAINER_GROUPS_API_VERSION, None)
                .await
                .map_err(|e| match e {
                    ArmRequestError::Auth(auth) => DiscoveryError::Auth(auth),
                    ArmRequestError::Http(http) => DiscoveryError::Transport {
                        name: name.to_string(),
                        message: http.to_string(),
                    },
                })?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                metrics::increment_provider_operation_errors("container_instances");
                return Err(DiscoveryError::NotFound(name.to_string()));
            }
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                metrics::increment_provider_operation_errors("container_instances");
                return Err(DiscoveryError::Transport {
                    name: name.to_string(),
                    message: format!("{status} - {error_text}"),
                });
            }

            let group: ContainerGroup = response
                .json()
                .await
                .map_err(|e| DiscoveryError::Transport {
                    name: name.to_string(),
                    message: format!("Failed to deserialize container group: {e}"),
                })?;
            metrics::record_provider_operation(
                "container_instances",
                start.elapsed().as_secs_f64(),
            );

            Ok(group
                .properties
                .and_then(|p| p.ip_address)
                .and_then(|ip| ip.fqdn))
        }
        .instrument(span)
        .await
    }
}
