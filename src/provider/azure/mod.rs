//! # Azure Providers
//!
//! Azure implementations of the platform seams.
//!
//! - `key_vault`: Azure Key Vault for secrets
//! - `container_instances`: Unity Catalog service discovery
//! - `deployments`: ARM template deployments
//! - `arm`: shared Resource Manager REST client

pub mod arm;
pub mod container_instances;
pub mod deployments;
pub mod key_vault;

pub use arm::ArmClient;
pub use container_instances::ContainerInstances;
pub use deployments::ArmDeployments;
pub use key_vault::AzureKeyVault;

use crate::config::JobConfig;
use crate::constants::DEFAULT_ARM_ENDPOINT;
use crate::error::RunError;
use crate::identity::{resolve_credential, StaticTokenCredential};
use crate::provider::{PlatformClients, PlatformConnector};
use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use std::sync::Arc;
use tracing::info;

/// Connects to Azure with the run's managed identity
#[derive(Debug, Default, Clone, Copy)]
pub struct AzureConnector;

impl AzureConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlatformConnector for AzureConnector {
    async fn connect(&self, config: &JobConfig) -> Result<PlatformClients, RunError> {
        let (endpoint, credential): (&str, Arc<dyn TokenCredential>) =
            if let Some(endpoint) = config.arm_endpoint.as_deref() {
                info!("Using ARM endpoint override: {}", endpoint);
                (endpoint, Arc::new(StaticTokenCredential::new("test-token")))
            } else {
                (
                    DEFAULT_ARM_ENDPOINT,
                    resolve_credential(config.client_id.as_deref())?,
                )
            };

        let arm = ArmClient::new(endpoint, &config.subscription_id, Arc::clone(&credential))
            .map_err(|e| RunError::Client(format!("ARM client: {e}")))?;
        let key_vault = AzureKeyVault::new(&config.key_vault_uri, credential)
            .map_err(|e| RunError::Client(format!("Key Vault client: {e}")))?;

        Ok(PlatformClients {
            secrets: Arc::new(key_vault),
            locator: Arc::new(ContainerInstances::new(arm.clone())),
            deployments: Arc::new(ArmDeployments::new(arm)),
        })
    }
}
