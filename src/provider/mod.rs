//! # Provider Modules
//!
//! Seams between the orchestrator and the cloud platform.
//!
//! Each platform client implements one of:
//! - `SecretStore` for the secret vault
//! - `ServiceLocator` for looking up the running Unity Catalog service
//! - `DeploymentApi` for submitting and polling template deployments
//!
//! `PlatformConnector` builds all three from a run's configuration so that the
//! credential is resolved once per run.

use crate::config::JobConfig;
use crate::deploy::{DeploymentRequest, DeploymentState};
use crate::error::{DeploymentError, DiscoveryError, RunError, SecretError};
use async_trait::async_trait;
use std::sync::Arc;

/// Secret vault
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Get the latest secret value
    ///
    /// Returns `Ok(None)` when the secret does not exist. An existing secret
    /// with an empty value is returned as `Some("")`.
    async fn get_secret_value(&self, secret_name: &str) -> Result<Option<String>, SecretError>;
}

/// Looks up running container groups
#[async_trait]
pub trait ServiceLocator: Send + Sync {
    /// Public FQDN of the named container group, `None` if it has no public address
    async fn public_fqdn(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<String>, DiscoveryError>;
}

/// Template deployments
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Create or update a deployment and return its initial state
    async fn begin_create_or_update(
        &self,
        resource_group: &str,
        deployment_name: &str,
        request: &DeploymentRequest,
    ) -> Result<DeploymentState, DeploymentError>;

    /// Read the current state of a deployment
    async fn get_state(
        &self,
        resource_group: &str,
        deployment_name: &str,
    ) -> Result<DeploymentState, DeploymentError>;
}

/// Platform clients for one run, all sharing the same credential
#[derive(Clone)]
pub struct PlatformClients {
    pub secrets: Arc<dyn SecretStore>,
    pub locator: Arc<dyn ServiceLocator>,
    pub deployments: Arc<dyn DeploymentApi>,
}

impl std::fmt::Debug for PlatformClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformClients").finish_non_exhaustive()
    }
}

/// Builds the platform clients for a run
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    async fn connect(&self, config: &JobConfig) -> Result<PlatformClients, RunError>;
}

pub mod azure;
