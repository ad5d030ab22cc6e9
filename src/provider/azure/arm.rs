//! # Azure Resource Manager Client
//!
//! Thin REST client for the Azure Resource Manager API.
//!
//! Requests carry a bearer token obtained from the run's credential for the
//! `https://management.azure.com/.default` scope. The endpoint can be pointed
//! at a mock server for contract tests.

use crate::constants::ARM_SCOPE;
use crate::error::AuthError;
use crate::identity::bearer_token;
use azure_core::credentials::TokenCredential;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArmRequestError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Shared ARM client
#[derive(Clone)]
pub struct ArmClient {
    client: Client,
    endpoint: String,
    subscription_id: String,
    credential: Arc<dyn TokenCredential>,
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .field("subscription_id", &self.subscription_id)
            .finish_non_exhaustive()
    }
}

impl ArmClient {
    /// Create a new ARM client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        subscription_id: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            subscription_id: subscription_id.to_string(),
            credential,
        })
    }

    /// URL of a provider resource inside a resource group
    ///
    /// `resource_path` is everything after `/providers/`, e.g.
    /// `Microsoft.Resources/deployments/my-deployment`.
    #[must_use]
    pub fn resource_url(&self, resource_group: &str, resource_path: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/{}",
            self.endpoint, self.subscription_id, resource_group, resource_path
        )
    }

    /// Send a request with bearer auth and the given api-version
    ///
    /// # Errors
    /// Returns `ArmRequestError` on token or transport failure. Non-2xx
    /// responses are returned as `Ok` for the caller to interpret.
    pub async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: &str,
        api_version: &str,
        body: Option<&B>,
    ) -> Result<Response, ArmRequestError> {
        let token = bearer_token(self.credential.as_ref(), ARM_SCOPE).await?;
        let mut request = self
            .client
            .request(method, url)
            .query(&[("api-version", api_version)])
            .header("Authorization", format!("Bearer {token}"));
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }
}

/// Parse a `Retry-After` header given in seconds
#[must_use]
pub fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
