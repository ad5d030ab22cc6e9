//! # Identity
//!
//! Resolves the Azure credential used for every platform client in a run.
//!
//! - An explicit `AZURE_CLIENT_ID` selects the user-assigned managed identity
//!   with that client id.
//! - Otherwise the system-assigned managed identity of the host is used.
//! - When the ARM endpoint is overridden (mock servers, contract tests) a static
//!   token credential is used so no identity endpoint is contacted.

use crate::error::AuthError;
use async_trait::async_trait;
use azure_core::credentials::{AccessToken, Secret, TokenCredential, TokenRequestOptions};
use azure_identity::{ManagedIdentityCredential, ManagedIdentityCredentialOptions, UserAssignedId};
use std::sync::Arc;
use tracing::info;

/// Credential that returns a fixed bearer token
///
/// Used when requests are routed to a mock endpoint.
#[derive(Debug)]
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        use typespec_client_core::time::{Duration, OffsetDateTime};

        Ok(AccessToken::new(
            Secret::new(self.token.clone()),
            OffsetDateTime::now_utc() + Duration::seconds(3600),
        ))
    }
}

/// Build the credential for this run
///
/// # Errors
/// Returns `AuthError::Credential` if the managed identity credential cannot be created.
pub fn resolve_credential(client_id: Option<&str>) -> Result<Arc<dyn TokenCredential>, AuthError> {
    if let Some(client_id) = client_id {
        info!("Using ManagedIdentityCredential with client ID: {}", client_id);
        let options = ManagedIdentityCredentialOptions {
            user_assigned_id: Some(UserAssignedId::ClientId(client_id.to_string())),
            ..Default::default()
        };
        let credential = ManagedIdentityCredential::new(Some(options))
            .map_err(|e| AuthError::Credential(e.to_string()))?;
        Ok(credential)
    } else {
        info!("AZURE_CLIENT_ID not set, using system-assigned managed identity");
        let credential =
            ManagedIdentityCredential::new(None).map_err(|e| AuthError::Credential(e.to_string()))?;
        Ok(credential)
    }
}

/// Fetch a bearer token for `scope`
///
/// # Errors
/// Returns `AuthError::Token` if the identity endpoint refuses the request.
pub async fn bearer_token(
    credential: &dyn TokenCredential,
    scope: &str,
) -> Result<String, AuthError> {
    let options = Some(TokenRequestOptions::default());
    let token = credential
        .get_token(&[scope], options)
        .await
        .map_err(|e| AuthError::Token {
            scope: scope.to_string(),
            message: e.to_string(),
        })?;
    Ok(token.token.secret().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_credential() {
        let credential = StaticTokenCredential::new("test-token");
        let token = bearer_token(&credential, "https://management.azure.com/.default")
            .await
            .expect("static token should resolve");
        assert_eq!(token, "test-token");
    }
}
