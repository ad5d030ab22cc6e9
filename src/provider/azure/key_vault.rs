//! # Azure Key Vault Client
//!
//! Reads the storage account key and the Unity Catalog admin token from
//! Azure Key Vault. Values are never logged.

use crate::error::SecretError;
use crate::observability::metrics;
use crate::provider::SecretStore;
use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use azure_core::http::StatusCode;
use azure_security_keyvault_secrets::SecretClient;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, Instrument};

/// Azure Key Vault secret store
pub struct AzureKeyVault {
    client: SecretClient,
    vault_url: String,
}

impl std::fmt::Debug for AzureKeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureKeyVault")
            .field("vault_url", &self.vault_url)
            .finish_non_exhaustive()
    }
}

/// Normalize a vault address
///
/// Accepts a full URL or a bare vault name (`https://{vault-name}.vault.azure.net/`).
#[must_use]
pub fn vault_url(vault: &str) -> String {
    if vault.starts_with("https://") || vault.starts_with("http://") {
        vault.to_string()
    } else {
        format!("https://{vault}.vault.azure.net/")
    }
}

impl AzureKeyVault {
    /// Create a new Azure Key Vault client
    ///
    /// # Errors
    /// Returns an error if the SDK client cannot be created for the vault URL.
    pub fn new(
        vault: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, azure_core::Error> {
        let vault_url = vault_url(vault);
        let client = SecretClient::new(&vault_url, credential, None)?;
        Ok(Self { client, vault_url })
    }

    fn vault_name(&self) -> &str {
        self.vault_url
            .strip_prefix("https://")
            .and_then(|s| s.strip_suffix(".vault.azure.net/"))
            .unwrap_or("unknown")
    }
}

/// A missing secret is reported by Key Vault as HTTP 404
fn is_not_found(err: &azure_core::Error) -> bool {
    err.http_status() == Some(StatusCode::NotFound)
}

#[async_trait]
impl SecretStore for AzureKeyVault {
    async fn get_secret_value(&self, secret_name: &str) -> Result<Option<String>, SecretError> {
        let span = tracing::debug_span!(
            "azure.keyvault.secret.get",
            secret.name = secret_name,
            vault.name = self.vault_name(),
            operation.found = tracing::field::Empty,
            operation.duration_ms = tracing::field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            // No version requested: the latest version is returned
            match self.client.get_secret(secret_name, None).await {
                Ok(response) => {
                    use azure_security_keyvault_secrets::models::Secret;
                    let secret = serde_json::from_slice::<Secret>(&response.into_body())
                        .map_err(|e| {
                            metrics::increment_provider_operation_errors("key_vault");
                            SecretError::Transport {
                                name: secret_name.to_string(),
                                message: format!("Failed to deserialize secret response: {e}"),
                            }
                        })?;
                    span_clone.record("operation.found", secret.value.is_some());
                    span_clone.record("operation.duration_ms", start.elapsed().as_millis() as u64);
                    metrics::record_provider_operation("key_vault", start.elapsed().as_secs_f64());
                    debug!("Read secret {} from Key Vault", secret_name);
                    Ok(secret.value)
                }
                Err(e) if is_not_found(&e) => {
                    span_clone.record("operation.found", false);
                    metrics::record_provider_operation("key_vault", start.elapsed().as_secs_f64());
                    Ok(None)
                }
                Err(e) => {
                    metrics::increment_provider_operation_errors("key_vault");
                    Err(SecretError::Transport {
                        name: secret_name.to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_url_from_name() {
        assert_eq!(vault_url("my-vault"), "https://my-vault.vault.azure.net/");
    }

    #[test]
    fn test_vault_url_passthrough() {
        assert_eq!(
            vault_url("https://custom-vault.vault.azure.net/"),
            "https://custom-vault.vault.azure.net/"
        );
        assert_eq!(vault_url("http://127.0.0.1:8200/"), "http://127.0.0.1:8200/");
    }

    #[test]
    fn test_transport_error_mentioning_404_is_not_a_missing_secret() {
        let err = azure_core::Error::new(
            azure_core::error::ErrorKind::Io,
            std::io::Error::other("connection reset: 404 not found in proxy cache"),
        );
        assert!(!is_not_found(&err));
    }

    #[test]
    fn test_status_less_error_is_not_a_missing_secret() {
        let err = azure_core::Error::new(
            azure_core::error::ErrorKind::DataConversion,
            std::io::Error::other("SecretNotFound"),
        );
        assert!(!is_not_found(&err));
    }
}
