//! # Secret Resolution
//!
//! Fetches the two secrets a run needs: the storage account key mounted by the
//! job container and the Unity Catalog admin token.
//!
//! Secret values are held in `SecretValue`, which zeroizes on drop and never
//! prints its contents.

use crate::config::JobConfig;
use crate::error::SecretError;
use crate::provider::SecretStore;
use std::fmt;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret string that is redacted in debug output
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue(String);

impl SecretValue {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

/// Secrets resolved for one run
#[derive(Debug, Clone)]
pub struct RunSecrets {
    pub storage_account_key: SecretValue,
    pub admin_token: SecretValue,
}

/// Fetch one secret and reject missing or empty values
///
/// # Errors
/// - `SecretError::NotFound` when the secret does not exist
/// - `SecretError::Empty` when it exists with an empty value
/// - `SecretError::Transport` when the store cannot be reached
pub async fn resolve_secret(
    store: &dyn SecretStore,
    secret_name: &str,
) -> Result<SecretValue, SecretError> {
    match store.get_secret_value(secret_name).await? {
        None => Err(SecretError::NotFound(secret_name.to_string())),
        Some(value) if value.is_empty() => Err(SecretError::Empty(secret_name.to_string())),
        Some(value) => Ok(SecretValue::new(value)),
    }
}

/// Fetch both run secrets concurrently
///
/// # Errors
/// Returns the first `SecretError` encountered.
pub async fn resolve_run_secrets(
    store: &dyn SecretStore,
    config: &JobConfig,
) -> Result<RunSecrets, SecretError> {
    info!("Retrieving secrets from Key Vault...");
    let (storage_account_key, admin_token) = futures::try_join!(
        resolve_secret(store, &config.storage_key_secret_name),
        resolve_secret(store, &config.admin_token_secret_name),
    )?;
    info!("Secrets retrieved");
    Ok(RunSecrets {
        storage_account_key,
        admin_token,
    })
}
