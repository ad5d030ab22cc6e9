//! # Service Discovery
//!
//! Resolves the public FQDN of the Unity Catalog container group. The FQDN is
//! looked up on every run since the container group may have been recreated.

use crate::error::DiscoveryError;
use crate::provider::ServiceLocator;
use tracing::info;

/// Public FQDN of the Unity Catalog container group
///
/// # Errors
/// - `DiscoveryError::NotFound` when the container group does not exist
/// - `DiscoveryError::NoPublicAddress` when it has no public FQDN
pub async fn discover_uc_fqdn(
    locator: &dyn ServiceLocator,
    resource_group: &str,
    container_group: &str,
) -> Result<String, DiscoveryError> {
    info!(
        "Getting Unity Catalog container group details: {}",
        container_group
    );
    match locator.public_fqdn(resource_group, container_group).await? {
        Some(fqdn) if !fqdn.trim().is_empty() => {
            info!("Unity Catalog FQDN: {}", fqdn);
            Ok(fqdn)
        }
        _ => Err(DiscoveryError::NoPublicAddress(container_group.to_string())),
    }
}
