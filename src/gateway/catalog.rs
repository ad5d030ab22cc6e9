//! # Unity Catalog Permissions Client
//!
//! Calls the Unity Catalog REST permissions API:
//! - `GET /permissions/{securable_type}/{full_name}`
//! - `PATCH /permissions/{securable_type}/{full_name}`
//!
//! The admin bearer token is read from the token file on every request, so a
//! rotated token is picked up without restarting the gateway.

use super::error::GatewayError;
use super::privileges::{Privilege, SecurableType};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info_span, Instrument};

/// Privileges held by one principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeAssignment {
    pub principal: String,
    #[serde(default)]
    pub privileges: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PermissionsList {
    #[serde(default)]
    privilege_assignments: Vec<PrivilegeAssignment>,
}

/// Privileges to add and remove for one principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionsChange {
    pub principal: String,
    pub add: Vec<Privilege>,
    pub remove: Vec<Privilege>,
}

impl PermissionsChange {
    #[must_use]
    pub fn grant(principal: &str, privileges: Vec<Privilege>) -> Self {
        Self {
            principal: principal.to_string(),
            add: privileges,
            remove: Vec::new(),
        }
    }

    #[must_use]
    pub fn revoke(principal: &str, privileges: Vec<Privilege>) -> Self {
        Self {
            principal: principal.to_string(),
            add: Vec::new(),
            remove: privileges,
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdatePermissions<'a> {
    changes: [&'a PermissionsChange; 1],
}

/// Permission operations against the catalog
#[async_trait]
pub trait GrantsApi: Send + Sync {
    async fn list(
        &self,
        securable_type: SecurableType,
        full_name: &str,
    ) -> Result<Vec<PrivilegeAssignment>, GatewayError>;

    async fn update(
        &self,
        securable_type: SecurableType,
        full_name: &str,
        change: &PermissionsChange,
    ) -> Result<(), GatewayError>;
}

/// REST client for the Unity Catalog permissions API
#[derive(Debug, Clone)]
pub struct UnityCatalogClient {
    client: Client,
    base_url: Url,
    token_file: PathBuf,
}

impl UnityCatalogClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8080/api/2.1/unity-catalog`)
    ///
    /// # Errors
    /// Returns `GatewayError::Upstream` if the URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, token_file: impl Into<PathBuf>) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            GatewayError::Upstream(format!("Invalid Unity Catalog URL '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Upstream(format!(
                "Invalid Unity Catalog URL '{base_url}'"
            )));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            token_file: token_file.into(),
        })
    }

    fn permissions_url(&self, securable_type: SecurableType, full_name: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["permissions", securable_type.as_path_segment(), full_name]);
        }
        url
    }

    async fn admin_token(&self) -> Result<String, GatewayError> {
        let token = tokio::fs::read_to_string(&self.token_file)
            .await
            .map_err(|e| GatewayError::Token {
                path: self.token_file.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(token.trim().to_string())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl GrantsApi for UnityCatalogClient {
    async fn list(
        &self,
        securable_type: SecurableType,
        full_name: &str,
    ) -> Result<Vec<PrivilegeAssignment>, GatewayError> {
        let span = info_span!(
            "unity_catalog.permissions.get",
            securable_type = %securable_type,
            full_name
        );
        async move {
            let token = self.admin_token().await?;
            let response = self
                .client
                .get(self.permissions_url(securable_type, full_name))
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| GatewayError::Upstream(e.to_string()))?;
            let list: PermissionsList = Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| GatewayError::Upstream(format!("Invalid permissions response: {e}")))?;
            debug!("{} privilege assignments", list.privilege_assignments.len());
            Ok(list.privilege_assignments)
        }
        .instrument(span)
        .await
    }

    async fn update(
        &self,
        securable_type: SecurableType,
        full_name: &str,
        change: &PermissionsChange,
    ) -> Result<(), GatewayError> {
        let span = info_span!(
            "unity_catalog.permissions.update",
            securable_type = %securable_type,
            full_name,
            principal = %change.principal
        );
        async move {
            let token = self.admin_token().await?;
            let response = self
                .client
                .patch(self.permissions_url(securable_type, full_name))
                .bearer_auth(token)
                .json(&UpdatePermissions { changes: [change] })
                .send()
                .await
                .map_err(|e| GatewayError::Upstream(e.to_string()))?;
            Self::check(response).await?;
            Ok(())
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_url() {
        let client = UnityCatalogClient::new(
            "http://localhost:8080/api/2.1/unity-catalog",
            "etc/conf/token.txt",
        )
        .expect("client");
        assert_eq!(
            client
                .permissions_url(SecurableType::Table, "unity.default.orders")
                .as_str(),
            "http://localhost:8080/api/2.1/unity-catalog/permissions/table/unity.default.orders"
        );
    }

    #[test]
    fn test_update_body_shape() {
        let change =
            PermissionsChange::grant("analyst", vec![Privilege::Select, Privilege::Modify]);
        let body = serde_json::to_value(UpdatePermissions { changes: [&change] }).expect("json");
        assert_eq!(
            body,
            serde_json::json!({
                "changes": [{"principal": "analyst", "add": ["SELECT", "MODIFY"], "remove": []}]
            })
        );
    }

    #[tokio::test]
    async fn test_admin_token_is_trimmed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("token.txt");
        std::fs::write(&path, "secret-token\n").expect("write token");
        let client = UnityCatalogClient::new("http://localhost:8080/api/2.1/unity-catalog", &path)
            .expect("client");
        assert_eq!(client.admin_token().await.expect("token"), "secret-token");
    }

    #[tokio::test]
    async fn test_missing_token_file() {
        let client = UnityCatalogClient::new(
            "http://localhost:8080/api/2.1/unity-catalog",
            "/nonexistent/token.txt",
        )
        .expect("client");
        assert!(matches!(
            client.admin_token().await,
            Err(GatewayError::Token { .. })
        ));
    }
}
