//! # Gateway Client
//!
//! HTTP client for the permissions gateway, used by `ucctl`.
//!
//! Privilege input is normalised before any request is made. Gateway errors
//! surface the `detail` field of the JSON body, or the raw body when it is not
//! JSON.

use super::privileges::normalize_privilege_tokens;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Usage(String),

    #[error("Connection Error: Could not connect to the service at {0}. Is the service running?")]
    Connection(String),

    #[error("Request timed out. The service might be taking too long to respond.")]
    Timeout,

    #[error("Service Error ({status}): {detail}")]
    Service { status: u16, detail: String },

    #[error("An unexpected request error occurred: {0}")]
    Request(String),
}

#[derive(Debug, Deserialize)]
struct TableBody {
    table: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

/// Extract the `detail` field of an error body, falling back to the raw text
#[must_use]
pub fn error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct Detail {
        detail: serde_json::Value,
    }

    match serde_json::from_str::<Detail>(body) {
        Ok(Detail {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(Detail { detail }) => detail.to_string(),
        Err(_) => body.to_string(),
    }
}

/// Permissions gateway client
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
}

impl GatewayClient {
    /// Create a client for the gateway at `base_url`
    ///
    /// # Errors
    /// Returns `ClientError::Usage` for an invalid URL.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Usage(format!("Invalid gateway URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Usage(format!("Invalid gateway URL '{base_url}'")));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, ClientError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else if e.is_connect() {
                ClientError::Connection(self.base_url.to_string())
            } else {
                ClientError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Service {
            status: status.as_u16(),
            detail: if body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                error_detail(&body)
            },
        })
    }

    /// Preformatted grants table for a securable
    ///
    /// # Errors
    /// Returns `ClientError` on connection, timeout, or gateway errors.
    pub async fn list_grants(
        &self,
        securable_type: &str,
        full_name: &str,
    ) -> Result<String, ClientError> {
        if full_name.trim().is_empty() {
            return Err(ClientError::Usage(
                "Please enter the Securable Full Name.".to_string(),
            ));
        }
        let response = self
            .get(self.url(&["list_grants", securable_type, full_name]))
            .await?;
        let body: TableBody = response
            .json()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;
        Ok(body.table)
    }

    /// Grant privileges to a principal
    ///
    /// # Errors
    /// Returns `ClientError::Usage` when no privilege is left after
    /// normalisation, otherwise as for [`GatewayClient::list_grants`].
    pub async fn grant(
        &self,
        securable_type: &str,
        full_name: &str,
        principal: &str,
        privileges: &str,
    ) -> Result<String, ClientError> {
        self.change("grant", securable_type, full_name, principal, privileges)
            .await
    }

    /// Revoke privileges from a principal
    ///
    /// # Errors
    /// As for [`GatewayClient::grant`].
    pub async fn revoke(
        &self,
        securable_type: &str,
        full_name: &str,
        principal: &str,
        privileges: &str,
    ) -> Result<String, ClientError> {
        self.change("revoke", securable_type, full_name, principal, privileges)
            .await
    }

    async fn change(
        &self,
        operation: &str,
        securable_type: &str,
        full_name: &str,
        principal: &str,
        privileges: &str,
    ) -> Result<String, ClientError> {
        if full_name.trim().is_empty() || principal.trim().is_empty() {
            return Err(ClientError::Usage(format!(
                "Please fill in all fields to {operation} permissions."
            )));
        }
        let tokens = normalize_privilege_tokens(privileges);
        if tokens.is_empty() {
            return Err(ClientError::Usage(format!(
                "Please enter at least one permission to {operation}."
            )));
        }
        let joined = tokens.join(",");
        let response = self
            .get(self.url(&[operation, securable_type, full_name, principal, &joined]))
            .await?;
        let body: MessageBody = response
            .json()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;
        Ok(body.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail() {
        assert_eq!(
            error_detail(r#"{"detail":"Invalid privilege(s): DROP"}"#),
            "Invalid privilege(s): DROP"
        );
        assert_eq!(error_detail("Internal Server Error"), "Internal Server Error");
        assert_eq!(error_detail(r#"{"detail":{"code":1}}"#), r#"{"code":1}"#);
    }

    #[test]
    fn test_url_encodes_segments() {
        let client = GatewayClient::new("http://localhost:8000").expect("client");
        assert_eq!(
            client
                .url(&[
                    "grant",
                    "table",
                    "unity.default.orders",
                    "user@example.com",
                    "SELECT,MODIFY",
                ])
                .as_str(),
            "http://localhost:8000/grant/table/unity.default.orders/user@example.com/SELECT,MODIFY"
        );
    }

    #[tokio::test]
    async fn test_empty_privileges_is_usage_error() {
        let client = GatewayClient::new("http://localhost:8000").expect("client");
        let err = client
            .grant("table", "unity.default.orders", "analyst", " , ")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Usage(_)));
    }
}
