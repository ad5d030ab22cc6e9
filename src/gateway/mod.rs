//! # Permissions Gateway
//!
//! HTTP service translating list/grant/revoke requests into Unity Catalog
//! permission API calls.
//!
//! ## Routes
//!
//! - `GET /list_grants/{securable_type}/{full_name}` returns `{"table": ...}`
//! - `GET /grant/{securable_type}/{full_name}/{principal}/{privileges}`
//! - `GET /revoke/{securable_type}/{full_name}/{principal}/{privileges}`
//! - `/metrics`, `/healthz`, `/readyz`
//!
//! Errors are returned as `{"detail": "..."}`: 400 for an unknown securable
//! type or privilege, 500 for token or upstream failures.

pub mod catalog;
pub mod client;
pub mod error;
pub mod privileges;
pub mod routes;

pub use catalog::{GrantsApi, UnityCatalogClient};
pub use client::{ClientError, GatewayClient};
pub use error::GatewayError;
pub use routes::GatewayState;

use crate::constants::{DEFAULT_GATEWAY_PORT, DEFAULT_UC_SERVER_URL, DEFAULT_UC_TOKEN_FILE};
use crate::server::{health_router, ServerState};
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Gateway settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub port: u16,
    /// Unity Catalog REST base URL
    pub uc_server_url: String,
    /// File holding the Unity Catalog admin token
    pub token_file: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_GATEWAY_PORT,
            uc_server_url: DEFAULT_UC_SERVER_URL.to_string(),
            token_file: PathBuf::from(DEFAULT_UC_TOKEN_FILE),
        }
    }
}

impl GatewayConfig {
    /// Load settings from `GATEWAY_PORT`, `UC_SERVER_URL` and `UC_TOKEN_FILE`
    ///
    /// # Errors
    /// Returns an error if `GATEWAY_PORT` is not a valid port.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup
    ///
    /// # Errors
    /// Returns an error if `GATEWAY_PORT` is not a valid port.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let port = match lookup("GATEWAY_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                anyhow::anyhow!("GATEWAY_PORT must be a port number, got '{raw}': {e}")
            })?,
            None => defaults.port,
        };
        Ok(Self {
            port,
            uc_server_url: lookup("UC_SERVER_URL").unwrap_or(defaults.uc_server_url),
            token_file: lookup("UC_TOKEN_FILE").map_or(defaults.token_file, PathBuf::from),
        })
    }
}

/// Gateway router with health routes and request tracing
pub fn router(state: GatewayState, health: Arc<ServerState>) -> Router {
    Router::new()
        .route(
            "/list_grants/{securable_type}/{full_name}",
            get(routes::list_grants),
        )
        .route(
            "/grant/{securable_type}/{full_name}/{principal}/{privileges}",
            get(routes::grant),
        )
        .route(
            "/revoke/{securable_type}/{full_name}/{principal}/{privileges}",
            get(routes::revoke),
        )
        .with_state(state)
        .merge(health_router(health))
        .layer(TraceLayer::new_for_http())
}
