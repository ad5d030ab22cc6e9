//! Gateway request handlers.

use super::catalog::{GrantsApi, PermissionsChange, PrivilegeAssignment};
use super::error::GatewayError;
use super::privileges::{parse_privileges, SecurableType};
use crate::observability::metrics;
use axum::extract::{Path, State};
use axum::Json;
use prettytable::{row, Table};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct GatewayState {
    pub grants: Arc<dyn GrantsApi>,
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState").finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub table: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `{securable_type}/{full_name}/{principal}/{privileges}` path segments
type PermissionPath = (String, String, String, String);

/// Render privilege assignments as a PRINCIPAL / PRIVILEGES table
///
/// Each privilege list is rendered bracketed and unquoted, e.g. `[SELECT, MODIFY]`.
#[must_use]
pub fn render_grants_table(assignments: &[PrivilegeAssignment]) -> String {
    let mut table = Table::new();
    table.set_titles(row!["PRINCIPAL", "PRIVILEGES"]);
    for assignment in assignments {
        table.add_row(row![
            &assignment.principal,
            format!("[{}]", assignment.privileges.join(", "))
        ]);
    }
    table.to_string()
}

fn record<T>(operation: &str, result: &Result<T, GatewayError>) {
    let status = match result {
        Ok(_) => 200,
        Err(e) => {
            warn!("{} failed: {}", operation, e);
            e.status_code().as_u16()
        }
    };
    metrics::increment_gateway_requests(operation, status);
}

pub async fn list_grants(
    State(state): State<GatewayState>,
    Path((securable_type, full_name)): Path<(String, String)>,
) -> Result<Json<TableResponse>, GatewayError> {
    let result: Result<Json<TableResponse>, GatewayError> = async {
        let securable_type: SecurableType = securable_type.parse()?;
        let assignments = state.grants.list(securable_type, &full_name).await?;
        Ok(Json(TableResponse {
            table: render_grants_table(&assignments),
        }))
    }
    .await;
    record("list_grants", &result);
    result
}

pub async fn grant(
    State(state): State<GatewayState>,
    Path((securable_type, full_name, principal, privileges)): Path<PermissionPath>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let result: Result<Json<MessageResponse>, GatewayError> = async {
        let securable_type: SecurableType = securable_type.parse()?;
        let privileges = parse_privileges(&privileges)?;
        info!(
            "Granting {:?} on {} {} to {}",
            privileges, securable_type, full_name, principal
        );
        let change = PermissionsChange::grant(&principal, privileges);
        state
            .grants
            .update(securable_type, &full_name, &change)
            .await?;
        Ok(Json(MessageResponse {
            message: "Permissions Granted".to_string(),
        }))
    }
    .await;
    record("grant", &result);
    result
}

pub async fn revoke(
    State(state): State<GatewayState>,
    Path((securable_type, full_name, principal, privileges)): Path<PermissionPath>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let result: Result<Json<MessageResponse>, GatewayError> = async {
        let securable_type: SecurableType = securable_type.parse()?;
        let privileges = parse_privileges(&privileges)?;
        info!(
            "Revoking {:?} on {} {} from {}",
            privileges, securable_type, full_name, principal
        );
        let change = PermissionsChange::revoke(&principal, privileges);
        state
            .grants
            .update(securable_type, &full_name, &change)
            .await?;
        Ok(Json(MessageResponse {
            message: "Permissions Revoked".to_string(),
        }))
    }
    .await;
    record("revoke", &result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_grants_table() {
        let table = render_grants_table(&[PrivilegeAssignment {
            principal: "analyst".into(),
            privileges: vec!["SELECT".into(), "MODIFY".into()],
        }]);
        assert!(table.contains("PRINCIPAL"));
        assert!(table.contains("PRIVILEGES"));
        assert!(table.contains("analyst"));
        assert!(table.contains("[SELECT, MODIFY]"));
        assert!(!table.contains('\''));
    }

    #[test]
    fn test_render_empty_grants_table() {
        let table = render_grants_table(&[]);
        assert!(table.contains("PRINCIPAL"));
    }
}
