//! Permissions gateway router tests
//!
//! Requests are sent through the full router with `tower::ServiceExt::oneshot`
//! against an in-memory catalog.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use dbt_orchestrator::gateway::catalog::{GrantsApi, PermissionsChange, PrivilegeAssignment};
use dbt_orchestrator::gateway::privileges::{Privilege, SecurableType};
use dbt_orchestrator::gateway::{self, GatewayError, GatewayState};
use dbt_orchestrator::server::ServerState;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Default)]
struct FakeCatalog {
    updates: Mutex<Vec<(SecurableType, String, PermissionsChange)>>,
    fail_with_status: Option<u16>,
}

#[async_trait]
impl GrantsApi for FakeCatalog {
    async fn list(
        &self,
        _securable_type: SecurableType,
        _full_name: &str,
    ) -> Result<Vec<PrivilegeAssignment>, GatewayError> {
        if let Some(status) = self.fail_with_status {
            return Err(GatewayError::UpstreamStatus {
                status,
                body: "catalog unavailable".to_string(),
            });
        }
        Ok(vec![PrivilegeAssignment {
            principal: "analyst".to_string(),
            privileges: vec!["USE_CATALOG".to_string(), "SELECT".to_string()],
        }])
    }

    async fn update(
        &self,
        securable_type: SecurableType,
        full_name: &str,
        change: &PermissionsChange,
    ) -> Result<(), GatewayError> {
        if let Some(status) = self.fail_with_status {
            return Err(GatewayError::UpstreamStatus {
                status,
                body: "catalog unavailable".to_string(),
            });
        }
        self.updates.lock().expect("lock").push((
            securable_type,
            full_name.to_string(),
            change.clone(),
        ));
        Ok(())
    }
}

async fn get(catalog: Arc<FakeCatalog>, uri: &str) -> (StatusCode, serde_json::Value) {
    let state = GatewayState { grants: catalog };
    let app = gateway::router(state, Arc::new(ServerState::default()));
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_list_grants_returns_table() {
    let (status, body) = get(Arc::new(FakeCatalog::default()), "/list_grants/catalog/unity").await;
    assert_eq!(status, StatusCode::OK);
    let table = body["table"].as_str().expect("table string");
    assert!(table.contains("PRINCIPAL"));
    assert!(table.contains("analyst"));
    assert!(table.contains("[USE_CATALOG, SELECT]"));
}

#[tokio::test]
async fn test_grant_normalises_privileges() {
    let catalog = Arc::new(FakeCatalog::default());
    let (status, body) = get(
        Arc::clone(&catalog),
        "/grant/table/unity.default.orders/analyst/SELECT,%20modify",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Permissions Granted");

    let updates = catalog.updates.lock().expect("lock");
    assert_eq!(updates.len(), 1);
    let (securable_type, full_name, change) = &updates[0];
    assert_eq!(*securable_type, SecurableType::Table);
    assert_eq!(full_name, "unity.default.orders");
    assert_eq!(change.principal, "analyst");
    assert_eq!(change.add, vec![Privilege::Select, Privilege::Modify]);
    assert!(change.remove.is_empty());
}

#[tokio::test]
async fn test_revoke_moves_privileges_to_remove() {
    let catalog = Arc::new(FakeCatalog::default());
    let (status, body) = get(
        Arc::clone(&catalog),
        "/revoke/schema/unity.default/analyst/USE_SCHEMA",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Permissions Revoked");

    let updates = catalog.updates.lock().expect("lock");
    let (_, _, change) = &updates[0];
    assert!(change.add.is_empty());
    assert_eq!(change.remove, vec![Privilege::UseSchema]);
}

#[tokio::test]
async fn test_unknown_securable_type_is_bad_request() {
    let catalog = Arc::new(FakeCatalog::default());
    let (status, body) = get(
        Arc::clone(&catalog),
        "/grant/warehouse/unity.default/analyst/SELECT",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid securable type: warehouse");
    assert!(catalog.updates.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn test_invalid_privilege_is_bad_request_for_grant_and_revoke() {
    for operation in ["grant", "revoke"] {
        let catalog = Arc::new(FakeCatalog::default());
        let (status, body) = get(
            Arc::clone(&catalog),
            &format!("/{operation}/table/unity.default.orders/analyst/SELECT,DROP"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{operation}");
        assert_eq!(body["detail"], "Invalid privilege(s): DROP");
        assert!(catalog.updates.lock().expect("lock").is_empty());
    }
}

#[tokio::test]
async fn test_upstream_failure_is_internal_error() {
    let catalog = Arc::new(FakeCatalog {
        fail_with_status: Some(503),
        ..FakeCatalog::default()
    });
    let (status, body) = get(catalog, "/list_grants/table/unity.default.orders").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"]
        .as_str()
        .expect("detail string")
        .contains("catalog unavailable"));
}

#[tokio::test]
async fn test_health_routes_are_served() {
    let (status, _) = get(Arc::new(FakeCatalog::default()), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
}
