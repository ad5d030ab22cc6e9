//! # Errors
//!
//! Typed errors for each stage of an orchestrator run.
//!
//! Every stage has its own error enum so callers can tell a missing secret
//! from an empty one, or a failed deployment from a transport failure. The
//! top-level `RunError` wraps them and records which phase failed.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Environment variable {key} must be an integer, got '{value}'")]
    InvalidInteger { key: String, value: String },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to create managed identity credential: {0}")]
    Credential(String),

    #[error("Failed to acquire access token for {scope}: {message}")]
    Token { scope: String, message: String },
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret '{0}' not found in Key Vault")]
    NotFound(String),

    #[error("Retrieved secret value from Key Vault is empty: '{0}'")]
    Empty(String),

    #[error("Failed to read secret '{name}' from Key Vault: {message}")]
    Transport { name: String, message: String },
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Container group '{0}' not found")]
    NotFound(String),

    #[error("Failed to retrieve public FQDN for container group '{0}'")]
    NoPublicAddress(String),

    #[error("Failed to look up container group '{name}': {message}")]
    Transport { name: String, message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("ARM template not found: {0}")]
    NotFound(String),

    #[error("Failed to read ARM template {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse ARM template {path}: {message}")]
    Parse { path: String, message: String },

    #[error("ARM template is empty: {0}")]
    Empty(String),

    #[error("Parameters not declared by the ARM template: {}", .0.join(", "))]
    UndeclaredParameters(Vec<String>),

    #[error("ARM template parameters without default value were not supplied: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("Cannot determine install directory for the ARM template: {0}")]
    InstallDir(String),
}

/// Structured error body returned by Azure Resource Manager
///
/// Mirrors the `{"error": {"code", "message", "details"}}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<ArmErrorBody>,
}

impl fmt::Display for ArmErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.code.as_deref().unwrap_or("UnknownError"),
            self.message.as_deref().unwrap_or("no message")
        )?;
        for detail in &self.details {
            write!(f, " [{detail}]")?;
        }
        Ok(())
    }
}

/// Extra detail attached to a failed deployment
///
/// Extraction of the platform's structured error is best-effort; when it fails
/// the reason is kept instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    Available(ArmErrorBody),
    Unavailable(String),
}

impl ErrorDetail {
    /// Extract the ARM error envelope from a response body
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: Option<ArmErrorBody>,
        }

        if body.trim().is_empty() {
            return Self::Unavailable("empty response body".to_string());
        }
        match serde_json::from_str::<Envelope>(body) {
            Ok(Envelope { error: Some(error) }) => Self::Available(error),
            Ok(Envelope { error: None }) => {
                Self::Unavailable("response body has no error object".to_string())
            }
            Err(e) => Self::Unavailable(format!("response body is not an ARM error: {e}")),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(body) => write!(f, "{body}"),
            Self::Unavailable(reason) => write!(f, "detail unavailable ({reason})"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("Deployment {name} failed with state {state}: {detail}")]
    Failed {
        name: String,
        state: String,
        detail: ErrorDetail,
    },

    #[error("ARM deployment {name} request failed ({status}): {detail}")]
    Transport {
        name: String,
        status: String,
        detail: ErrorDetail,
    },

    #[error("Deployment {name} did not reach a terminal state within {waited_secs}s")]
    TimedOut { name: String, waited_secs: u64 },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Phase of a single orchestrator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Configuring,
    Authenticating,
    Discovering,
    BuildingParams,
    Submitting,
    Polling,
    Succeeded,
    Failed,
}

impl RunPhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Configuring => "configuring",
            RunPhase::Authenticating => "authenticating",
            RunPhase::Discovering => "discovering",
            RunPhase::BuildingParams => "building_params",
            RunPhase::Submitting => "submitting",
            RunPhase::Polling => "polling",
            RunPhase::Succeeded => "succeeded",
            RunPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error("Failed to initialise platform client: {0}")]
    Client(String),
}

impl RunError {
    /// Phase in which this error stops the run
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        match self {
            RunError::Config(_) => RunPhase::Configuring,
            RunError::Auth(_) | RunError::Secret(_) | RunError::Client(_) => {
                RunPhase::Authenticating
            }
            RunError::Discovery(_) => RunPhase::Discovering,
            RunError::Template(_) => RunPhase::BuildingParams,
            RunError::Deployment(DeploymentError::Transport { .. } | DeploymentError::Auth(_)) => {
                RunPhase::Submitting
            }
            RunError::Deployment(_) => RunPhase::Polling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_from_arm_body() {
        let body = r#"{"error":{"code":"InvalidTemplate","message":"Bad template","details":[{"code":"ParameterMissing","message":"cpuCores"}]}}"#;
        let detail = ErrorDetail::from_body(body);
        match &detail {
            ErrorDetail::Available(error) => {
                assert_eq!(error.code.as_deref(), Some("InvalidTemplate"));
                assert_eq!(error.details.len(), 1);
            }
            ErrorDetail::Unavailable(reason) => panic!("expected detail, got {reason}"),
        }
        assert_eq!(
            detail.to_string(),
            "InvalidTemplate: Bad template [ParameterMissing: cpuCores]"
        );
    }

    #[test]
    fn test_error_detail_unavailable_is_kept() {
        assert!(matches!(
            ErrorDetail::from_body("<html>gateway timeout</html>"),
            ErrorDetail::Unavailable(_)
        ));
        assert!(matches!(
            ErrorDetail::from_body(""),
            ErrorDetail::Unavailable(reason) if reason == "empty response body"
        ));
        assert!(matches!(
            ErrorDetail::from_body(r#"{"status":"Failed"}"#),
            ErrorDetail::Unavailable(_)
        ));
    }

    #[test]
    fn test_empty_and_missing_secret_messages_differ() {
        let empty = SecretError::Empty("uc-admin-key".into()).to_string();
        let missing = SecretError::NotFound("uc-admin-key".into()).to_string();
        assert!(empty.contains("Retrieved secret value from Key Vault is empty"));
        assert!(missing.contains("not found"));
        assert_ne!(empty, missing);
    }

    #[test]
    fn test_run_error_phase() {
        let err = RunError::from(ConfigError::MissingVariables(vec!["LOCATION".into()]));
        assert_eq!(err.phase(), RunPhase::Configuring);
        let err = RunError::from(DiscoveryError::NoPublicAddress("uc".into()));
        assert_eq!(err.phase(), RunPhase::Discovering);
        let err = RunError::from(DeploymentError::Failed {
            name: "d".into(),
            state: "Failed".into(),
            detail: ErrorDetail::Unavailable("none".into()),
        });
        assert_eq!(err.phase(), RunPhase::Polling);
    }
}
