//! # Job Configuration
//!
//! Settings for a single orchestrator run, loaded once from environment variables
//! and validated eagerly. Downstream components receive a `&JobConfig` and never
//! read the process environment themselves.

use crate::constants::{
    DEFAULT_ADMIN_TOKEN_SECRET_NAME, DEFAULT_DBT_COMMAND, DEFAULT_DBT_CPU_CORES,
    DEFAULT_DBT_MEMORY_GB, DEFAULT_DEPLOYMENT_POLL_INTERVAL_SECS, DEFAULT_DEPLOYMENT_TIMEOUT_SECS,
    DEFAULT_STORAGE_KEY_SECRET_NAME, DEFAULT_TEMPLATE_FILE_NAME,
};
use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variables that must be present and non-empty.
///
/// Keys with a default are listed too: an explicitly empty value still fails.
pub const REQUIRED_KEYS: &[&str] = &[
    "AZURE_SUBSCRIPTION_ID",
    "RESOURCE_GROUP",
    "LOCATION",
    "ACR_LOGIN_SERVER",
    "STORAGE_ACCT_NAME",
    "DBT_PROJECT_FILE_SHARE_NAME",
    "DELTA_CONTAINER_NAME",
    "ACI_SUBNET_ID",
    "DBT_JOB_JSON_FILE_NAME",
    "UAMI_RESOURCE_ID",
    "UC_ACI_NAME",
    "DBT_COMMAND",
    "DBT_MEMORY_GB",
    "DBT_CPU_CORES",
    "KEY_VAULT_URI",
    "DBT_STORAGE_KEY_SECRET_NAME",
    "UC_ADMIN_TOKEN",
];

/// Run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    /// Container registry login server, e.g. `myacr.azurecr.io`
    pub acr_login_server: String,
    pub storage_account_name: String,
    /// File share holding the dbt project
    pub file_share_name: String,
    /// ADLS container holding the Delta tables
    pub delta_container_name: String,
    pub subnet_id: String,
    pub template_file_name: String,
    /// Resource id of the user-assigned identity attached to the job container group
    pub uami_resource_id: String,
    /// Name of the running Unity Catalog container group
    pub uc_aci_name: String,
    pub dbt_command: String,
    pub memory_gb: u32,
    pub cpu_cores: u32,
    pub key_vault_uri: String,
    pub storage_key_secret_name: String,
    pub admin_token_secret_name: String,
    /// Client id of the orchestrator's own user-assigned identity, if any
    pub client_id: Option<String>,
    /// Directory holding the ARM template; defaults to the executable's directory
    pub template_dir: Option<PathBuf>,
    /// Overrides the Azure Resource Manager endpoint (mock servers)
    pub arm_endpoint: Option<String>,
    pub poll_interval: Duration,
    pub deployment_timeout: Duration,
}

impl JobConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    /// Returns `ConfigError` when any required variable is missing or empty, or
    /// when an integer setting does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Every required key is checked before anything is parsed, and all missing
    /// keys are reported together.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingVariables` or `ConfigError::InvalidInteger`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| -> Option<String> {
            match lookup(key) {
                Some(v) => Some(v),
                None => default_for(key),
            }
        };

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| value(key).is_none_or(|v| v.trim().is_empty()))
            .map(|key| (*key).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing));
        }

        // All required keys are known to be present from here on.
        let get = |key: &str| value(key).unwrap_or_default();
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            subscription_id: get("AZURE_SUBSCRIPTION_ID"),
            resource_group: get("RESOURCE_GROUP"),
            location: get("LOCATION"),
            acr_login_server: get("ACR_LOGIN_SERVER"),
            storage_account_name: get("STORAGE_ACCT_NAME"),
            file_share_name: get("DBT_PROJECT_FILE_SHARE_NAME"),
            delta_container_name: get("DELTA_CONTAINER_NAME"),
            subnet_id: get("ACI_SUBNET_ID"),
            template_file_name: get("DBT_JOB_JSON_FILE_NAME"),
            uami_resource_id: get("UAMI_RESOURCE_ID"),
            uc_aci_name: get("UC_ACI_NAME"),
            dbt_command: get("DBT_COMMAND"),
            memory_gb: parse_integer("DBT_MEMORY_GB", &get("DBT_MEMORY_GB"))?,
            cpu_cores: parse_integer("DBT_CPU_CORES", &get("DBT_CPU_CORES"))?,
            key_vault_uri: get("KEY_VAULT_URI"),
            storage_key_secret_name: get("DBT_STORAGE_KEY_SECRET_NAME"),
            admin_token_secret_name: get("UC_ADMIN_TOKEN"),
            client_id: optional("AZURE_CLIENT_ID"),
            template_dir: optional("DBT_JOB_TEMPLATE_DIR").map(PathBuf::from),
            arm_endpoint: optional("ARM_ENDPOINT"),
            poll_interval: Duration::from_secs(match optional("DEPLOYMENT_POLL_INTERVAL_SECS") {
                Some(v) => parse_integer("DEPLOYMENT_POLL_INTERVAL_SECS", &v)?,
                None => DEFAULT_DEPLOYMENT_POLL_INTERVAL_SECS,
            }),
            deployment_timeout: Duration::from_secs(match optional("DEPLOYMENT_TIMEOUT_SECS") {
                Some(v) => parse_integer("DEPLOYMENT_TIMEOUT_SECS", &v)?,
                None => DEFAULT_DEPLOYMENT_TIMEOUT_SECS,
            }),
        })
    }
}

fn default_for(key: &str) -> Option<String> {
    match key {
        "DBT_JOB_JSON_FILE_NAME" => Some(DEFAULT_TEMPLATE_FILE_NAME.to_string()),
        "DBT_COMMAND" => Some(DEFAULT_DBT_COMMAND.to_string()),
        "DBT_MEMORY_GB" => Some(DEFAULT_DBT_MEMORY_GB.to_string()),
        "DBT_CPU_CORES" => Some(DEFAULT_DBT_CPU_CORES.to_string()),
        "DBT_STORAGE_KEY_SECRET_NAME" => Some(DEFAULT_STORAGE_KEY_SECRET_NAME.to_string()),
        "UC_ADMIN_TOKEN" => Some(DEFAULT_ADMIN_TOKEN_SECRET_NAME.to_string()),
        _ => None,
    }
}

fn parse_integer<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_err| ConfigError::InvalidInteger {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) fn complete_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("AZURE_SUBSCRIPTION_ID", "00000000-0000-0000-0000-000000000001".to_string()),
            ("RESOURCE_GROUP", "rg-lakehouse".to_string()),
            ("LOCATION", "westeurope".to_string()),
            ("ACR_LOGIN_SERVER", "myacr.azurecr.io".to_string()),
            ("STORAGE_ACCT_NAME", "myacct".to_string()),
            ("DBT_PROJECT_FILE_SHARE_NAME", "dbt-project".to_string()),
            ("DELTA_CONTAINER_NAME", "mycontainer".to_string()),
            ("ACI_SUBNET_ID", "/subscriptions/x/subnets/aci".to_string()),
            ("UAMI_RESOURCE_ID", "/subscriptions/x/identities/dbt".to_string()),
            ("UC_ACI_NAME", "uc-server".to_string()),
            ("KEY_VAULT_URI", "https://kv-lakehouse.vault.azure.net/".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<JobConfig, ConfigError> {
        JobConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&complete_env()).expect("config should load");
        assert_eq!(config.template_file_name, "dbt-job.json");
        assert_eq!(config.dbt_command, "build");
        assert_eq!(config.memory_gb, 1);
        assert_eq!(config.cpu_cores, 1);
        assert_eq!(config.storage_key_secret_name, "dbt-storage-account-key");
        assert_eq!(config.admin_token_secret_name, "uc-admin-key");
        assert_eq!(config.client_id, None);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.deployment_timeout, Duration::from_secs(3600));
    }

    #[test]
    fn test_every_required_key_is_enforced() {
        for key in REQUIRED_KEYS {
            let mut env = complete_env();
            env.insert(*key, String::new());
            match load(&env) {
                Err(ConfigError::MissingVariables(missing)) => {
                    assert_eq!(missing, vec![(*key).to_string()], "key {key}");
                }
                other => panic!("expected missing {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_all_missing_keys_reported_together() {
        let mut env = complete_env();
        env.remove("LOCATION");
        env.remove("UC_ACI_NAME");
        let err = load(&env).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingVariables(vec!["LOCATION".into(), "UC_ACI_NAME".into()])
        );
        assert!(err.to_string().contains("LOCATION, UC_ACI_NAME"));
    }

    #[test]
    fn test_integer_settings_must_parse() {
        let mut env = complete_env();
        env.insert("DBT_MEMORY_GB", "two".to_string());
        assert!(matches!(
            load(&env),
            Err(ConfigError::InvalidInteger { key, .. }) if key == "DBT_MEMORY_GB"
        ));
    }

    #[test]
    fn test_optional_settings() {
        let mut env = complete_env();
        env.insert("AZURE_CLIENT_ID", "11111111-2222-3333-4444-555555555555".to_string());
        env.insert("DBT_CPU_CORES", "2".to_string());
        env.insert("DEPLOYMENT_POLL_INTERVAL_SECS", "0".to_string());
        env.insert("ARM_ENDPOINT", "http://localhost:9000".to_string());
        let config = load(&env).expect("config should load");
        assert_eq!(
            config.client_id.as_deref(),
            Some("11111111-2222-3333-4444-555555555555")
        );
        assert_eq!(config.cpu_cores, 2);
        assert_eq!(config.poll_interval, Duration::ZERO);
        assert_eq!(config.arm_endpoint.as_deref(), Some("http://localhost:9000"));
    }
}
