//! # Job Parameters
//!
//! Assembles the ARM template parameters for one dbt job run. This is a pure
//! step: every input has already been resolved by the time it runs.

use crate::config::JobConfig;
use crate::constants::{DELTA_TABLES_PATH_SUFFIX, JOB_INSTANCE_NAME_PREFIX, UC_SERVER_PORT};
use crate::secrets::RunSecrets;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroize;

/// A single `{ "value": ... }` parameter entry
///
/// Sensitive entries hold a copy of a secret; the copy is zeroized when the
/// entry is dropped.
#[derive(Clone, PartialEq, Serialize)]
pub struct ParameterValue {
    pub value: Value,
    #[serde(skip)]
    sensitive: bool,
}

impl ParameterValue {
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    fn clear_secret(&mut self) {
        if !self.sensitive {
            return;
        }
        if let Value::String(secret) = &mut self.value {
            secret.zeroize();
        }
    }
}

impl Drop for ParameterValue {
    fn drop(&mut self) {
        self.clear_secret();
    }
}

impl fmt::Debug for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sensitive {
            f.write_str("<redacted>")
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Template parameters keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParameterValue>);

impl ParameterSet {
    pub fn insert(&mut self, name: &str, value: Value) {
        self.0.insert(
            name.to_string(),
            ParameterValue {
                value,
                sensitive: false,
            },
        );
    }

    /// Insert a value that must not appear in debug output
    pub fn insert_sensitive(&mut self, name: &str, value: &str) {
        self.0.insert(
            name.to_string(),
            ParameterValue {
                value: Value::String(value.to_string()),
                sensitive: true,
            },
        );
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).map(|p| &p.value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parameters for one run together with the generated job instance name
#[derive(Debug, Clone)]
pub struct BuiltParameters {
    pub job_instance_name: String,
    pub parameters: ParameterSet,
}

/// Container group name for a run started at `now`
///
/// Unique per second; two runs started within the same second collide.
#[must_use]
pub fn job_instance_name(now: DateTime<Utc>) -> String {
    format!("{JOB_INSTANCE_NAME_PREFIX}-{}", now.timestamp())
}

/// ADLS path for the Delta tables
#[must_use]
pub fn storage_path(container: &str, account: &str) -> String {
    format!("abfss://{container}@{account}.dfs.core.windows.net/{DELTA_TABLES_PATH_SUFFIX}")
}

/// Unity Catalog server URL for a discovered FQDN
#[must_use]
pub fn uc_server_url(fqdn: &str) -> String {
    format!("http://{fqdn}:{UC_SERVER_PORT}")
}

/// Assemble the template parameters for a run
#[must_use]
pub fn build_parameters(
    config: &JobConfig,
    uc_fqdn: &str,
    secrets: &RunSecrets,
    now: DateTime<Utc>,
) -> BuiltParameters {
    let job_instance_name = job_instance_name(now);
    let mut parameters = ParameterSet::default();

    parameters.insert("dbtJobInstanceName", Value::from(job_instance_name.as_str()));
    parameters.insert("acrLoginServer", Value::from(config.acr_login_server.as_str()));
    parameters.insert("uamiResourceId", Value::from(config.uami_resource_id.as_str()));
    parameters.insert("subnetId", Value::from(config.subnet_id.as_str()));
    parameters.insert("location", Value::from(config.location.as_str()));
    parameters.insert(
        "dbtProjectStorageAccountName",
        Value::from(config.storage_account_name.as_str()),
    );
    parameters.insert_sensitive("storageAccountKey", secrets.storage_account_key.expose());
    parameters.insert(
        "dbtProjectFileShareName",
        Value::from(config.file_share_name.as_str()),
    );
    parameters.insert_sensitive("ucAdminTokenValue", secrets.admin_token.expose());
    parameters.insert("ucServerUrl", Value::from(uc_server_url(uc_fqdn)));
    parameters.insert(
        "storagePath",
        Value::from(storage_path(
            &config.delta_container_name,
            &config.storage_account_name,
        )),
    );
    parameters.insert("dbtCommandToRun", Value::from(config.dbt_command.as_str()));
    parameters.insert("memoryInGB", Value::from(config.memory_gb));
    parameters.insert("cpuCores", Value::from(config.cpu_cores));

    BuiltParameters {
        job_instance_name,
        parameters,
    }
}
