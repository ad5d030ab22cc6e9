//! # Constants
//!
//! Shared constants used throughout the orchestrator and the permissions gateway.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Default ARM template file name, resolved next to the installed binary
pub const DEFAULT_TEMPLATE_FILE_NAME: &str = "dbt-job.json";

/// Default dbt command executed by the job container
pub const DEFAULT_DBT_COMMAND: &str = "build";

/// Default memory for the job container group (GB)
pub const DEFAULT_DBT_MEMORY_GB: u32 = 1;

/// Default CPU cores for the job container group
pub const DEFAULT_DBT_CPU_CORES: u32 = 1;

/// Default Key Vault secret holding the storage account key
pub const DEFAULT_STORAGE_KEY_SECRET_NAME: &str = "dbt-storage-account-key";

/// Default Key Vault secret holding the Unity Catalog admin token
pub const DEFAULT_ADMIN_TOKEN_SECRET_NAME: &str = "uc-admin-key";

/// Port the Unity Catalog server listens on inside its container group
pub const UC_SERVER_PORT: u16 = 8080;

/// Path below the Delta container where dbt writes its tables
pub const DELTA_TABLES_PATH_SUFFIX: &str = "delta-tables";

/// Prefix for the per-run container group name
pub const JOB_INSTANCE_NAME_PREFIX: &str = "dbt-job";

/// Prefix for the ARM deployment name
pub const DEPLOYMENT_NAME_PREFIX: &str = "dbt-job-deploy";

/// Azure Resource Manager endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// OAuth scope for Azure Resource Manager tokens
pub const ARM_SCOPE: &str = "https://management.azure.com/.default";

/// API version for `Microsoft.Resources/deployments`
pub const DEPLOYMENTS_API_VERSION: &str = "2021-04-01";

/// API version for `Microsoft.ContainerInstance/containerGroups`
pub const CONTAINER_GROUPS_API_VERSION: &str = "2023-05-01";

/// Default interval between deployment status polls (seconds)
pub const DEFAULT_DEPLOYMENT_POLL_INTERVAL_SECS: u64 = 10;

/// Default maximum time to wait for a deployment to reach a terminal state (seconds)
pub const DEFAULT_DEPLOYMENT_TIMEOUT_SECS: u64 = 3600;

/// Daily fire time of the job timer (UTC hour)
pub const DEFAULT_SCHEDULE_HOUR_UTC: u32 = 7;

/// Daily fire time of the job timer (UTC minute)
pub const DEFAULT_SCHEDULE_MINUTE_UTC: u32 = 0;

/// How late an invocation may start before it is reported as past due (seconds)
pub const PAST_DUE_THRESHOLD_SECS: i64 = 60;

/// Default HTTP server port for metrics and health checks
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default port of the permissions gateway
pub const DEFAULT_GATEWAY_PORT: u16 = 8000;

/// Default Unity Catalog REST base URL used by the gateway
pub const DEFAULT_UC_SERVER_URL: &str = "http://localhost:8080/api/2.1/unity-catalog";

/// Default location of the Unity Catalog admin token inside the gateway container
pub const DEFAULT_UC_TOKEN_FILE: &str = "etc/conf/token.txt";

/// Default gateway URL used by `ucctl`
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000";
