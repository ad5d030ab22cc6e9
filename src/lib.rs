//! dbt Orchestrator Library
//!
//! Core of the daily dbt job deployer and the Unity Catalog permissions
//! gateway. The binaries in this package are thin wrappers:
//!
//! - `dbt-orchestrator`: runs the job once or on the daily timer
//! - `uc-gateway`: serves the permissions gateway
//! - `ucctl`: command-line client for the gateway
//!
//! Tests are included in the module files and under `tests/`.

pub mod config;
pub mod constants;
pub mod deploy;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod observability;
pub mod params;
pub mod provider;
pub mod runner;
pub mod schedule;
pub mod secrets;
pub mod server;
pub mod template;

pub use config::JobConfig;
pub use error::{RunError, RunPhase};
pub use runner::{run, run_with_lookup, RunOutcome};

/// Build metadata embedded by `build.rs`
pub const BUILD_GIT_HASH: &str = env!("BUILD_GIT_HASH");
pub const BUILD_DATETIME: &str = env!("BUILD_DATETIME");
