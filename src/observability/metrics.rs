//! # Metrics
//!
//! Prometheus metrics for the orchestrator and the permissions gateway.
//!
//! ## Metrics Exposed
//!
//! - `dbt_orchestrator_runs_total` - Total number of orchestrator runs
//! - `dbt_orchestrator_run_failures_total` - Failed runs by the phase they failed in
//! - `dbt_orchestrator_run_duration_seconds` - Duration of a complete run
//! - `dbt_orchestrator_deployment_polls_total` - Deployment status polls
//! - `dbt_orchestrator_provider_operations_total` - Platform API calls by provider
//! - `dbt_orchestrator_provider_operation_duration_seconds` - Platform API call duration
//! - `dbt_orchestrator_provider_operation_errors_total` - Platform API errors by provider
//! - `uc_gateway_requests_total` - Gateway requests by operation and status code

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RUNS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("dbt_orchestrator_runs_total", "Total number of orchestrator runs")
        .expect("Failed to create RUNS_TOTAL metric - this should never happen")
});

static RUN_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dbt_orchestrator_run_failures_total",
            "Total number of failed runs by phase",
        ),
        &["phase"],
    )
    .expect("Failed to create RUN_FAILURES_TOTAL metric - this should never happen")
});

static RUN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "dbt_orchestrator_run_duration_seconds",
            "Duration of orchestrator runs in seconds",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]),
    )
    .expect("Failed to create RUN_DURATION metric - this should never happen")
});

static DEPLOYMENT_POLLS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "dbt_orchestrator_deployment_polls_total",
        "Total number of deployment status polls",
    )
    .expect("Failed to create DEPLOYMENT_POLLS_TOTAL metric - this should never happen")
});

static PROVIDER_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dbt_orchestrator_provider_operations_total",
            "Total number of provider operations by provider",
        ),
        &["provider"],
    )
    .expect("Failed to create PROVIDER_OPERATIONS_TOTAL metric - this should never happen")
});

static PROVIDER_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "dbt_orchestrator_provider_operation_duration_seconds",
            "Duration of provider operations in seconds by provider",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["provider"],
    )
    .expect("Failed to create PROVIDER_OPERATION_DURATION metric - this should never happen")
});

static PROVIDER_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dbt_orchestrator_provider_operation_errors_total",
            "Total number of provider operation errors by provider",
        ),
        &["provider"],
    )
    .expect("Failed to create PROVIDER_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static GATEWAY_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "uc_gateway_requests_total",
            "Total number of permissions gateway requests by operation and status",
        ),
        &["operation", "status"],
    )
    .expect("Failed to create GATEWAY_REQUESTS_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
///
/// # Errors
/// Returns an error if a metric is registered twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_DURATION.clone()))?;
    REGISTRY.register(Box::new(DEPLOYMENT_POLLS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GATEWAY_REQUESTS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_runs() {
    RUNS_TOTAL.inc();
}

pub fn increment_run_failures(phase: &str) {
    RUN_FAILURES_TOTAL.with_label_values(&[phase]).inc();
}

pub fn observe_run_duration(duration: f64) {
    RUN_DURATION.observe(duration);
}

pub fn increment_deployment_polls() {
    DEPLOYMENT_POLLS_TOTAL.inc();
}

/// Record a successful platform API call
pub fn record_provider_operation(provider: &str, duration: f64) {
    PROVIDER_OPERATIONS_TOTAL
        .with_label_values(&[provider])
        .inc();
    PROVIDER_OPERATION_DURATION
        .with_label_values(&[provider])
        .observe(duration);
}

pub fn increment_provider_operation_errors(provider: &str) {
    PROVIDER_OPERATION_ERRORS_TOTAL
        .with_label_values(&[provider])
        .inc();
}

pub fn increment_gateway_requests(operation: &str, status: u16) {
    GATEWAY_REQUESTS_TOTAL
        .with_label_values(&[operation, &status.to_string()])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // A second registration in the same process reports AlreadyReg
        let _ = register_metrics();
        assert!(register_metrics().is_err());
    }

    #[test]
    fn test_increment_run_failures() {
        let before = RUN_FAILURES_TOTAL.with_label_values(&["discovering"]).get();
        increment_run_failures("discovering");
        let after = RUN_FAILURES_TOTAL.with_label_values(&["discovering"]).get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_record_provider_operation() {
        let before = PROVIDER_OPERATIONS_TOTAL.with_label_values(&["key_vault"]).get();
        record_provider_operation("key_vault", 0.2);
        let after = PROVIDER_OPERATIONS_TOTAL.with_label_values(&["key_vault"]).get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_gateway_requests_by_status() {
        let before = GATEWAY_REQUESTS_TOTAL.with_label_values(&["grant", "400"]).get();
        increment_gateway_requests("grant", 400);
        let after = GATEWAY_REQUESTS_TOTAL.with_label_values(&["grant", "400"]).get();
        assert_eq!(after, before + 1);
    }
}
