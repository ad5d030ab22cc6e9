//! # OpenTelemetry Support
//!
//! Tracing setup shared by the orchestrator and the permissions gateway.
//!
//! - Console logging through `tracing-subscriber`, plain text or JSON
//!   (`LOG_FORMAT=json`), filtered by `RUST_LOG`
//! - Optional Datadog export via `datadog-opentelemetry`, enabled when
//!   `DD_API_KEY` is present
//!
//! ## Datadog Integration
//!
//! When Datadog is configured the `datadog-opentelemetry` tracer provider is
//! initialised and spans are bridged to it with `tracing-opentelemetry`:
//! - Service name, version, and environment tagging
//! - Trace context propagation (Datadog and W3C TraceContext)

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Datadog settings read from `DD_*` environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatadogConfig {
    pub service_name: Option<String>,
    pub service_version: Option<String>,
    pub environment: Option<String>,
    pub site: Option<String>,
    pub api_key: Option<String>,
}

impl DatadogConfig {
    /// Read Datadog settings, `None` unless `DD_API_KEY` is set
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("DD_API_KEY").ok()?;
        Some(Self {
            service_name: std::env::var("DD_SERVICE").ok(),
            service_version: std::env::var("DD_VERSION").ok(),
            environment: std::env::var("DD_ENV").ok(),
            site: std::env::var("DD_SITE").ok(),
            api_key: Some(api_key),
        })
    }
}

/// Console log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT`; anything other than `json` means text
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Tracer provider handle for graceful shutdown
#[derive(Debug)]
pub struct TracerProviderHandle(opentelemetry_sdk::trace::SdkTracerProvider);

/// Initialize Datadog tracing when configured
///
/// Returns `Ok(None)` if Datadog is not configured.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init_otel(
    service: &str,
    config: Option<&DatadogConfig>,
) -> Result<Option<TracerProviderHandle>> {
    let Some(config) = config else {
        return Ok(None);
    };

    // Values are read by datadog-opentelemetry during initialization
    if let Some(name) = &config.service_name {
        std::env::set_var("DD_SERVICE", name);
    } else if std::env::var("DD_SERVICE").is_err() {
        std::env::set_var("DD_SERVICE", service);
    }

    if let Some(version) = &config.service_version {
        std::env::set_var("DD_VERSION", version);
    } else if std::env::var("DD_VERSION").is_err() {
        let build_version = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("BUILD_GIT_HASH"));
        std::env::set_var("DD_VERSION", build_version);
    }

    if let Some(env) = &config.environment {
        std::env::set_var("DD_ENV", env);
    }

    if let Some(dd_site) = &config.site {
        std::env::set_var("DD_SITE", dd_site);
    } else if std::env::var("DD_SITE").is_err() {
        std::env::set_var("DD_SITE", "datadoghq.com");
    }

    if let Some(key) = &config.api_key {
        std::env::set_var("DD_API_KEY", key);
    }

    if std::env::var("DD_TRACE_AGENT_URL").is_err() {
        std::env::set_var("DD_TRACE_AGENT_URL", "http://localhost:8126");
    }

    let tracer_provider = datadog_opentelemetry::tracing().init();
    Ok(Some(TracerProviderHandle(tracer_provider)))
}

/// Install the global tracing subscriber
///
/// `default_filter` applies when `RUST_LOG` is unset. Spans are exported to
/// Datadog when a tracer provider is given.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(
    service: &str,
    default_filter: &str,
    format: LogFormat,
    tracer_provider: Option<&TracerProviderHandle>,
) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
    };
    let otel_layer = tracer_provider.map(|handle| {
        tracing_opentelemetry::layer().with_tracer(handle.0.tracer(service.to_string()))
    });

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .with(filter)
        .try_init()?;

    if tracer_provider.is_some() {
        info!(
            "Datadog OpenTelemetry tracing initialized: service={}, version={}, env={:?}",
            std::env::var("DD_SERVICE").unwrap_or_default(),
            std::env::var("DD_VERSION").unwrap_or_default(),
            std::env::var("DD_ENV").ok(),
        );
        info!(
            "Traces will be sent to: {}",
            std::env::var("DD_TRACE_AGENT_URL").unwrap_or_default()
        );
    }
    Ok(())
}

/// Shutdown the tracer provider gracefully
///
/// Flushes pending spans. Call before exit so all traces are sent.
pub fn shutdown_otel(tracer_provider: Option<TracerProviderHandle>) {
    if let Some(TracerProviderHandle(provider)) = tracer_provider {
        info!("Shutting down Datadog tracer provider...");
        if let Err(e) = provider.shutdown_with_timeout(Duration::from_secs(5)) {
            warn!("Error shutting down Datadog tracer provider: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_otel_without_config_is_disabled() {
        let handle = init_otel("dbt-orchestrator", None).expect("no-op init");
        assert!(handle.is_none());
    }

    #[test]
    fn test_log_format_default() {
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }
}
