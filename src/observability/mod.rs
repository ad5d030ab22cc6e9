//! # Observability
//!
//! Observability modules for metrics and tracing.
//!
//! - `metrics`: Prometheus metrics collection
//! - `otel`: tracing subscriber and Datadog OpenTelemetry export

pub mod metrics;
pub mod otel;

pub use otel::{init_otel, init_tracing, shutdown_otel, DatadogConfig, LogFormat};
