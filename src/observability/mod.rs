// Observability: Prometheus metrics. Logging setup lives in crate::logging.

pub mod metrics;

pub use metrics::{init, render, MetricName};
