use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
pub fn init_logging(log_dir: &str) {
    // Ensure logs directory exists
    let _ = fs::create_dir_all(log_dir);

    // Daily rolling JSON file next to the console output
    let file_appender = tracing_appender::rolling::daily(log_dir, "handbook_etl.log");
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    // Respect RUST_LOG if set
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("handbook_etl=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // We need to keep the guard alive so buffered lines are flushed on exit
    std::mem::forget(_guard);
}
