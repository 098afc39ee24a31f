// Logging setup for sqlprobe
// Diagnostics go to stderr; stdout is reserved for the progress trace.

use crate::error::ProbeError;
use lazy_static::lazy_static;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.as_str());
}

/// Filter directive from `RUST_LOG`, then `SQLPROBE_LOGLEVEL`, then the default.
pub fn log_filter(verbose: bool) -> String {
    std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.as_str()))
        .unwrap_or_else(|_| {
            let level = if verbose { "debug" } else { "info" };
            format!("{}={}", env!("CARGO_CRATE_NAME"), level)
        })
}

pub fn initialize_logging(verbose: bool) -> Result<(), ProbeError> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(log_filter(verbose)));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .try_init()
        .map_err(|e| ProbeError::Config(format!("cannot initialise logging: {}", e)))
}
