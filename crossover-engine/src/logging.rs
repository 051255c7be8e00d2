//! Tracing subscriber setup for the CLI
//!
//! Logs go to stderr so report output on stdout stays machine-readable.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Build the filter from `RUST_LOG` when set, otherwise from `log_level`
fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Install the global subscriber.
///
/// * `log_level` - Base level (trace, debug, info, warn, error)
/// * `log_format` - "json" for structured output, anything else for human-readable
pub fn init_logging(log_level: &str, log_format: &str) {
    let subscriber = tracing_subscriber::registry().with(build_filter(log_level));

    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);
        let _ = subscriber.with(fmt_layer).try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        let _ = subscriber.with(fmt_layer).try_init();
    }
}
