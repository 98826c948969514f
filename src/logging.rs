//! Logging initialization.
//!
//! Uses the `tracing` ecosystem for structured logging with support for
//! both human-readable and JSON output formats. Logs go to stderr; stdout
//! carries the per-file progress lines and the final report.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter directive.
///
/// Quiet by default: per-file progress is already printed on stdout, so only
/// degraded and failed files are logged. `verbose` adds per-file decisions
/// and encoder details.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "image_versions=debug,info"
    } else {
        "warn"
    }
}

/// Initialize the logging subsystem.
///
/// The `RUST_LOG` environment variable overrides the level when set.
pub fn init(verbose: bool, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}
