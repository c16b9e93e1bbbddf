//! Diagnostics for xport.
//!
//! The import report itself goes to stdout; everything emitted through
//! `tracing` (per-tweet detail, media fetches, store timings) goes to stderr
//! so reports stay pipeable.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding a filter directive that overrides the CLI
/// flags (same syntax as `RUST_LOG`).
pub const LOG_ENV_VAR: &str = "XPORT_LOG";

/// Install the global stderr subscriber for a CLI run.
///
/// `--verbose` lowers the floor to debug and shows module targets; `--quiet`
/// raises it to errors only. A directive in `XPORT_LOG` (or `RUST_LOG`) wins
/// over both flags. Calling this more than once is harmless.
pub fn init_cli_logging(quiet: bool, verbose: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = std::env::var(LOG_ENV_VAR)
        .map(EnvFilter::new)
        .or_else(|_| std::env::var("RUST_LOG").map(EnvFilter::new))
        .unwrap_or_else(|_| EnvFilter::new(format!("xport={default_level}")));

    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .ok();
}

/// Logs the start and outcome of a long-running operation with its duration.
pub struct OperationGuard {
    name: String,
    start: std::time::Instant,
}

impl OperationGuard {
    /// Start tracking an operation.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::info!(operation = %name, "Starting operation");
        Self {
            name,
            start: std::time::Instant::now(),
        }
    }

    /// Complete the operation successfully.
    pub fn complete(self) {
        tracing::info!(
            operation = %self.name,
            duration_ms = self.start.elapsed().as_millis(),
            "Operation completed"
        );
    }

    /// Mark the operation as failed.
    pub fn fail(self, error: &dyn std::error::Error) {
        tracing::error!(
            operation = %self.name,
            duration_ms = self.start.elapsed().as_millis(),
            error = %error,
            "Operation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_cli_logging(true, false);
        init_cli_logging(false, true);
    }

    #[test]
    fn test_operation_guard_outcomes() {
        init_cli_logging(true, false);

        OperationGuard::new("noop").complete();

        let err = std::io::Error::other("boom");
        OperationGuard::new("broken").fail(&err);
    }
}
