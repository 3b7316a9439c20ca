//! Logging setup for the provider process.
//!
//! Logs go to **stderr**. stdout belongs to the plugin harness that launched
//! the provider, and anything written there breaks its protocol.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives, e.g. `info`, `oodle_provider=debug`.
//!
//! ```bash
//! # Request URLs and lifecycle steps
//! RUST_LOG=oodle_provider=debug terraform apply
//! ```
//!
//! The API key is never logged; it only travels in a sensitive header.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LEVEL: &str = "info";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn try_init_with(default_level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
}

/// Install the stderr subscriber at the default `info` level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_LEVEL);
}

/// Install the stderr subscriber, using `default_level` when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    if let Err(err) = try_init_with(default_level) {
        panic!("failed to install the logging subscriber: {}", err);
    }
}

/// Install the stderr subscriber unless one is already set.
///
/// Returns `false` when a subscriber was already installed. Safe to call from
/// tests and from code that may run more than once per process.
pub fn try_init_logging() -> bool {
    try_init_with(DEFAULT_LEVEL).is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so only the
    // idempotent entry point is exercised here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_LEVEL).is_ok());
        assert!(EnvFilter::try_new("oodle_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,oodle_provider::client=debug").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        try_init_logging();
        assert!(!try_init_logging());
        tracing::debug!(resource_type = "oodle_monitor", "logging installed");
    }
}
