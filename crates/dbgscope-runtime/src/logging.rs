#![forbid(unsafe_code)]

//! Process-wide tracing setup, available with the `tracing-json` feature.
//!
//! Events are written to stderr as JSON objects, filtered by the directive
//! in [`ViewerConfig::log_directive`] (itself overridable through
//! `DBGSCOPE_LOG`).

use dbgscope_core::ViewerConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Directive used when the configured one does not parse.
const FALLBACK_DIRECTIVE: &str = "info";

/// Filter for `directive`, falling back to `info` when it is malformed.
#[must_use]
pub fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE))
}

/// Install the JSON subscriber as the global default.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init(config: &ViewerConfig) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(&config.log_directive))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}
