//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used when `LOG_LEVEL` cannot be parsed as a filter.
const FALLBACK_FILTER: &str = "info";

/// Filter from `RUST_LOG` when set, otherwise from `log_level`.
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Install the global subscriber: human-readable lines, or one JSON object
/// per line when `json` is set.
pub fn init(log_level: &str, json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter(log_level));

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
