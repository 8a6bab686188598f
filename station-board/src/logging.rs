//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogLevel;

/// HTTP client internals are only interesting when something is wrong.
const QUIET_CRATES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "h2=warn"];

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(level: LogLevel) -> String {
    let mut directives = vec![level.as_directive()];
    directives.extend_from_slice(QUIET_CRATES);
    directives.join(",")
}

/// Install the global subscriber. `RUST_LOG` overrides `level`.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();
}
