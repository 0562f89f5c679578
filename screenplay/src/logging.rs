//! Development-time tracing for debugging performances.
//!
//! The engine logs through `tracing`: per-task dispatch decisions at `debug`,
//! swallowed failures and step-count divergence at `warn`. Results themselves
//! are reported through the [`EventSink`](crate::sink::EventSink), never
//! through logs.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=screenplay=debug screenplay rules
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
