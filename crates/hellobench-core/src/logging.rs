//! Logging initialisation.
//!
//! Logs go to **stderr** so stdout carries nothing but the memory report and
//! the unknown-adapter banner. The level is taken from `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=debug hellobench raw 0 8080 20
//! RUST_LOG=hellobench_core=trace hellobench
//! ```
//!
//! Nothing logs from inside a request handler; the per-request path stays
//! identical across bindings.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber with `info` as the fallback level.
///
/// # Panics
///
/// Panics if a global subscriber is already set. Call once, first thing in
/// `main`.
pub fn init_logging() {
    init_logging_with_level("info");
}

/// Install the global subscriber with `level` as the fallback when
/// `RUST_LOG` is unset.
pub fn init_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
