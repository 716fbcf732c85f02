//! Tracing subscriber initialization for the benchmark binaries.
//!
//! Libraries in this workspace only emit `tracing` events; subscribers are
//! installed by binaries at startup via one of the functions here.

use tracing::Level;
use tracing_subscriber::fmt;

/// Initialize a simple stderr subscriber for development.
///
/// Shows DEBUG and above with target, file, and line number in a compact
/// terminal format.
///
/// # Panics
/// Panics if a global subscriber has already been set.
pub fn init_dev_subscriber() {
    let subscriber = fmt::Subscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Initialize a stderr subscriber that respects `RUST_LOG`.
///
/// Defaults to INFO when `RUST_LOG` is unset. Preferred for the CLI, where
/// per-query DEBUG output would drown the metric tables.
pub fn init_dev_subscriber_with_env_filter() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
