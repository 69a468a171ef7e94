//! Logging bootstrap built on `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Filter used when neither `RUST_LOG` nor a [`Config`] provides one.
pub const DEFAULT_FILTER: &str = "info,vellum_render=debug";

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global fmt subscriber with the default filter.
///
/// Panics if a global subscriber was already set; use [`try_init`] from tests.
pub fn init() {
    init_with(&Config::default());
}

/// Install the global fmt subscriber using the filter from `config`.
///
/// `RUST_LOG` takes precedence over `config.log_filter`.
pub fn init_with(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.log_filter))
        .init();
}

/// Like [`init`], but silently does nothing if a subscriber is already installed.
///
/// Returns `true` if this call installed the subscriber.
pub fn try_init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .with_test_writer()
        .try_init()
        .is_ok()
}
