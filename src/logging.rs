//! Tracing subscriber setup for the bridge binary

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "FLOWGATE_LOG";

const DEFAULT_FILTER: &str = "info";

/// Filter from `FLOWGATE_LOG`, then `RUST_LOG`, then `info`.
///
/// An unparsable `FLOWGATE_LOG` falls back to the default rather than failing
/// startup.
pub fn env_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {} directive '{}' ({}); using {}", LOG_ENV, directive, err, DEFAULT_FILTER);
            EnvFilter::new(DEFAULT_FILTER)
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Install the global fmt subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
