#![forbid(unsafe_code)]

//! Tracing subscriber setup for hosts and examples.
//!
//! Library code only emits `tracing` events. A host that has no subscriber of
//! its own can call [`init_tracing`] once at startup; the filter comes from
//! the `CHORECARD_LOG` environment variable (`EnvFilter` syntax) and falls
//! back to `info`. With the `tracing-json` feature, lines are JSON objects.

use std::sync::Once;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "CHORECARD_LOG";

const DEFAULT_FILTER: &str = "info";

static TRACING_INSTALLED: Once = Once::new();

/// Build the filter from [`LOG_ENV`], falling back to `info`.
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global `fmt` subscriber (idempotent).
///
/// Returns `false` if another global subscriber was already installed.
pub fn init_tracing() -> bool {
    let mut installed = false;
    TRACING_INSTALLED.call_once(|| {
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter())
            .with_target(true);

        #[cfg(feature = "tracing-json")]
        let result = builder.json().try_init();
        #[cfg(not(feature = "tracing-json"))]
        let result = builder.try_init();

        installed = result.is_ok();
    });
    installed
}
