//! Diagnostics output.
//!
//! The bridge runs inside the XSPEC process and has no return channel, so
//! every failure is reported as a `tracing` event. [`init()`] installs a
//! plain-text subscriber on stderr for hosts that do not set one up.
//!
//! The filter is read from `PYAPEC_LOG` (same syntax as `RUST_LOG`) and
//! defaults to `warn`.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "PYAPEC_LOG";

const DEFAULT_LEVEL: &str = "warn";

static INIT: Once = Once::new();

/// Install the stderr subscriber.
///
/// Safe to call on every model evaluation; only the first call does work. If
/// the host process already installed a global subscriber, that one is kept.
pub fn init() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

        // Err means a subscriber is already installed.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false)
            .try_init();
    });
}
