//! Tracing subscriber setup
//!
//! Probar Gate emits `tracing` events; hosts that have no subscriber of their
//! own can install the default one here. The filter comes from
//! `PROBAR_GATE_LOG` (e.g. `probar_gate=debug`) and defaults to `info`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "PROBAR_GATE_LOG";

/// Install a formatted stderr subscriber
///
/// Returns `false` if a global subscriber was already installed; calling this
/// more than once is harmless.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
