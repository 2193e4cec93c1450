//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`,
//! falling back to `info` (or `debug` when verbose engine logging is
//! requested). Installing twice is a no-op.

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber.
///
/// Returns `true` if this call installed it, `false` if a subscriber was
/// already set (by an earlier call or by the host application).
pub fn init_tracing(verbose: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(verbose, "tracing subscriber installed");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_selects_debug() {
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "info");
    }

    #[test]
    fn second_install_is_noop() {
        init_tracing(false);
        assert!(!init_tracing(true));
    }
}
