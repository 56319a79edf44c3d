//! Tracing subscriber setup.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use crate::config::GeneralConfig;

static INIT: OnceLock<()> = OnceLock::new();

/// Default filter directive for a log level.
#[must_use]
pub fn default_directive(log_level: &str) -> String {
    format!("rapport={log_level},rapport_core={log_level},rapport_llm={log_level},warn")
}

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured `log_level` applies to
/// the rapport crates and everything else logs at `warn`. Calling this more
/// than once, or after another subscriber was installed, is a no-op.
pub fn init_tracing(config: &GeneralConfig) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

        // Err means a subscriber is already installed.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_mentions_every_crate() {
        let d = default_directive("debug");
        assert!(d.starts_with("rapport=debug"));
        assert!(d.contains("rapport_core=debug"));
        assert!(d.ends_with(",warn"));
    }

    #[test]
    fn init_is_idempotent() {
        let config = GeneralConfig::default();
        init_tracing(&config);
        init_tracing(&config);
    }
}
