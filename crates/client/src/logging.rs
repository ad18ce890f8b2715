//! Structured logging setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::ClientConfig;

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(config: &ClientConfig) -> &'static str {
    if config.verbose {
        "debug"
    } else if config.log {
        "info"
    } else {
        "warn"
    }
}

/// Install a stderr fmt subscriber.
///
/// `RUST_LOG` takes precedence over the config flags. Returns false if a
/// global subscriber was already installed.
pub fn init_logging(config: &ClientConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_beats_log() {
        let mut config = ClientConfig::default();
        assert_eq!(default_directive(&config), "warn");
        config.log = true;
        assert_eq!(default_directive(&config), "info");
        config.verbose = true;
        assert_eq!(default_directive(&config), "debug");
    }

    #[test]
    fn test_second_init_is_refused() {
        let config = ClientConfig::default();
        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }
}
