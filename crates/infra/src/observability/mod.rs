//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over the configured level when set, so a deployment can
//! raise verbosity without editing its config file.

use bulwark_domain::{BulwarkError, LogFormat, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber described by `config`
///
/// # Errors
/// Returns `BulwarkError::Config` for an unparseable level directive and
/// `BulwarkError::Internal` if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(false)).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };
    installed.map_err(|e| BulwarkError::Internal(format!("Failed to install subscriber: {e}")))
}

/// `RUST_LOG` if set, otherwise the configured level
fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| {
        BulwarkError::Config(format!("Invalid log level '{}': {e}", config.level))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_config_error() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig { level: "bulwark=loudest".into(), format: LogFormat::Pretty };

        let result = env_filter(&config);
        assert!(matches!(result, Err(BulwarkError::Config(_))));
    }

    #[test]
    fn test_second_init_fails_without_panicking() {
        let config = LoggingConfig::default();

        // Another test may have installed one already; either way the
        // second call must report the conflict
        let _ = init_tracing(&config);
        let second = init_tracing(&config);
        assert!(matches!(second, Err(BulwarkError::Internal(_))));
    }
}
