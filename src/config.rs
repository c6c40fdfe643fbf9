// Startup configuration - environment variables with CLI overrides
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Service configuration, resolved once at startup
///
/// Nothing here is re-negotiated at runtime; commands apply their flag
/// overrides on top of `from_env`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the per-bucket history logs
    pub history_dir: PathBuf,
    /// Directory the rendered charts are published into
    pub artifact_dir: PathBuf,
    /// HTTP listen address for `serve`
    pub listen_addr: String,
    /// Base URL the driver uses to reach the render endpoint
    pub render_url: String,
    /// Deadline for the driver's outbound render call
    pub render_timeout: Duration,
    /// Attempt bound for the driver's render call
    pub retry_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_dir: PathBuf::from("./history"),
            artifact_dir: PathBuf::from("./plots"),
            listen_addr: constants::DEFAULT_LISTEN_ADDR.to_string(),
            render_url: constants::DEFAULT_RENDER_URL.to_string(),
            render_timeout: Duration::from_secs(constants::RENDER_TIMEOUT_SECS),
            retry_limit: constants::DRIVER_MAX_ATTEMPTS,
        }
    }
}

impl Config {
    /// Resolve configuration from the environment, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(dir) = std::env::var(constants::ENV_HISTORY_DIR) {
            config.history_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var(constants::ENV_ARTIFACT_DIR) {
            config.artifact_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var(constants::ENV_LISTEN_ADDR) {
            config.listen_addr = addr;
        }
        if let Ok(url) = std::env::var(constants::ENV_RENDER_URL) {
            config.render_url = url;
        }
        if let Ok(raw) = std::env::var(constants::ENV_RENDER_TIMEOUT_SECS) {
            config.render_timeout =
                Duration::from_secs(parse(constants::ENV_RENDER_TIMEOUT_SECS, &raw)?);
        }
        if let Ok(raw) = std::env::var(constants::ENV_RETRY_LIMIT) {
            config.retry_limit = parse(constants::ENV_RETRY_LIMIT, &raw)?;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_addr, constants::DEFAULT_LISTEN_ADDR);
        assert_eq!(config.retry_limit, constants::DRIVER_MAX_ATTEMPTS);
        assert_eq!(
            config.render_timeout,
            Duration::from_secs(constants::RENDER_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_parse_accepts_valid_values() {
        assert_eq!(parse::<u64>("X", "30").unwrap(), 30);
        assert_eq!(parse::<usize>("X", " 5 ").unwrap(), 5);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse::<u64>("SIZETRACK_RETRY_LIMIT", "soon").unwrap_err();
        assert!(err.to_string().contains("SIZETRACK_RETRY_LIMIT"));
    }
}
