//! Application configuration loaded from environment variables.
//!
//! The client talks to one backend; which one is selected by a
//! deployment-environment flag, with an explicit URL override for
//! development against ad-hoc hosts.

use std::env;
use std::path::PathBuf;

/// Deployment environment, selects the default backend URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

const DEV_BACKEND_URL: &str = "http://localhost:4001";
const PROD_BACKEND_URL: &str = "https://shake-rewards-api.up.railway.app";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment flag
    pub environment: Environment,
    /// Backend base URL (no trailing slash)
    pub backend_url: String,
    /// Directory holding persisted client state
    pub data_dir: PathBuf,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            backend_url: DEV_BACKEND_URL.to_string(),
            data_dir: PathBuf::from(".shake-tracker"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `APP_ENV` selects the environment (defaults to development),
    /// `BACKEND_URL` overrides the environment's default backend, and
    /// `DATA_DIR` overrides where local state is persisted.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let default_url = match environment {
            Environment::Development => DEV_BACKEND_URL,
            Environment::Production => PROD_BACKEND_URL,
        };

        let backend_url = env::var("BACKEND_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|_| default_url.to_string());

        if backend_url.is_empty() {
            return Err(ConfigError::Invalid("BACKEND_URL"));
        }

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        Ok(Self {
            environment,
            backend_url,
            data_dir,
        })
    }
}

/// Default location for persisted client state.
fn default_data_dir() -> PathBuf {
    match env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".shake-tracker"),
        Err(_) => PathBuf::from(".shake-tracker"),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test so concurrent cases cannot race on process-wide env vars
    #[test]
    fn test_config_from_env() {
        env::set_var("APP_ENV", "development");
        env::set_var("BACKEND_URL", "http://localhost:9999/");
        env::set_var("DATA_DIR", "/tmp/shake-test");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.environment, Environment::Development);
        // Trailing slash is stripped so path joins stay predictable
        assert_eq!(config.backend_url, "http://localhost:9999");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/shake-test"));

        env::set_var("APP_ENV", "production");
        env::remove_var("BACKEND_URL");
        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.backend_url, PROD_BACKEND_URL);

        env::set_var("APP_ENV", "development");
        env::remove_var("DATA_DIR");
    }
}
