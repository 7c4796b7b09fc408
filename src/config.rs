//! Environment-driven client configuration.

use crate::error::{ClientError, ClientResult};
use crate::validation::validate_base_url;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3010/api";
pub const DEFAULT_APP_NAME: &str = "ZeeFit";
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_BASE_URL: &str = "ZEEFIT_API_BASE_URL";
pub const ENV_ENVIRONMENT: &str = "ZEEFIT_ENV";
pub const ENV_APP_NAME: &str = "ZEEFIT_APP_NAME";
pub const ENV_APP_VERSION: &str = "ZEEFIT_APP_VERSION";
pub const ENV_ENABLE_DEBUG: &str = "ZEEFIT_ENABLE_DEBUG";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "ZEEFIT_HTTP_TIMEOUT_SECS";

const REQUIRED_ENV: &[&str] = &[ENV_API_BASE_URL];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to, without trailing slash.
    pub api_base_url: String,
    pub environment: Environment,
    pub app_name: String,
    pub app_version: String,
    pub enable_debug: bool,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            environment: Environment::Development,
            app_name: DEFAULT_APP_NAME.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            enable_debug: false,
            request_timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ClientResult<Self> {
        let base = Self::default();
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_base_url = read(ENV_API_BASE_URL).unwrap_or(base.api_base_url);
        let request_timeout = match read(ENV_HTTP_TIMEOUT_SECS) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    ClientError::Config(format!("{ENV_HTTP_TIMEOUT_SECS} must be a number of seconds"))
                })?;
                Duration::from_secs(secs.max(1))
            }
            None => base.request_timeout,
        };

        let config = Self {
            api_base_url: normalize_base_url(&api_base_url),
            environment: read(ENV_ENVIRONMENT)
                .map(|v| Environment::parse(&v))
                .unwrap_or(base.environment),
            app_name: read(ENV_APP_NAME).unwrap_or(base.app_name),
            app_version: read(ENV_APP_VERSION).unwrap_or(base.app_version),
            enable_debug: read(ENV_ENABLE_DEBUG).is_some_and(|v| v == "true"),
            request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> ClientResult<Self> {
        self.api_base_url = normalize_base_url(&url.into());
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ClientResult<()> {
        validate_base_url(&self.api_base_url).map_err(ClientError::Config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Required variables that are not set. Missing ones fall back to defaults,
/// so callers only warn about them.
pub fn missing_required_env() -> Vec<&'static str> {
    REQUIRED_ENV
        .iter()
        .copied()
        .filter(|key| env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true))
        .collect()
}

pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
