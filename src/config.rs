//! API client configuration parsed from environment variables.

use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

pub const ENV_API_URL: &str = "EXORVIA_API_URL";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "EXORVIA_CONNECT_TIMEOUT_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "EXORVIA_REQUEST_TIMEOUT_SECS";
pub const ENV_HISTORY_LIMIT: &str = "EXORVIA_HISTORY_LIMIT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base URL in {var}: {value}")]
    InvalidBaseUrl { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to, without a trailing slash.
    pub base_url: String,
    pub connect_timeout_secs: u64,
    /// Whole-request timeout. `None` lets slow LLM-backed calls resolve whenever the server answers.
    pub request_timeout_secs: Option<u64>,
    /// Row limit for the chat and graph history endpoints.
    pub history_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_owned(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl ApiConfig {
    /// Build typed API config from environment variables.
    ///
    /// Optional:
    /// - `EXORVIA_API_URL`: default `http://localhost:5000/api`
    /// - `EXORVIA_CONNECT_TIMEOUT_SECS`: default 10
    /// - `EXORVIA_REQUEST_TIMEOUT_SECS`: unset means no request timeout
    /// - `EXORVIA_HISTORY_LIMIT`: default 20
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an `http(s)` URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. `from_env` delegates here.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an `http(s)` URL.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = match lookup(ENV_API_URL) {
            Some(raw) => normalize_base_url(&raw).ok_or(ConfigError::InvalidBaseUrl { var: ENV_API_URL, value: raw })?,
            None => DEFAULT_API_BASE_URL.to_owned(),
        };
        let connect_timeout_secs =
            parse_or(lookup(ENV_CONNECT_TIMEOUT_SECS).as_deref(), DEFAULT_CONNECT_TIMEOUT_SECS);
        let request_timeout_secs = lookup(ENV_REQUEST_TIMEOUT_SECS)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0);
        let history_limit = parse_or(lookup(ENV_HISTORY_LIMIT).as_deref(), DEFAULT_HISTORY_LIMIT);

        Ok(Self { base_url, connect_timeout_secs, request_timeout_secs, history_limit })
    }

    /// Replace the base URL, e.g. from a `--base-url` flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an `http(s)` URL.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url =
            normalize_base_url(raw).ok_or_else(|| ConfigError::InvalidBaseUrl { var: ENV_API_URL, value: raw.to_owned() })?;
        Ok(self)
    }
}

fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());
    has_host.then(|| trimmed.to_owned())
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
