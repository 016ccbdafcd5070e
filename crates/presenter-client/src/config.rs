use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::error::Result;

/// Reconnect schedule applied after a non-terminal close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    pub delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_ms: 3_000,
            max_delay_ms: 3_000,
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt `attempt` (1-based), or `None` once attempts are exhausted.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if let Some(max_attempts) = self.max_attempts
            && attempt > max_attempts
        {
            return None;
        }
        let base = self.delay_ms.max(1);
        let exponent = attempt.saturating_sub(1).min(10);
        let scaled = base.saturating_mul(1_u64 << exponent);
        Some(Duration::from_millis(scaled.min(self.max_delay_ms.max(base))))
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub ws_port: u16,
    pub ws_path: String,
    pub secure: bool,
    pub http_port: u16,
    pub client_type: String,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectConfig,
    pub lock_timeout: Option<Duration>,
    pub search_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            ws_port: 8765,
            ws_path: "/presenter".to_string(),
            secure: false,
            http_port: 5000,
            client_type: "presenter".to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
            lock_timeout: Some(Duration::from_secs(120)),
            search_limit: 20,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PRESENTER_HOST: {0}")]
    InvalidHost(String),
    #[error("invalid PRESENTER_WS_PORT: {0}")]
    InvalidWsPort(String),
    #[error("invalid PRESENTER_WS_PATH: {0}")]
    InvalidWsPath(String),
    #[error("invalid PRESENTER_WS_SECURE: {0}")]
    InvalidWsSecure(String),
    #[error("invalid PRESENTER_HTTP_PORT: {0}")]
    InvalidHttpPort(String),
    #[error("invalid PRESENTER_CLIENT_TYPE: {0}")]
    InvalidClientType(String),
    #[error("invalid PRESENTER_CONNECT_TIMEOUT_MS: {0}")]
    InvalidConnectTimeoutMs(String),
    #[error("invalid PRESENTER_RECONNECT_DELAY_MS: {0}")]
    InvalidReconnectDelayMs(String),
    #[error("invalid PRESENTER_RECONNECT_MAX_DELAY_MS: {0}")]
    InvalidReconnectMaxDelayMs(String),
    #[error("invalid PRESENTER_RECONNECT_MAX_ATTEMPTS: {0}")]
    InvalidReconnectMaxAttempts(String),
    #[error("invalid PRESENTER_LOCK_TIMEOUT_MS: {0}")]
    InvalidLockTimeoutMs(String),
    #[error("invalid PRESENTER_SEARCH_LIMIT: {0}")]
    InvalidSearchLimit(String),
}

impl ClientConfig {
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        parse_client_config_from_env(|key| env::var(key).ok())
    }

    /// Websocket endpoint, `ws(s)://<host>:<port>/presenter` by default.
    pub fn endpoint_url(&self) -> Result<Url> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let url = Url::parse(&format!(
            "{scheme}://{}:{}{}",
            self.host, self.ws_port, self.ws_path
        ))?;
        Ok(url)
    }

    /// Suggestion lookup endpoint without the query string.
    pub fn search_url(&self) -> Result<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        let url = Url::parse(&format!(
            "{scheme}://{}:{}/api/search_streamer_names",
            self.host, self.http_port
        ))?;
        Ok(url)
    }
}

fn parse_client_config_from_env(
    lookup: impl Fn(&str) -> Option<String>,
) -> std::result::Result<ClientConfig, ConfigError> {
    let defaults = ClientConfig::default();

    let host = match non_empty(&lookup, "PRESENTER_HOST") {
        Some(host) if host.contains(['/', ' ']) => return Err(ConfigError::InvalidHost(host)),
        Some(host) => host,
        None => defaults.host,
    };
    let ws_port = parse_with_lookup(&lookup, "PRESENTER_WS_PORT", defaults.ws_port, |raw| {
        raw.parse::<u16>()
            .map_err(|error| ConfigError::InvalidWsPort(error.to_string()))
    })?;
    let ws_path = match non_empty(&lookup, "PRESENTER_WS_PATH") {
        Some(path) if !path.starts_with('/') => {
            return Err(ConfigError::InvalidWsPath(format!(
                "path must start with '/': {path}"
            )));
        }
        Some(path) => path,
        None => defaults.ws_path,
    };
    let secure = parse_with_lookup(&lookup, "PRESENTER_WS_SECURE", defaults.secure, |raw| {
        parse_bool(&raw).map_err(ConfigError::InvalidWsSecure)
    })?;
    let http_port = parse_with_lookup(&lookup, "PRESENTER_HTTP_PORT", defaults.http_port, |raw| {
        raw.parse::<u16>()
            .map_err(|error| ConfigError::InvalidHttpPort(error.to_string()))
    })?;
    let client_type = match lookup("PRESENTER_CLIENT_TYPE") {
        Some(raw) if raw.trim().is_empty() => {
            return Err(ConfigError::InvalidClientType(
                "client type cannot be empty".to_string(),
            ));
        }
        Some(raw) => raw.trim().to_string(),
        None => defaults.client_type,
    };
    let connect_timeout_ms = parse_with_lookup(
        &lookup,
        "PRESENTER_CONNECT_TIMEOUT_MS",
        defaults.connect_timeout.as_millis() as u64,
        |raw| {
            raw.parse::<u64>()
                .map_err(|error| ConfigError::InvalidConnectTimeoutMs(error.to_string()))
                .map(|value| value.max(1))
        },
    )?;
    let delay_ms = parse_with_lookup(
        &lookup,
        "PRESENTER_RECONNECT_DELAY_MS",
        defaults.reconnect.delay_ms,
        |raw| {
            raw.parse::<u64>()
                .map_err(|error| ConfigError::InvalidReconnectDelayMs(error.to_string()))
                .map(|value| value.max(1))
        },
    )?;
    let max_delay_ms = parse_with_lookup(&lookup, "PRESENTER_RECONNECT_MAX_DELAY_MS", delay_ms, |raw| {
        raw.parse::<u64>()
            .map_err(|error| ConfigError::InvalidReconnectMaxDelayMs(error.to_string()))
    })?;
    if max_delay_ms < delay_ms {
        return Err(ConfigError::InvalidReconnectMaxDelayMs(format!(
            "{max_delay_ms} is below PRESENTER_RECONNECT_DELAY_MS ({delay_ms})"
        )));
    }
    let max_attempts = parse_with_lookup(&lookup, "PRESENTER_RECONNECT_MAX_ATTEMPTS", 0, |raw| {
        raw.parse::<u32>()
            .map_err(|error| ConfigError::InvalidReconnectMaxAttempts(error.to_string()))
    })?;
    let lock_timeout_ms = parse_with_lookup(
        &lookup,
        "PRESENTER_LOCK_TIMEOUT_MS",
        defaults
            .lock_timeout
            .map_or(0, |timeout| timeout.as_millis() as u64),
        |raw| {
            raw.parse::<u64>()
                .map_err(|error| ConfigError::InvalidLockTimeoutMs(error.to_string()))
        },
    )?;
    let search_limit = parse_with_lookup(&lookup, "PRESENTER_SEARCH_LIMIT", defaults.search_limit, |raw| {
        raw.parse::<usize>()
            .map_err(|error| ConfigError::InvalidSearchLimit(error.to_string()))
            .map(|value| value.clamp(1, 200))
    })?;

    Ok(ClientConfig {
        host,
        ws_port,
        ws_path,
        secure,
        http_port,
        client_type,
        connect_timeout: Duration::from_millis(connect_timeout_ms),
        reconnect: ReconnectConfig {
            delay_ms,
            max_delay_ms,
            max_attempts: (max_attempts > 0).then_some(max_attempts),
        },
        lock_timeout: (lock_timeout_ms > 0).then(|| Duration::from_millis(lock_timeout_ms)),
        search_limit,
    })
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_with_lookup<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    parser: impl FnOnce(String) -> std::result::Result<T, ConfigError>,
) -> std::result::Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => parser(raw.trim().to_string()),
        _ => Ok(default),
    }
}

fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(other.to_string()),
    }
}
