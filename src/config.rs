//! Configuration management for Chaser-Pilot

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host the browser's debugging endpoint listens on
    pub host: String,

    /// Remote debugging port
    pub port: u16,

    /// Connect/reconnect attempt budget, also used for command retries
    pub connect_attempts: u32,

    /// Base backoff between attempts in milliseconds (doubles each attempt)
    pub backoff_base_ms: u64,

    /// Per-command response timeouts
    pub timeouts: TimeoutConfig,

    /// Maximum number of characters returned by page text extraction
    pub text_limit: usize,

    /// Maximum DOM depth walked by the snapshotter
    pub snapshot_depth: u32,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9222,
            connect_attempts: 3,
            backoff_base_ms: 500,
            timeouts: TimeoutConfig::default(),
            text_limit: 8000,
            snapshot_depth: 50,
            log_level: "warn".to_string(),
        }
    }
}

/// Response timeouts, in seconds, by command class
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default timeout for most commands
    pub default_secs: u64,
    /// Timeout for screenshot capture
    pub screenshot_secs: u64,
    /// Timeout for page navigation
    pub navigation_secs: u64,
    /// Timeout for JavaScript evaluation
    pub execution_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_secs: 30,
            screenshot_secs: 90,
            navigation_secs: 60,
            execution_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(host) = env::var("PILOT_HOST") {
            config.host = host;
        }

        if let Ok(port) = env::var("PILOT_PORT") {
            config.port = port
                .parse()
                .map_err(|_| Error::configuration("Invalid PILOT_PORT"))?;
        }

        if let Ok(attempts) = env::var("PILOT_CONNECT_ATTEMPTS") {
            config.connect_attempts = attempts
                .parse()
                .map_err(|_| Error::configuration("Invalid PILOT_CONNECT_ATTEMPTS"))?;
        }

        if let Ok(backoff) = env::var("PILOT_BACKOFF_MS") {
            config.backoff_base_ms = backoff
                .parse()
                .map_err(|_| Error::configuration("Invalid PILOT_BACKOFF_MS"))?;
        }

        if let Ok(timeout) = env::var("PILOT_COMMAND_TIMEOUT") {
            config.timeouts.default_secs = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid PILOT_COMMAND_TIMEOUT"))?;
        }

        if let Ok(limit) = env::var("PILOT_TEXT_LIMIT") {
            config.text_limit = limit
                .parse()
                .map_err(|_| Error::configuration("Invalid PILOT_TEXT_LIMIT"))?;
        }

        if let Ok(depth) = env::var("PILOT_SNAPSHOT_DEPTH") {
            config.snapshot_depth = depth
                .parse()
                .map_err(|_| Error::configuration("Invalid PILOT_SNAPSHOT_DEPTH"))?;
        }

        if let Ok(log_level) = env::var("PILOT_LOG_LEVEL") {
            config.log_level = log_level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the client cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.connect_attempts == 0 {
            return Err(Error::configuration("connect_attempts must be at least 1"));
        }
        if self.host.trim().is_empty() {
            return Err(Error::configuration("host must not be empty"));
        }
        Ok(())
    }

    /// HTTP base URL of the debugging endpoint
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Base delay between connection attempts
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}
