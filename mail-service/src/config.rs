//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup from the process environment.
//! Missing required values abort startup; optional values fall back to
//! defaults.

use std::env;
use std::fmt;
use std::time::Duration;

/// Default listen port when `SERVER_PORT` is unset.
pub const DEFAULT_PORT: u16 = 5002;

/// Default SendGrid API base URL.
pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com";

/// Default timeout for the outbound provider call, in milliseconds.
pub const DEFAULT_SENDGRID_TIMEOUT_MS: u64 = 10_000;

/// Environment variables whose absence is fatal.
pub const REQUIRED_ENV_VARS: &[&str] = &["SENDGRID_API_KEY", "JWT_SECRET", "SENDER"];

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone)]
pub struct Config {
    /// SendGrid API key used to authenticate outbound calls
    pub sendgrid_api_key: String,

    /// Shared secret for verifying inbound bearer tokens
    pub jwt_secret: String,

    /// "From" address used on every outbound email
    pub sender: String,

    /// Port for the web server to listen on
    pub port: u16,

    /// SendGrid API base URL (overridable for tests and regional endpoints)
    pub sendgrid_api_url: String,

    /// Timeout applied to the outbound provider call
    pub sendgrid_timeout: Duration,

    /// Reject malformed mail requests before calling the provider
    pub strict_validation: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sendgrid_api_key", &"[redacted]")
            .field("jwt_secret", &"[redacted]")
            .field("sender", &self.sender)
            .field("port", &self.port)
            .field("sendgrid_api_url", &self.sendgrid_api_url)
            .field("sendgrid_timeout", &self.sendgrid_timeout)
            .field("strict_validation", &self.strict_validation)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Required variables are checked in a fixed order so the reported
    /// missing variable is deterministic.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        for &name in REQUIRED_ENV_VARS {
            if get(name).is_none() {
                return Err(ConfigError::Missing(name));
            }
        }

        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        Ok(Config {
            sendgrid_api_key: required("SENDGRID_API_KEY")?,
            jwt_secret: required("JWT_SECRET")?,
            sender: required("SENDER")?,

            port: parse_or("SERVER_PORT", get("SERVER_PORT"), DEFAULT_PORT)?,

            sendgrid_api_url: get("SENDGRID_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_SENDGRID_API_URL.to_string()),

            sendgrid_timeout: Duration::from_millis(parse_or(
                "SENDGRID_TIMEOUT_MS",
                get("SENDGRID_TIMEOUT_MS"),
                DEFAULT_SENDGRID_TIMEOUT_MS,
            )?),

            strict_validation: parse_bool("STRICT_VALIDATION", get("STRICT_VALIDATION"))?,
        })
    }
}

/// Parse an optional value, falling back to `default` when absent.
fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

/// Parse a boolean flag. Absent means `false`.
fn parse_bool(name: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(v) = raw else {
        return Ok(false);
    };

    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value: v }),
    }
}
