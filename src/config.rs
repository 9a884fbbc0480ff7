use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::application::retry::RetryPolicy;
use crate::infrastructure::paymongo::DEFAULT_BASE_URL;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub paymongo_secret_key: String,
    pub paymongo_base_url: String,
    pub gateway_timeout: Duration,
    pub attach_retry: RetryPolicy,
    pub notify_webhook_url: Option<String>,
    pub staff_alert_email: Option<String>,
}

impl AppConfig {
    /// Read the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&get, "PORT", 8080)?,
            paymongo_secret_key: required("PAYMONGO_SECRET_KEY")?,
            paymongo_base_url: get("PAYMONGO_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            gateway_timeout: Duration::from_millis(parsed(&get, "GATEWAY_TIMEOUT_MS", 15_000)?),
            attach_retry: RetryPolicy::new(
                parsed(&get, "ATTACH_MAX_RETRIES", 2)?,
                Duration::from_millis(parsed(&get, "ATTACH_BACKOFF_MS", 500)?),
            ),
            notify_webhook_url: get("NOTIFY_WEBHOOK_URL"),
            staff_alert_email: get("STAFF_ALERT_EMAIL"),
        })
    }
}

fn parsed<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
