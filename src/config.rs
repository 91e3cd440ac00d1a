// src/config.rs
use std::time::Duration;

use crate::errors::OsintError;

pub const BASE_URL_VAR: &str = "OSINT_API_BASE_URL";
pub const TIMEOUT_VAR: &str = "OSINT_REQUEST_TIMEOUT_SECS";
pub const PROGRESS_INTERVAL_VAR: &str = "OSINT_PROGRESS_INTERVAL_MS";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Analysis and consent services share this origin.
    pub base_url: String,
    pub request_timeout: Duration,
    pub progress_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, OsintError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, OsintError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup(BASE_URL_VAR) {
            Some(raw) => parse_base_url(&raw)?,
            None => DEFAULT_BASE_URL.to_string(),
        };

        let timeout_secs = parse_positive(&lookup, TIMEOUT_VAR, DEFAULT_TIMEOUT_SECS)?;
        let interval_ms =
            parse_positive(&lookup, PROGRESS_INTERVAL_VAR, DEFAULT_PROGRESS_INTERVAL_MS)?;

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            progress_interval: Duration::from_millis(interval_ms),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<String, OsintError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(OsintError::Config(format!(
            "{} must be an http(s) URL, got {:?}",
            BASE_URL_VAR, raw
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_positive<F>(lookup: &F, key: &str, default: u64) -> Result<u64, OsintError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(OsintError::Config(format!(
            "{} must be a positive integer, got {:?}",
            key, raw
        ))),
    }
}
