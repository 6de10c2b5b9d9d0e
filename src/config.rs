//! Environment configuration

use crate::error::PrepCoachError;
use crate::transcript::MAX_HISTORY_TURNS;
use crate::Result;
use std::env;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SESSION_TTL_SECS: u64 = 2 * 60 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// `None` selects the in-memory submission store
    pub database_url: Option<String>,
    pub port: u16,
    pub history_window: usize,
    pub request_timeout: Duration,
    /// Idle time after which the API server drops a session
    pub session_ttl: Duration,
    pub user_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_MODEL.to_string(),
            database_url: None,
            port: DEFAULT_PORT,
            history_window: MAX_HISTORY_TURNS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            user_token: None,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse_number("PORT", &raw)?,
            None => defaults.port,
        };

        let history_window = match get("PREPCOACH_HISTORY_WINDOW") {
            Some(raw) => parse_number::<usize>("PREPCOACH_HISTORY_WINDOW", &raw)?
                .clamp(1, MAX_HISTORY_TURNS),
            None => defaults.history_window,
        };

        let request_timeout = match get("PREPCOACH_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("PREPCOACH_REQUEST_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };

        let session_ttl = match get("PREPCOACH_SESSION_TTL_SECS") {
            Some(raw) => Duration::from_secs(parse_number("PREPCOACH_SESSION_TTL_SECS", &raw)?),
            None => defaults.session_ttl,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            database_url: get("POSTGRES_URL").or_else(|| get("DATABASE_URL")),
            port,
            history_window,
            request_timeout,
            session_ttl,
            user_token: get("PREPCOACH_USER_TOKEN"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| PrepCoachError::Config(format!("{} must be a number, got '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.history_window, 20);
        assert!(config.database_url.is_none());
        assert!(config.gemini_api_key.is_empty());
        assert_eq!(config.session_ttl, Duration::from_secs(7200));
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let config = config_from(&[
            ("API_PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/prepcoach"),
            ("PREPCOACH_HISTORY_WINDOW", "50"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("PREPCOACH_SESSION_TTL_SECS", "600"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/prepcoach"));
        assert_eq!(config.history_window, 20);
        assert_eq!(config.gemini_model, "gemini-1.5-pro");
        assert_eq!(config.session_ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let result = config_from(&[("PORT", "eighty")]);
        assert!(matches!(result, Err(PrepCoachError::Config(_))));
    }
}
