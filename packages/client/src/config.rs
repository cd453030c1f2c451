use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use tmdb::{TmdbOptions, DEFAULT_BASE_URL};

/// Client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    /// Account path segment; `"null"` lets TMDB resolve it from the session
    pub tmdb_account_id: String,
    pub settle_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settle_secs: u64 = lookup("SETTLE_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .context("SETTLE_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Self {
            tmdb_api_key: lookup("TMDB_API_KEY").context("TMDB_API_KEY must be set")?,
            tmdb_base_url: lookup("TMDB_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            tmdb_account_id: lookup("TMDB_ACCOUNT_ID").unwrap_or_else(|| "null".to_string()),
            settle_timeout: Duration::from_secs(settle_secs),
        })
    }

    pub fn tmdb_options(&self) -> TmdbOptions {
        TmdbOptions::new(&self.tmdb_api_key)
            .with_base_url(&self.tmdb_base_url)
            .with_account_id(&self.tmdb_account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("TMDB_API_KEY", "abc")])).unwrap();

        assert_eq!(config.tmdb_api_key, "abc");
        assert_eq!(config.tmdb_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.tmdb_account_id, "null");
        assert_eq!(config.settle_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_missing_api_key() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("TMDB_API_KEY"));
    }

    #[test]
    fn test_bad_settle_timeout() {
        let err = Config::from_lookup(lookup(&[
            ("TMDB_API_KEY", "abc"),
            ("SETTLE_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SETTLE_TIMEOUT_SECS"));
    }

    #[test]
    fn test_tmdb_options_carry_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("TMDB_API_KEY", "abc"),
            ("TMDB_BASE_URL", "http://localhost:8081/3"),
            ("TMDB_ACCOUNT_ID", "548"),
        ]))
        .unwrap();
        let options = config.tmdb_options();

        assert_eq!(options.api_key, "abc");
        assert_eq!(options.base_url, "http://localhost:8081/3");
        assert_eq!(options.account_id, "548");
    }
}
